use anyhow::{Result, bail};

use crate::boards;
use crate::dispatch::AddressWindow;
use crate::irq::IrqCounter;
use crate::region::RegionSet;
use crate::state::StateVisitor;

/// Nametable arrangement the board currently selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    OneScreenLower,
    OneScreenUpper,
    FourScreen,
}

/// Host-supplied construction parameters that come from the ROM container
/// rather than the board hardware itself.
#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    pub mirroring: Mirroring,
    pub battery: bool,
    /// 0 selects the board's default work-RAM size.
    pub prg_ram_size: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            mirroring: Mirroring::Horizontal,
            battery: false,
            prg_ram_size: 0,
        }
    }
}

/// Per-board behavior behind `MapperInstance`. Boards own their bank
/// registers and IRQ counter; regions and the dispatch table live in the
/// instance.
///
/// `sync` is the bank resolver: a pure read of the current registers into a
/// window list. It must not mutate anything, so calling it twice in a row
/// yields identical lists.
pub trait Board {
    fn power_on(&mut self);

    /// Soft reset. Bank registers return to their power-on values; work RAM
    /// and IRQ enable are instance/counter state and survive untouched.
    fn reset(&mut self) {}

    /// Decodes a CPU write landing in register-claimed address space.
    /// Returns true when the write changed the bank mapping and the dispatch
    /// table must be rebuilt.
    fn register_write(&mut self, addr: u16, value: u8) -> bool;

    fn sync(&self, regions: &RegionSet) -> Vec<AddressWindow>;

    fn irq(&mut self) -> Option<&mut IrqCounter> {
        None
    }

    fn irq_line(&self) -> bool {
        false
    }

    fn mirroring(&self) -> Mirroring;

    fn visit_state(&mut self, v: &mut dyn StateVisitor);

    fn debug_state(&self) -> String {
        String::new()
    }
}

pub fn board_name(board_id: u16) -> &'static str {
    match board_id {
        2 => "UxROM",
        4 => "TxROM (MMC3)",
        24 => "VRC6a",
        73 => "VRC3",
        _ => "Unsupported",
    }
}

pub(crate) fn create_board(
    board_id: u16,
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
    config: &BoardConfig,
) -> Result<(Box<dyn Board>, RegionSet)> {
    let (board, regions): (Box<dyn Board>, RegionSet) = match board_id {
        2 => boards::uxrom(prg_rom, chr_rom, config),
        4 => boards::txrom(prg_rom, chr_rom, config),
        24 => boards::vrc6(prg_rom, chr_rom, config),
        73 => boards::vrc3(prg_rom, chr_rom, config),
        _ => bail!("unsupported board id {board_id}"),
    };
    Ok((board, regions))
}
