use crate::board::{Board, BoardConfig, Mirroring};
use crate::dispatch::{AddressSpace, AddressWindow, WriteAction};
use crate::region::{MemoryRegion, RegionId, RegionSet};
use crate::state::StateVisitor;

/// Board 2 (UxROM): switchable 16 KiB PRG window at $8000, last bank fixed
/// at $C000, no work RAM, usually CHR RAM.
pub(crate) struct UxRom {
    prg_bank: u8,
    mirroring: Mirroring,
}

pub(crate) fn new(
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
    config: &BoardConfig,
) -> (Box<dyn Board>, RegionSet) {
    let chr = if chr_rom.is_empty() {
        MemoryRegion::ram(0x2000, false)
    } else {
        MemoryRegion::rom(chr_rom)
    };
    let regions = RegionSet {
        prg_rom: MemoryRegion::rom(prg_rom),
        prg_ram: None,
        chr: Some(chr),
    };
    let board = UxRom {
        prg_bank: 0,
        mirroring: config.mirroring,
    };
    (Box::new(board), regions)
}

impl Board for UxRom {
    fn power_on(&mut self) {
        self.prg_bank = 0;
    }

    fn reset(&mut self) {
        self.prg_bank = 0;
    }

    fn register_write(&mut self, _addr: u16, value: u8) -> bool {
        self.prg_bank = value & 0x0F;
        true
    }

    fn sync(&self, regions: &RegionSet) -> Vec<AddressWindow> {
        let chr_writable = regions.chr.as_ref().is_some_and(|chr| chr.writable());
        vec![
            AddressWindow {
                space: AddressSpace::Cpu,
                start: 0x8000,
                size: 0x4000,
                region: RegionId::PrgRom,
                bank: self.prg_bank as usize,
                bank_size: 0x4000,
                write: WriteAction::Register,
            },
            AddressWindow {
                space: AddressSpace::Cpu,
                start: 0xC000,
                size: 0x4000,
                region: RegionId::PrgRom,
                bank: regions.prg_rom.bank_count(0x4000) - 1,
                bank_size: 0x4000,
                write: WriteAction::Register,
            },
            AddressWindow {
                space: AddressSpace::Chr,
                start: 0x0000,
                size: 0x2000,
                region: RegionId::Chr,
                bank: 0,
                bank_size: 0x2000,
                write: if chr_writable {
                    WriteAction::Ram
                } else {
                    WriteAction::Ignore
                },
            },
        ]
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn visit_state(&mut self, v: &mut dyn StateVisitor) {
        v.u8("prg.bank", &mut self.prg_bank);
    }

    fn debug_state(&self) -> String {
        format!("UxROM prg_bank=${:02X}", self.prg_bank)
    }
}
