use crate::board::{Board, BoardConfig, Mirroring};
use crate::dispatch::{AddressSpace, AddressWindow, WriteAction};
use crate::irq::{IrqCounter, IrqMode};
use crate::region::{MemoryRegion, RegionId, RegionSet};
use crate::state::StateVisitor;

/// Board 4 (TxROM / MMC3): eight bank registers behind a select port, two
/// PRG layouts, 2 KiB-paired CHR layouts, work-RAM enable/protect bits, and
/// a scanline-clocked countdown IRQ. The A12 edge filter lives in the PPU;
/// the host clocks `tick_irq` once per rendered scanline instead.
pub(crate) struct TxRom {
    bank_select: u8,
    bank_regs: [u8; 8],
    horizontal_mirror: bool,
    four_screen: bool,
    ram_enable: bool,
    ram_protect: bool,
    irq: IrqCounter,
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
    let ram_size = if config.prg_ram_size == 0 {
        0x2000
    } else {
        config.prg_ram_size
    };
    let regions = RegionSet {
        prg_rom: MemoryRegion::rom(prg_rom),
        prg_ram: Some(MemoryRegion::ram(ram_size, config.battery)),
        chr: Some(chr),
    };
    let board = TxRom {
        bank_select: 0,
        bank_regs: [0; 8],
        horizontal_mirror: config.mirroring == Mirroring::Horizontal,
        four_screen: config.mirroring == Mirroring::FourScreen,
        ram_enable: false,
        ram_protect: false,
        irq: IrqCounter::new(IrqMode::EdgeCountdown),
    };
    (Box::new(board), regions)
}

impl Board for TxRom {
    fn power_on(&mut self) {
        self.bank_select = 0;
        self.bank_regs = [0; 8];
        self.ram_enable = false;
        self.ram_protect = false;
    }

    fn reset(&mut self) {
        self.bank_select = 0;
        self.bank_regs = [0; 8];
        self.ram_enable = false;
        self.ram_protect = false;
        // IRQ enable survives a soft reset; only the pending line drops.
        self.irq.acknowledge();
    }

    fn register_write(&mut self, addr: u16, value: u8) -> bool {
        match addr & 0xE001 {
            0x8000 => {
                self.bank_select = value;
                true
            }
            0x8001 => {
                let reg = (self.bank_select & 0x07) as usize;
                // R0/R1 select 2 KiB CHR pairs; hardware ignores bit 0.
                self.bank_regs[reg] = if reg <= 1 { value & 0xFE } else { value };
                true
            }
            0xA000 => {
                self.horizontal_mirror = value & 0x01 != 0;
                false
            }
            0xA001 => {
                self.ram_protect = value & 0x40 != 0;
                self.ram_enable = value & 0x80 != 0;
                true
            }
            0xC000 => {
                self.irq.set_reload(u16::from(value));
                false
            }
            0xC001 => {
                self.irq.reload_now();
                false
            }
            0xE000 => {
                self.irq.set_enabled(false);
                self.irq.acknowledge();
                false
            }
            _ => {
                self.irq.set_enabled(true);
                false
            }
        }
    }

    fn sync(&self, regions: &RegionSet) -> Vec<AddressWindow> {
        let mut windows = Vec::with_capacity(14);

        if self.ram_enable {
            windows.push(AddressWindow {
                space: AddressSpace::Cpu,
                start: 0x6000,
                size: 0x2000,
                region: RegionId::PrgRam,
                bank: 0,
                bank_size: 0x2000,
                write: if self.ram_protect {
                    WriteAction::Ignore
                } else {
                    WriteAction::Ram
                },
            });
        }

        let last = regions.prg_rom.bank_count(0x2000) - 1;
        let second_last = last.saturating_sub(1);
        let r6 = self.bank_regs[6] as usize;
        let r7 = self.bank_regs[7] as usize;
        let prg_banks = if self.bank_select & 0x40 == 0 {
            [r6, r7, second_last, last]
        } else {
            [second_last, r7, r6, last]
        };
        for (slot, bank) in prg_banks.into_iter().enumerate() {
            windows.push(AddressWindow {
                space: AddressSpace::Cpu,
                start: 0x8000 + (slot as u16) * 0x2000,
                size: 0x2000,
                region: RegionId::PrgRom,
                bank,
                bank_size: 0x2000,
                write: WriteAction::Register,
            });
        }

        let chr_write = if regions.chr.as_ref().is_some_and(|chr| chr.writable()) {
            WriteAction::Ram
        } else {
            WriteAction::Ignore
        };
        let r = &self.bank_regs;
        let chr_banks: [usize; 8] = if self.bank_select & 0x80 == 0 {
            [
                r[0] as usize,
                r[0] as usize | 1,
                r[1] as usize,
                r[1] as usize | 1,
                r[2] as usize,
                r[3] as usize,
                r[4] as usize,
                r[5] as usize,
            ]
        } else {
            [
                r[2] as usize,
                r[3] as usize,
                r[4] as usize,
                r[5] as usize,
                r[0] as usize,
                r[0] as usize | 1,
                r[1] as usize,
                r[1] as usize | 1,
            ]
        };
        for (slot, bank) in chr_banks.into_iter().enumerate() {
            windows.push(AddressWindow {
                space: AddressSpace::Chr,
                start: (slot as u16) * 0x400,
                size: 0x400,
                region: RegionId::Chr,
                bank,
                bank_size: 0x400,
                write: chr_write,
            });
        }

        windows
    }

    fn irq(&mut self) -> Option<&mut IrqCounter> {
        Some(&mut self.irq)
    }

    fn irq_line(&self) -> bool {
        self.irq.line()
    }

    fn mirroring(&self) -> Mirroring {
        if self.four_screen {
            Mirroring::FourScreen
        } else if self.horizontal_mirror {
            Mirroring::Horizontal
        } else {
            Mirroring::Vertical
        }
    }

    fn visit_state(&mut self, v: &mut dyn StateVisitor) {
        v.u8("bank.select", &mut self.bank_select);
        v.bytes("bank.regs", &mut self.bank_regs);
        v.flag("mirror.horizontal", &mut self.horizontal_mirror);
        v.flag("ram.enable", &mut self.ram_enable);
        v.flag("ram.protect", &mut self.ram_protect);
        self.irq.visit_state(v);
    }

    fn debug_state(&self) -> String {
        format!(
            "TxROM select=${:02X} regs={:02X?} ram_enable={} irq_count={}",
            self.bank_select,
            self.bank_regs,
            self.ram_enable,
            self.irq.count(),
        )
    }
}
