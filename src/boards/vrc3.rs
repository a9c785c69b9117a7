use crate::board::{Board, BoardConfig, Mirroring};
use crate::dispatch::{AddressSpace, AddressWindow, WriteAction};
use crate::irq::{IrqCounter, IrqMode};
use crate::region::{MemoryRegion, RegionId, RegionSet};
use crate::state::StateVisitor;

/// Board 73 (VRC3): one switchable 16 KiB PRG window plus a free-running
/// 16-bit IRQ counter whose reload latch is written one nibble at a time.
pub(crate) struct Vrc3 {
    prg_bank: u8,
    enable_after_ack: bool,
    mirroring: Mirroring,
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
    let regions = RegionSet {
        prg_rom: MemoryRegion::rom(prg_rom),
        prg_ram: Some(MemoryRegion::ram(0x2000, config.battery)),
        chr: Some(chr),
    };
    let board = Vrc3 {
        prg_bank: 0,
        enable_after_ack: false,
        mirroring: config.mirroring,
        irq: IrqCounter::new(IrqMode::FreeRunning),
    };
    (Box::new(board), regions)
}

impl Vrc3 {
    fn set_reload_nibble(&mut self, shift: u16, value: u8) {
        let nibble = u16::from(value & 0x0F) << shift;
        let mask = !(0x000Fu16 << shift);
        self.irq.set_reload((self.irq.reload() & mask) | nibble);
    }
}

impl Board for Vrc3 {
    fn power_on(&mut self) {
        self.prg_bank = 0;
        self.enable_after_ack = false;
    }

    fn reset(&mut self) {
        self.prg_bank = 0;
        self.irq.acknowledge();
    }

    fn register_write(&mut self, addr: u16, value: u8) -> bool {
        match addr & 0xF000 {
            0x8000 => {
                self.set_reload_nibble(0, value);
                false
            }
            0x9000 => {
                self.set_reload_nibble(4, value);
                false
            }
            0xA000 => {
                self.set_reload_nibble(8, value);
                false
            }
            0xB000 => {
                self.set_reload_nibble(12, value);
                false
            }
            0xC000 => {
                self.enable_after_ack = value & 0x01 != 0;
                self.irq.acknowledge();
                let enable = value & 0x02 != 0;
                self.irq.set_enabled(enable);
                if enable {
                    self.irq.reload_now();
                }
                false
            }
            0xD000 => {
                self.irq.acknowledge();
                self.irq.set_enabled(self.enable_after_ack);
                false
            }
            0xF000 => {
                self.prg_bank = value & 0x07;
                true
            }
            _ => false,
        }
    }

    fn sync(&self, regions: &RegionSet) -> Vec<AddressWindow> {
        let chr_writable = regions.chr.as_ref().is_some_and(|chr| chr.writable());
        vec![
            AddressWindow {
                space: AddressSpace::Cpu,
                start: 0x6000,
                size: 0x2000,
                region: RegionId::PrgRam,
                bank: 0,
                bank_size: 0x2000,
                write: WriteAction::Ram,
            },
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

    fn irq(&mut self) -> Option<&mut IrqCounter> {
        Some(&mut self.irq)
    }

    fn irq_line(&self) -> bool {
        self.irq.line()
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn visit_state(&mut self, v: &mut dyn StateVisitor) {
        v.u8("prg.bank", &mut self.prg_bank);
        v.flag("irq.enable_after_ack", &mut self.enable_after_ack);
        self.irq.visit_state(v);
    }

    fn debug_state(&self) -> String {
        format!(
            "VRC3 prg_bank=${:02X} irq_count=${:04X} reload=${:04X}",
            self.prg_bank,
            self.irq.count(),
            self.irq.reload(),
        )
    }
}
