use crate::board::{Board, BoardConfig, Mirroring};
use crate::dispatch::{AddressSpace, AddressWindow, WriteAction};
use crate::irq::{IrqCounter, IrqMode};
use crate::region::{MemoryRegion, RegionId, RegionSet};
use crate::state::StateVisitor;

/// Board 24 (VRC6a): 16 KiB + 8 KiB switchable PRG windows over a fixed
/// last bank, eight 1 KiB CHR windows, register-selected mirroring, and the
/// Konami prescaler IRQ (341/3 of the CPU clock in scanline mode).
pub(crate) struct Vrc6 {
    prg_16k: u8,
    prg_8k: u8,
    chr_banks: [u8; 8],
    control: u8,
    enable_after_ack: bool,
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
    let board = Vrc6 {
        prg_16k: 0,
        prg_8k: 0,
        chr_banks: [0; 8],
        control: 0,
        enable_after_ack: false,
        irq: IrqCounter::new(IrqMode::CycleAccumulate {
            step: 3,
            threshold: 341,
        }),
    };
    (Box::new(board), regions)
}

impl Board for Vrc6 {
    fn power_on(&mut self) {
        self.prg_16k = 0;
        self.prg_8k = 0;
        self.chr_banks = [0; 8];
        self.control = 0;
        self.enable_after_ack = false;
    }

    fn reset(&mut self) {
        self.prg_16k = 0;
        self.prg_8k = 0;
        self.chr_banks = [0; 8];
        self.control = 0;
        self.irq.acknowledge();
    }

    fn register_write(&mut self, addr: u16, value: u8) -> bool {
        match addr & 0xF003 {
            0x8000..=0x8003 => {
                self.prg_16k = value & 0x0F;
                true
            }
            0xB003 => {
                self.control = value;
                false
            }
            0xC000..=0xC003 => {
                self.prg_8k = value & 0x1F;
                true
            }
            0xD000..=0xD003 => {
                self.chr_banks[(addr & 0x03) as usize] = value;
                true
            }
            0xE000..=0xE003 => {
                self.chr_banks[4 + (addr & 0x03) as usize] = value;
                true
            }
            0xF000 => {
                self.irq.set_reload(u16::from(value));
                false
            }
            0xF001 => {
                // Bit 2 (raw cycle mode) is not modeled; the prescaler
                // always runs at the scanline-equivalent rate.
                self.enable_after_ack = value & 0x01 != 0;
                self.irq.acknowledge();
                let enable = value & 0x02 != 0;
                self.irq.set_enabled(enable);
                if enable {
                    self.irq.reload_now();
                }
                false
            }
            0xF002 => {
                self.irq.acknowledge();
                self.irq.set_enabled(self.enable_after_ack);
                false
            }
            // $9000-$B002 are the expansion-audio register file.
            _ => false,
        }
    }

    fn sync(&self, regions: &RegionSet) -> Vec<AddressWindow> {
        let mut windows = vec![
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
                bank: self.prg_16k as usize,
                bank_size: 0x4000,
                write: WriteAction::Register,
            },
            AddressWindow {
                space: AddressSpace::Cpu,
                start: 0xC000,
                size: 0x2000,
                region: RegionId::PrgRom,
                bank: self.prg_8k as usize,
                bank_size: 0x2000,
                write: WriteAction::Register,
            },
            AddressWindow {
                space: AddressSpace::Cpu,
                start: 0xE000,
                size: 0x2000,
                region: RegionId::PrgRom,
                bank: regions.prg_rom.bank_count(0x2000) - 1,
                bank_size: 0x2000,
                write: WriteAction::Register,
            },
        ];

        let chr_write = if regions.chr.as_ref().is_some_and(|chr| chr.writable()) {
            WriteAction::Ram
        } else {
            WriteAction::Ignore
        };
        for (slot, &bank) in self.chr_banks.iter().enumerate() {
            windows.push(AddressWindow {
                space: AddressSpace::Chr,
                start: (slot as u16) * 0x400,
                size: 0x400,
                region: RegionId::Chr,
                bank: bank as usize,
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
        match (self.control >> 2) & 0x03 {
            0 => Mirroring::Vertical,
            1 => Mirroring::Horizontal,
            2 => Mirroring::OneScreenLower,
            _ => Mirroring::OneScreenUpper,
        }
    }

    fn visit_state(&mut self, v: &mut dyn StateVisitor) {
        v.u8("prg.16k", &mut self.prg_16k);
        v.u8("prg.8k", &mut self.prg_8k);
        v.bytes("chr.banks", &mut self.chr_banks);
        v.u8("ppu.control", &mut self.control);
        v.flag("irq.enable_after_ack", &mut self.enable_after_ack);
        self.irq.visit_state(v);
    }

    fn debug_state(&self) -> String {
        format!(
            "VRC6 prg_16k=${:02X} prg_8k=${:02X} chr={:02X?} irq_count={}",
            self.prg_16k,
            self.prg_8k,
            self.chr_banks,
            self.irq.count(),
        )
    }
}
