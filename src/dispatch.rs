use crate::region::{RegionId, RegionSet};

/// Finest banking granularity any supported board uses.
pub const PAGE_SIZE: usize = 0x400;
pub const PAGE_SHIFT: u16 = 10;

const CPU_PAGES: usize = 0x1_0000 / PAGE_SIZE;
const CHR_PAGES: usize = 0x2000 / PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSpace {
    Cpu,
    Chr,
}

/// What a write landing in a window does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Ignore,
    Ram,
    Register,
}

/// One bank of one region made visible at `start`, as produced by a board's
/// `sync`. `bank` is the requested index; masking against the region's bank
/// count happens when the dispatch table is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressWindow {
    pub space: AddressSpace,
    pub start: u16,
    pub size: usize,
    pub region: RegionId,
    pub bank: usize,
    pub bank_size: usize,
    pub write: WriteAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    OpenBus,
    Mapped {
        region: RegionId,
        base: usize,
        write: WriteAction,
    },
}

/// Page-granular resolution of the current window set. Rebuilt from scratch
/// after every register change rather than patched in place, so no entry can
/// go stale relative to the registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTable {
    cpu: [Page; CPU_PAGES],
    chr: [Page; CHR_PAGES],
}

impl DispatchTable {
    pub fn empty() -> Self {
        Self {
            cpu: [Page::OpenBus; CPU_PAGES],
            chr: [Page::OpenBus; CHR_PAGES],
        }
    }

    /// Pure construction from a window list: resolves each window's bank
    /// through the masking law and assigns its pages. Windows must be
    /// page-aligned and non-overlapping.
    pub fn build(windows: &[AddressWindow], regions: &RegionSet) -> Self {
        let mut table = Self::empty();
        for window in windows {
            let Some(region) = regions.get(window.region) else {
                continue;
            };
            debug_assert_eq!(window.start as usize % PAGE_SIZE, 0);
            debug_assert_eq!(window.size % PAGE_SIZE, 0);

            let bank = region.mask_bank(window.bank, window.bank_size);
            let base = bank * window.bank_size;
            let first = (window.start >> PAGE_SHIFT) as usize;
            for page in 0..window.size / PAGE_SIZE {
                let entry = Page::Mapped {
                    region: window.region,
                    base: base + page * PAGE_SIZE,
                    write: window.write,
                };
                let slot = match window.space {
                    AddressSpace::Cpu => &mut table.cpu[first + page],
                    AddressSpace::Chr => &mut table.chr[first + page],
                };
                debug_assert!(
                    matches!(slot, Page::OpenBus),
                    "overlapping windows at page {}",
                    first + page
                );
                *slot = entry;
            }
        }
        table
    }

    pub fn cpu_page(&self, addr: u16) -> Page {
        self.cpu[(addr >> PAGE_SHIFT) as usize]
    }

    pub fn chr_page(&self, addr: u16) -> Page {
        self.chr[((addr as usize) & 0x1FFF) >> PAGE_SHIFT]
    }
}
