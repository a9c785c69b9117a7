//! Cartridge mapper-board framework: memory regions with bank masking,
//! declarative address windows resolved into a paged dispatch table, three
//! IRQ counter models, and tagged save-state snapshots, behind a single
//! `MapperInstance` surface the console core drives.

pub mod board;
mod boards;
pub mod dispatch;
pub mod instance;
pub mod irq;
pub mod region;
pub mod state;

pub use board::{Board, BoardConfig, Mirroring, board_name};
pub use dispatch::{AddressSpace, AddressWindow, DispatchTable, PAGE_SIZE, Page, WriteAction};
pub use instance::MapperInstance;
pub use irq::{IrqCounter, IrqMode};
pub use region::{MemoryRegion, RegionId, RegionSet};
pub use state::{LoadOutcome, Snapshot, SnapshotEntry, StateVisitor};
