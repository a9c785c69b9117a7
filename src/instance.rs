use anyhow::{Result, bail};

use crate::board::{Board, BoardConfig, Mirroring, board_name, create_board};
use crate::dispatch::{AddressWindow, DispatchTable, PAGE_SIZE, Page, WriteAction};
use crate::region::RegionSet;
use crate::state::{LoadOutcome, LoadVisitor, SaveVisitor, Snapshot, StateVisitor};

/// One powered cartridge: a board plus its regions and the dispatch table
/// resolved from the board's current registers. This is the surface the
/// console core talks to.
pub struct MapperInstance {
    board: Box<dyn Board>,
    regions: RegionSet,
    table: DispatchTable,
    open_bus: u8,
    board_id: u16,
}

impl MapperInstance {
    /// Validates the ROM payloads and builds the board. The instance is not
    /// usable until `power_on`.
    pub fn construct(
        board_id: u16,
        prg_rom: Vec<u8>,
        chr_rom: Vec<u8>,
        config: &BoardConfig,
    ) -> Result<Self> {
        if prg_rom.is_empty() {
            bail!("cartridge has no PRG ROM");
        }
        if prg_rom.len() % PAGE_SIZE != 0 {
            bail!("PRG ROM size {:#X} is not page-aligned", prg_rom.len());
        }
        if chr_rom.len() % PAGE_SIZE != 0 {
            bail!("CHR ROM size {:#X} is not page-aligned", chr_rom.len());
        }
        let (board, regions) = create_board(board_id, prg_rom, chr_rom, config)?;
        Ok(Self {
            board,
            regions,
            table: DispatchTable::empty(),
            open_bus: 0,
            board_id,
        })
    }

    pub fn power_on(&mut self) {
        self.board.power_on();
        if let Some(irq) = self.board.irq() {
            irq.power_on();
        }
        self.open_bus = 0;
        self.sync();
    }

    /// Soft reset: registers return to power-on values, work RAM contents
    /// and the IRQ enable flag are preserved.
    pub fn reset(&mut self) {
        self.board.reset();
        self.sync();
    }

    fn sync(&mut self) {
        let windows = self.board.sync(&self.regions);
        self.table = DispatchTable::build(&windows, &self.regions);
    }

    /// The board's current window list, exposed for hosts that introspect
    /// the mapping (debuggers, conformance checks).
    pub fn windows(&self) -> Vec<AddressWindow> {
        self.board.sync(&self.regions)
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        let value = match self.table.cpu_page(addr) {
            Page::Mapped { region, base, .. } => match self.regions.get(region) {
                Some(region) => region.read(base + (addr as usize & (PAGE_SIZE - 1))),
                None => self.open_bus,
            },
            Page::OpenBus => self.open_bus,
        };
        self.open_bus = value;
        value
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.open_bus = value;
        match self.table.cpu_page(addr) {
            Page::Mapped { region, base, write } => match write {
                WriteAction::Ram => {
                    if let Some(region) = self.regions.get_mut(region) {
                        region.write(base + (addr as usize & (PAGE_SIZE - 1)), value);
                    }
                }
                WriteAction::Register => {
                    if self.board.register_write(addr, value) {
                        self.sync();
                    }
                }
                WriteAction::Ignore => {}
            },
            Page::OpenBus => {}
        }
    }

    pub fn chr_read(&self, addr: u16) -> u8 {
        match self.table.chr_page(addr) {
            Page::Mapped { region, base, .. } => match self.regions.get(region) {
                Some(region) => region.read(base + (addr as usize & (PAGE_SIZE - 1))),
                None => 0,
            },
            Page::OpenBus => 0,
        }
    }

    pub fn chr_write(&mut self, addr: u16, value: u8) {
        if let Page::Mapped {
            region,
            base,
            write: WriteAction::Ram,
        } = self.table.chr_page(addr)
        {
            if let Some(region) = self.regions.get_mut(region) {
                region.write(base + (addr as usize & (PAGE_SIZE - 1)), value);
            }
        }
    }

    /// Advances the board's IRQ counter by `delta` external clocks and
    /// returns the interrupt line state afterwards.
    pub fn tick_irq(&mut self, delta: u32) -> bool {
        if let Some(irq) = self.board.irq() {
            irq.tick(delta);
        }
        self.board.irq_line()
    }

    pub fn irq_line(&self) -> bool {
        self.board.irq_line()
    }

    pub fn mirroring(&self) -> Mirroring {
        self.board.mirroring()
    }

    fn visit_all(&mut self, v: &mut dyn StateVisitor) {
        v.u8("bus.open", &mut self.open_bus);
        self.board.visit_state(v);
        self.regions.visit_state(v);
    }

    pub fn save_state(&mut self) -> Snapshot {
        let mut save = SaveVisitor::new();
        self.visit_all(&mut save);
        save.into_snapshot()
    }

    /// Applies a snapshot. Fields absent from the snapshot keep their
    /// current values; a snapshot matching nothing falls back to power-on
    /// initialization. The dispatch table is rebuilt either way so it never
    /// reflects pre-load registers.
    pub fn load_state(&mut self, snapshot: &Snapshot) -> LoadOutcome {
        let mut load = LoadVisitor::new(snapshot);
        self.visit_all(&mut load);
        if load.applied == 0 {
            self.power_on();
            return LoadOutcome::Absent;
        }
        self.sync();
        if load.missing.is_empty() {
            LoadOutcome::Applied
        } else {
            LoadOutcome::PartiallyApplied(load.missing)
        }
    }

    /// Battery-backed work RAM contents, if this board has any.
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.regions
            .prg_ram
            .as_ref()
            .filter(|ram| ram.battery())
            .map(|ram| ram.as_slice())
    }

    /// Restores persisted battery RAM, clamped to the allocated size.
    pub fn load_battery_ram(&mut self, data: &[u8]) {
        if let Some(ram) = self.regions.prg_ram.as_mut() {
            if ram.battery() {
                ram.load(data);
            }
        }
    }

    /// Direct work-RAM access for hosts that poke cheats or debugger edits.
    pub fn prg_ram_mut(&mut self) -> Option<&mut [u8]> {
        self.regions.prg_ram.as_mut().map(|ram| ram.as_mut_slice())
    }

    /// Tears the instance down, yielding battery RAM for persistence.
    pub fn close(self) -> Option<Vec<u8>> {
        self.regions
            .prg_ram
            .filter(|ram| ram.battery())
            .map(|ram| ram.into_bytes())
    }

    pub fn board_id(&self) -> u16 {
        self.board_id
    }

    pub fn name(&self) -> &'static str {
        board_name(self.board_id)
    }

    pub fn debug_state(&self) -> String {
        let state = self.board.debug_state();
        if state.is_empty() {
            self.name().to_string()
        } else {
            state
        }
    }
}
