use crate::state::StateVisitor;

/// Identifies one of the memory regions a board can map into a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionId {
    PrgRom,
    PrgRam,
    Chr,
}

/// A contiguous byte buffer owned by a mapper instance: a PRG/CHR ROM image
/// or an allocated RAM payload. Bank counts are derived per requested
/// granularity because one board may bank the same region at several unit
/// sizes at once.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    bytes: Vec<u8>,
    writable: bool,
    battery: bool,
}

impl MemoryRegion {
    pub fn rom(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            writable: false,
            battery: false,
        }
    }

    /// Zero-filled RAM. Battery-backed contents are restored separately by
    /// the persistence collaborator via `MapperInstance::load_battery_ram`.
    pub fn ram(len: usize, battery: bool) -> Self {
        Self {
            bytes: vec![0; len],
            writable: true,
            battery,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn battery(&self) -> bool {
        self.battery
    }

    pub fn bank_count(&self, bank_size: usize) -> usize {
        (self.bytes.len() / bank_size).max(1)
    }

    /// Effective bank for a requested index: `b & (n - 1)` for the
    /// power-of-two bank counts real hardware wires up, modulo otherwise
    /// (odd geometries like 3 x 16 KiB carts exist and must stay in range).
    pub fn mask_bank(&self, bank: usize, bank_size: usize) -> usize {
        let count = self.bank_count(bank_size);
        if count.is_power_of_two() {
            bank & (count - 1)
        } else {
            bank % count
        }
    }

    pub fn read(&self, offset: usize) -> u8 {
        self.bytes[offset % self.bytes.len()]
    }

    pub fn write(&mut self, offset: usize, value: u8) {
        if self.writable {
            let len = self.bytes.len();
            self.bytes[offset % len] = value;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Overwrite contents from persisted data, clamped to the region size.
    pub fn load(&mut self, data: &[u8]) {
        let n = data.len().min(self.bytes.len());
        self.bytes[..n].copy_from_slice(&data[..n]);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// The fixed region complement of a mapper instance: the borrowed cartridge
/// PRG ROM plus the RAM regions the board allocated for itself.
#[derive(Debug)]
pub struct RegionSet {
    pub prg_rom: MemoryRegion,
    pub prg_ram: Option<MemoryRegion>,
    pub chr: Option<MemoryRegion>,
}

impl RegionSet {
    pub fn get(&self, id: RegionId) -> Option<&MemoryRegion> {
        match id {
            RegionId::PrgRom => Some(&self.prg_rom),
            RegionId::PrgRam => self.prg_ram.as_ref(),
            RegionId::Chr => self.chr.as_ref(),
        }
    }

    pub fn get_mut(&mut self, id: RegionId) -> Option<&mut MemoryRegion> {
        match id {
            RegionId::PrgRom => Some(&mut self.prg_rom),
            RegionId::PrgRam => self.prg_ram.as_mut(),
            RegionId::Chr => self.chr.as_mut(),
        }
    }

    /// Declares every writable region as a tagged state field. ROM regions
    /// are never serialized.
    pub(crate) fn visit_state(&mut self, v: &mut dyn StateVisitor) {
        if let Some(ram) = self.prg_ram.as_mut() {
            v.bytes("prg.ram", ram.as_mut_slice());
        }
        if let Some(chr) = self.chr.as_mut() {
            if chr.writable() {
                v.bytes("chr.ram", chr.as_mut_slice());
            }
        }
    }
}
