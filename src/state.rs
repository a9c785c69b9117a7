use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One tagged state field. Tags are short stable identifiers; the byte
/// payload is the field's little-endian value or raw RAM contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub tag: String,
    pub bytes: Vec<u8>,
}

/// Ordered collection of every mutable field a mapper instance must carry
/// across a save/restore round-trip. Transport is the host's business; the
/// JSON helpers below are a convenience shim for hosts without their own
/// container format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: &str, bytes: Vec<u8>) {
        self.entries.push(SnapshotEntry {
            tag: tag.to_string(),
            bytes,
        });
    }

    pub fn get(&self, tag: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| entry.bytes.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.tag.as_str())
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("failed to serialize snapshot")
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("failed to deserialize snapshot")
    }
}

/// Result of applying a snapshot to a mapper instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Every declared field was present and applied.
    Applied,
    /// The listed tags were absent (or size-mismatched) and kept their
    /// current in-memory values; all other fields were applied.
    PartiallyApplied(Vec<String>),
    /// Nothing in the snapshot matched this instance's tag set; the
    /// instance re-ran its power-on initialization instead.
    Absent,
}

/// A board declares each piece of its mutable state exactly once through
/// this visitor; the same declaration drives both save (collect into a
/// snapshot) and load (apply from a snapshot, tracking missing tags).
pub trait StateVisitor {
    fn u8(&mut self, tag: &'static str, value: &mut u8);
    fn u16(&mut self, tag: &'static str, value: &mut u16);
    fn u32(&mut self, tag: &'static str, value: &mut u32);
    fn flag(&mut self, tag: &'static str, value: &mut bool);
    fn bytes(&mut self, tag: &'static str, value: &mut [u8]);
}

pub(crate) struct SaveVisitor {
    snapshot: Snapshot,
}

impl SaveVisitor {
    pub(crate) fn new() -> Self {
        Self {
            snapshot: Snapshot::new(),
        }
    }

    pub(crate) fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }
}

impl StateVisitor for SaveVisitor {
    fn u8(&mut self, tag: &'static str, value: &mut u8) {
        self.snapshot.push(tag, vec![*value]);
    }

    fn u16(&mut self, tag: &'static str, value: &mut u16) {
        self.snapshot.push(tag, value.to_le_bytes().to_vec());
    }

    fn u32(&mut self, tag: &'static str, value: &mut u32) {
        self.snapshot.push(tag, value.to_le_bytes().to_vec());
    }

    fn flag(&mut self, tag: &'static str, value: &mut bool) {
        self.snapshot.push(tag, vec![u8::from(*value)]);
    }

    fn bytes(&mut self, tag: &'static str, value: &mut [u8]) {
        self.snapshot.push(tag, value.to_vec());
    }
}

pub(crate) struct LoadVisitor<'a> {
    snapshot: &'a Snapshot,
    pub(crate) applied: usize,
    pub(crate) missing: Vec<String>,
}

impl<'a> LoadVisitor<'a> {
    pub(crate) fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            applied: 0,
            missing: Vec::new(),
        }
    }

    fn miss(&mut self, tag: &'static str) {
        self.missing.push(tag.to_string());
    }
}

impl StateVisitor for LoadVisitor<'_> {
    fn u8(&mut self, tag: &'static str, value: &mut u8) {
        match self.snapshot.get(tag) {
            Some([byte]) => {
                *value = *byte;
                self.applied += 1;
            }
            _ => self.miss(tag),
        }
    }

    fn u16(&mut self, tag: &'static str, value: &mut u16) {
        match self.snapshot.get(tag) {
            Some(&[lo, hi]) => {
                *value = u16::from_le_bytes([lo, hi]);
                self.applied += 1;
            }
            _ => self.miss(tag),
        }
    }

    fn u32(&mut self, tag: &'static str, value: &mut u32) {
        match self.snapshot.get(tag) {
            Some(&[b0, b1, b2, b3]) => {
                *value = u32::from_le_bytes([b0, b1, b2, b3]);
                self.applied += 1;
            }
            _ => self.miss(tag),
        }
    }

    fn flag(&mut self, tag: &'static str, value: &mut bool) {
        match self.snapshot.get(tag) {
            Some([byte]) => {
                *value = *byte != 0;
                self.applied += 1;
            }
            _ => self.miss(tag),
        }
    }

    fn bytes(&mut self, tag: &'static str, value: &mut [u8]) {
        // A size mismatch counts as missing: never partially overwrite.
        match self.snapshot.get(tag) {
            Some(saved) if saved.len() == value.len() => {
                value.copy_from_slice(saved);
                self.applied += 1;
            }
            _ => self.miss(tag),
        }
    }
}
