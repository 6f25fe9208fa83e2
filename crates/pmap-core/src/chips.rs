//! Chip registry.
//!
//! Chip names are interned to dense handles when a snapshot is built; all
//! pins inside the snapshot refer to chips by handle.

use std::collections::HashMap;
use std::fmt;

use pmap_types::{ChipKind, PinId};

use crate::error::{ConfigIssue, MappingError, Result};
use crate::raw::RawChip;

/// Dense index of a chip within one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChipHandle(u32);

impl ChipHandle {
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A chip on the data path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip {
    pub name: String,
    pub kind: ChipKind,
    pub physical_id: u32,
}

/// A lane on an interned chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pin {
    pub chip: ChipHandle,
    pub lane: u32,
}

impl Pin {
    pub const fn new(chip: ChipHandle, lane: u32) -> Self {
        Self { chip, lane }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.chip.0, self.lane)
    }
}

/// Name-keyed registry of chips with O(1) lookup.
#[derive(Debug, Default)]
pub struct ChipRegistry {
    chips: Vec<Chip>,
    by_name: HashMap<String, ChipHandle>,
}

impl ChipRegistry {
    /// Builds the registry. Duplicate names are reported as global issues.
    pub fn build(raw: &[RawChip], issues: &mut Vec<ConfigIssue>) -> Self {
        let mut registry = ChipRegistry::default();
        for chip in raw {
            if registry.by_name.contains_key(&chip.name) {
                issues.push(ConfigIssue::global(format!("duplicate chip '{}'", chip.name)));
                continue;
            }
            let handle = ChipHandle(registry.chips.len() as u32);
            registry.by_name.insert(chip.name.clone(), handle);
            registry.chips.push(Chip {
                name: chip.name.clone(),
                kind: chip.kind,
                physical_id: chip.physical_id,
            });
        }
        registry
    }

    /// Looks up a chip by name.
    pub fn lookup_chip(&self, name: &str) -> Result<&Chip> {
        self.handle(name).map(|h| self.chip(h))
    }

    /// Returns the handle for a chip name.
    pub fn handle(&self, name: &str) -> Result<ChipHandle> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| MappingError::UnknownChip {
                name: name.to_string(),
            })
    }

    /// Returns the chip behind a handle.
    ///
    /// Handles are only minted by this registry, so indexing cannot fail for
    /// a handle obtained from the same snapshot.
    pub fn chip(&self, handle: ChipHandle) -> &Chip {
        &self.chips[handle.index()]
    }

    pub fn name(&self, handle: ChipHandle) -> &str {
        &self.chip(handle).name
    }

    /// Interns a named pin.
    pub fn intern(&self, pin: &PinId) -> Result<Pin> {
        Ok(Pin::new(self.handle(&pin.chip)?, pin.lane))
    }

    /// Converts an interned pin back to its named form.
    pub fn pin_id(&self, pin: Pin) -> PinId {
        PinId::new(self.name(pin.chip), pin.lane)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChipHandle, &Chip)> {
        self.chips
            .iter()
            .enumerate()
            .map(|(i, chip)| (ChipHandle(i as u32), chip))
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }
}
