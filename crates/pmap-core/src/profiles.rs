//! Profile catalog and per-port profile entries.

use std::collections::{BTreeMap, BTreeSet};

use pmap_types::{
    FecMode, InterfaceMode, InterfaceType, Medium, Modulation, PortId, PortSpeed, ProfileId,
    TxSettings,
};
use serde::Serialize;

use crate::chips::{ChipRegistry, Pin};
use crate::error::{MappingError, Result};
use crate::raw::{RawPlatformMapping, RawProfileConfig};

/// A named speed/encoding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: ProfileId,
    pub speed: PortSpeed,
    pub num_lanes: u32,
    pub modulation: Modulation,
    pub fec: FecMode,
    pub medium: Medium,
    pub interface_mode: InterfaceMode,
    pub interface_type: InterfaceType,
}

impl Profile {
    /// Builds a profile from its document form.
    pub fn from_config(id: ProfileId, config: &RawProfileConfig) -> Self {
        Self {
            id,
            speed: config.speed,
            num_lanes: config.iphy.num_lanes,
            modulation: config.iphy.modulation,
            fec: config.iphy.fec,
            medium: config.iphy.medium.unwrap_or(Medium::Unknown),
            interface_mode: config.iphy.interface_mode.unwrap_or_default(),
            interface_type: config.iphy.interface_type.unwrap_or_default(),
        }
    }
}

/// An iphy pin of a port profile entry with its default TX settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IphyPin {
    pub pin: Pin,
    pub tx: Option<TxSettings>,
}

/// The pins and subsumed ports a port uses for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortProfileEntry {
    pub iphy: Vec<IphyPin>,
    pub transceiver: Option<Vec<Pin>>,
    pub subsumed: BTreeSet<PortId>,
}

impl PortProfileEntry {
    pub fn iphy_pins(&self) -> impl Iterator<Item = &Pin> {
        self.iphy.iter().map(|p| &p.pin)
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    profile: Profile,
    pim_ids: Option<BTreeSet<u32>>,
}

impl CatalogEntry {
    // An entry without PIM restriction, or a caller without PIM, matches.
    fn matches_pim(&self, pim: Option<u32>) -> bool {
        match (&self.pim_ids, pim) {
            (Some(pims), Some(pim)) => pims.contains(&pim),
            _ => true,
        }
    }
}

/// Platform profiles plus the per-port profile entries.
#[derive(Debug, Default)]
pub struct ProfileCatalog {
    profiles: Vec<CatalogEntry>,
    port_entries: BTreeMap<PortId, BTreeMap<ProfileId, PortProfileEntry>>,
}

impl ProfileCatalog {
    /// Builds the catalog, interning every pin.
    pub fn build(raw: &RawPlatformMapping, chips: &ChipRegistry) -> Result<Self> {
        let profiles = raw
            .platform_supported_profiles
            .iter()
            .map(|entry| CatalogEntry {
                profile: Profile::from_config(entry.factor.profile_id, &entry.profile),
                pim_ids: entry.factor.pim_ids.clone(),
            })
            .collect();

        let mut port_entries = BTreeMap::new();
        for (port, entry) in &raw.ports {
            let mut supported = BTreeMap::new();
            for (profile, config) in &entry.supported_profiles {
                let iphy = config
                    .pins
                    .iphy
                    .iter()
                    .map(|p| {
                        Ok(IphyPin {
                            pin: chips.intern(&p.id)?,
                            tx: p.tx,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let transceiver = match &config.pins.transceiver {
                    Some(pins) => Some(
                        pins.iter()
                            .map(|p| chips.intern(&p.id))
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    None => None,
                };
                let subsumed = config
                    .subsumed_ports
                    .iter()
                    .flatten()
                    .copied()
                    .collect();
                supported.insert(
                    *profile,
                    PortProfileEntry {
                        iphy,
                        transceiver,
                        subsumed,
                    },
                );
            }
            port_entries.insert(*port, supported);
        }

        Ok(Self {
            profiles,
            port_entries,
        })
    }

    /// Looks up a profile regardless of PIM restriction.
    pub fn lookup_profile(&self, profile: ProfileId) -> Result<&Profile> {
        self.lookup_profile_for_pim(profile, None)
    }

    /// Looks up the profile variant that applies to a PIM slot.
    pub fn lookup_profile_for_pim(&self, profile: ProfileId, pim: Option<u32>) -> Result<&Profile> {
        self.profiles
            .iter()
            .find(|e| e.profile.id == profile && e.matches_pim(pim))
            .map(|e| &e.profile)
            .ok_or(MappingError::UnknownProfile { profile })
    }

    /// Returns true if any variant of the profile exists.
    pub fn contains(&self, profile: ProfileId) -> bool {
        self.profiles.iter().any(|e| e.profile.id == profile)
    }

    pub fn lookup_port_profile_entry(
        &self,
        port: PortId,
        profile: ProfileId,
    ) -> Result<&PortProfileEntry> {
        self.port_entries
            .get(&port)
            .ok_or(MappingError::UnknownPort { port })?
            .get(&profile)
            .ok_or(MappingError::UnsupportedProfileForPort { port, profile })
    }

    /// Returns the port's supported profile ids in ascending order.
    pub fn supported_profiles(&self, port: PortId) -> Result<Vec<ProfileId>> {
        self.port_entries
            .get(&port)
            .map(|entries| entries.keys().copied().collect())
            .ok_or(MappingError::UnknownPort { port })
    }

    /// Iterates every (port, profile, entry) triple.
    pub fn port_entries(&self) -> impl Iterator<Item = (PortId, ProfileId, &PortProfileEntry)> {
        self.port_entries.iter().flat_map(|(port, entries)| {
            entries
                .iter()
                .map(move |(profile, entry)| (*port, *profile, entry))
        })
    }

    /// Number of distinct profile ids.
    pub fn len(&self) -> usize {
        self.profiles
            .iter()
            .map(|e| e.profile.id)
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
