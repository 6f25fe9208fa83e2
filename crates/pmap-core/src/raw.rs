//! Platform mapping document model.
//!
//! These types mirror the JSON document a platform ships with: `ports`,
//! `chips`, `portConfigOverrides` and `platformSupportedProfiles`. They are
//! plain serde records with string chip names; [`crate::MappingSnapshot`]
//! interns and validates them.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use pmap_types::{
    ChipKind, FecMode, InterfaceMode, InterfaceType, Medium, Modulation, PinId, PortId,
    PortScope, PortSpeed, PortType, ProfileId, TxSettings,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MappingError, Result};

/// Chip name that targets every chip in an override pin entry.
pub const ALL_CHIPS: &str = "ALL";

/// The complete platform mapping document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlatformMapping {
    pub ports: BTreeMap<PortId, RawPortEntry>,
    #[serde(default)]
    pub chips: Vec<RawChip>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub port_config_overrides: Vec<RawPortConfigOverride>,
    #[serde(default)]
    pub platform_supported_profiles: Vec<RawProfileEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChip {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChipKind,
    #[serde(rename = "physicalID")]
    pub physical_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPortEntry {
    pub mapping: RawPortMapping,
    #[serde(default)]
    pub supported_profiles: BTreeMap<ProfileId, RawPortProfileConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPortMapping {
    pub id: PortId,
    pub name: String,
    pub controlling_port: PortId,
    pub pins: Vec<RawPinConnection>,
    #[serde(default)]
    pub port_type: PortType,
    #[serde(default)]
    pub scope: PortScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_core_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_core_port_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_device_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPinConnection {
    pub a: PinId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<RawPinEnd>,
}

/// Far side of a pin connection. Only direct `end` pins are modeled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawPinEnd {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<PinId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPortProfileConfig {
    pub pins: RawPortPinConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsumed_ports: Option<Vec<PortId>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawPortPinConfig {
    #[serde(default)]
    pub iphy: Vec<RawPinConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transceiver: Option<Vec<RawPinConfig>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPinConfig {
    pub id: PinId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx: Option<TxSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPortConfigOverride {
    pub factor: RawOverrideFactor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pins: Option<RawOverridePins>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_profile_config: Option<RawProfileConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOverrideFactor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<ProfileId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cable_lengths: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_interface_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transceiver_management_interface: Option<i32>,
}

impl RawOverrideFactor {
    /// Returns true if both factors are equal apart from their port lists.
    fn same_except_ports(&self, other: &RawOverrideFactor) -> bool {
        self.profiles == other.profiles
            && self.cable_lengths == other.cable_lengths
            && self.media_interface_code == other.media_interface_code
            && self.transceiver_management_interface == other.transceiver_management_interface
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawOverridePins {
    #[serde(default)]
    pub iphy: Vec<RawPinConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProfileEntry {
    pub factor: RawProfileFactor,
    pub profile: RawProfileConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProfileFactor {
    #[serde(rename = "profileID")]
    pub profile_id: ProfileId,
    #[serde(rename = "pimIDs", default, skip_serializing_if = "Option::is_none")]
    pub pim_ids: Option<BTreeSet<u32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProfileConfig {
    pub speed: PortSpeed,
    pub iphy: RawProfileSideConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfileSideConfig {
    pub num_lanes: u32,
    pub modulation: Modulation,
    pub fec: FecMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<Medium>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_mode: Option<InterfaceMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_type: Option<InterfaceType>,
}

impl RawPlatformMapping {
    /// Parses a mapping document from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Parses a mapping document from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Reads and parses a mapping document from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Serializes the mapping back to its JSON document form.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Merges another mapping fragment into this one.
    ///
    /// Ports and chips already present here are kept. Supported profiles
    /// with the same id and config have their PIM sets combined; the same id
    /// with a different config is only allowed when the PIM sets are
    /// disjoint. Override rules identical apart from their port lists are
    /// combined into one rule.
    pub fn merge(&mut self, other: RawPlatformMapping) -> Result<()> {
        for (id, entry) in other.ports {
            self.ports.entry(id).or_insert(entry);
        }
        for chip in other.chips {
            if !self.chips.iter().any(|c| c.name == chip.name) {
                self.chips.push(chip);
            }
        }
        for incoming in other.platform_supported_profiles {
            self.merge_supported_profile(incoming)?;
        }
        for incoming in other.port_config_overrides {
            self.merge_port_config_override(incoming);
        }
        Ok(())
    }

    fn merge_supported_profile(&mut self, incoming: RawProfileEntry) -> Result<()> {
        for current in &mut self.platform_supported_profiles {
            if current.factor.profile_id != incoming.factor.profile_id {
                continue;
            }
            if current.profile == incoming.profile {
                // An unrestricted entry is never widened or narrowed.
                let Some(current_pims) = current.factor.pim_ids.as_mut() else {
                    continue;
                };
                if let Some(incoming_pims) = &incoming.factor.pim_ids {
                    current_pims.extend(incoming_pims.iter().copied());
                }
                return Ok(());
            }
            if let (Some(a), Some(b)) = (&current.factor.pim_ids, &incoming.factor.pim_ids) {
                if !a.is_disjoint(b) {
                    return Err(MappingError::MergeConflict {
                        profile: incoming.factor.profile_id,
                        message:
                            "supported profiles with different configs are not mutually exclusive"
                                .to_string(),
                    });
                }
            }
        }
        debug!(profile = %incoming.factor.profile_id, "appending supported profile");
        self.platform_supported_profiles.push(incoming);
        Ok(())
    }

    fn merge_port_config_override(&mut self, incoming: RawPortConfigOverride) {
        for current in &mut self.port_config_overrides {
            if current.pins != incoming.pins
                || current.port_profile_config != incoming.port_profile_config
                || !current.factor.same_except_ports(&incoming.factor)
            {
                continue;
            }
            match (&mut current.factor.ports, &incoming.factor.ports) {
                (Some(current_ports), Some(incoming_ports)) => {
                    for port in incoming_ports {
                        if !current_ports.contains(port) {
                            current_ports.push(*port);
                        }
                    }
                    return;
                }
                (None, None) => return,
                _ => {}
            }
        }
        self.port_config_overrides.push(incoming);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PORT_JSON: &str = r#"{
        "ports": {
            "1": {
                "mapping": {
                    "id": 1,
                    "name": "eth1/1/1",
                    "controllingPort": 1,
                    "pins": [
                        {"a": {"chip": "BC0", "lane": 0}, "z": {"end": {"chip": "eth1/1", "lane": 0}}}
                    ]
                },
                "supportedProfiles": {
                    "11": {
                        "pins": {
                            "iphy": [{"id": {"chip": "BC0", "lane": 0}}],
                            "transceiver": [{"id": {"chip": "eth1/1", "lane": 0}}]
                        }
                    }
                }
            }
        },
        "chips": [
            {"name": "BC0", "type": 1, "physicalID": 0},
            {"name": "eth1/1", "type": 3, "physicalID": 0}
        ],
        "platformSupportedProfiles": [
            {
                "factor": {"profileID": 11},
                "profile": {
                    "speed": 10000,
                    "iphy": {"numLanes": 1, "modulation": 1, "fec": 1, "medium": 1,
                             "interfaceMode": 10, "interfaceType": 10}
                }
            }
        ]
    }"#;

    fn profile_entry(id: u32, pims: Option<&[u32]>, speed: u32) -> RawProfileEntry {
        RawProfileEntry {
            factor: RawProfileFactor {
                profile_id: ProfileId(id),
                pim_ids: pims.map(|p| p.iter().copied().collect()),
            },
            profile: RawProfileConfig {
                speed: PortSpeed(speed),
                iphy: RawProfileSideConfig {
                    num_lanes: 1,
                    modulation: Modulation::Nrz,
                    fec: FecMode::None,
                    medium: Some(Medium::Copper),
                    interface_mode: None,
                    interface_type: None,
                },
            },
        }
    }

    #[test]
    fn test_parse_document() {
        let raw = RawPlatformMapping::from_json_str(PORT_JSON).unwrap();
        assert_eq!(raw.ports.len(), 1);
        let port = &raw.ports[&PortId(1)];
        assert_eq!(port.mapping.name, "eth1/1/1");
        assert_eq!(port.mapping.port_type, PortType::Interface);
        assert_eq!(
            port.mapping.pins[0].z.as_ref().and_then(|z| z.end.clone()),
            Some(PinId::new("eth1/1", 0))
        );
        let cfg = &port.supported_profiles[&ProfileId(11)];
        assert_eq!(cfg.pins.iphy[0].tx, None);
        assert_eq!(cfg.subsumed_ports, None);
        assert_eq!(raw.chips[1].kind, ChipKind::Transceiver);
        assert!(raw.port_config_overrides.is_empty());
    }

    #[test]
    fn test_document_survives_serialization() {
        let raw = RawPlatformMapping::from_json_str(PORT_JSON).unwrap();
        let again = RawPlatformMapping::from_json_str(&raw.to_json_pretty().unwrap()).unwrap();
        assert_eq!(raw, again);
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        let err = RawPlatformMapping::from_path("/nonexistent/platform_mapping.json").unwrap_err();
        assert!(matches!(err, MappingError::Io { .. }));
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, PORT_JSON.as_bytes()).unwrap();
        let raw = RawPlatformMapping::from_path(file.path()).unwrap();
        assert!(raw.ports.contains_key(&PortId(1)));
    }

    #[test]
    fn test_merge_keeps_existing_ports_and_chips() {
        let mut base = RawPlatformMapping::from_json_str(PORT_JSON).unwrap();
        let mut other = base.clone();
        other.ports.get_mut(&PortId(1)).unwrap().mapping.name = "renamed".to_string();
        other.chips.push(RawChip {
            name: "BC1".to_string(),
            kind: ChipKind::Core,
            physical_id: 1,
        });
        base.merge(other).unwrap();
        assert_eq!(base.ports[&PortId(1)].mapping.name, "eth1/1/1");
        assert_eq!(base.chips.len(), 3);
    }

    #[test]
    fn test_merge_combines_pim_sets_for_equal_profiles() {
        let mut base = RawPlatformMapping {
            platform_supported_profiles: vec![profile_entry(11, Some(&[2]), 10000)],
            ..Default::default()
        };
        let other = RawPlatformMapping {
            platform_supported_profiles: vec![profile_entry(11, Some(&[3, 4]), 10000)],
            ..Default::default()
        };
        base.merge(other).unwrap();
        assert_eq!(base.platform_supported_profiles.len(), 1);
        assert_eq!(
            base.platform_supported_profiles[0].factor.pim_ids,
            Some([2, 3, 4].into_iter().collect())
        );
    }

    #[test]
    fn test_merge_appends_disjoint_pim_variants() {
        let mut base = RawPlatformMapping {
            platform_supported_profiles: vec![profile_entry(11, Some(&[2]), 10000)],
            ..Default::default()
        };
        let other = RawPlatformMapping {
            platform_supported_profiles: vec![profile_entry(11, Some(&[3]), 25000)],
            ..Default::default()
        };
        base.merge(other).unwrap();
        assert_eq!(base.platform_supported_profiles.len(), 2);
    }

    #[test]
    fn test_merge_appends_variant_next_to_unrestricted_entry() {
        let mut base = RawPlatformMapping {
            platform_supported_profiles: vec![profile_entry(11, None, 10000)],
            ..Default::default()
        };
        let other = RawPlatformMapping {
            platform_supported_profiles: vec![profile_entry(11, Some(&[3]), 25000)],
            ..Default::default()
        };
        base.merge(other).unwrap();
        assert_eq!(base.platform_supported_profiles.len(), 2);
        assert_eq!(base.platform_supported_profiles[0].factor.pim_ids, None);
        assert_eq!(
            base.platform_supported_profiles[1].factor.pim_ids,
            Some([3].into_iter().collect())
        );
    }

    #[test]
    fn test_merge_keeps_pim_set_for_unrestricted_incoming() {
        let mut base = RawPlatformMapping {
            platform_supported_profiles: vec![profile_entry(11, Some(&[2]), 10000)],
            ..Default::default()
        };
        let other = RawPlatformMapping {
            platform_supported_profiles: vec![profile_entry(11, None, 10000)],
            ..Default::default()
        };
        base.merge(other).unwrap();
        assert_eq!(base.platform_supported_profiles.len(), 1);
        assert_eq!(
            base.platform_supported_profiles[0].factor.pim_ids,
            Some([2].into_iter().collect())
        );
    }

    #[test]
    fn test_merge_rejects_overlapping_pim_variants() {
        let mut base = RawPlatformMapping {
            platform_supported_profiles: vec![profile_entry(11, Some(&[2, 3]), 10000)],
            ..Default::default()
        };
        let other = RawPlatformMapping {
            platform_supported_profiles: vec![profile_entry(11, Some(&[3]), 25000)],
            ..Default::default()
        };
        let err = base.merge(other).unwrap_err();
        assert!(matches!(err, MappingError::MergeConflict { profile, .. } if profile == ProfileId(11)));
    }

    #[test]
    fn test_merge_combines_override_port_lists() {
        let rule = |ports: Vec<u32>| RawPortConfigOverride {
            factor: RawOverrideFactor {
                ports: Some(ports.into_iter().map(PortId).collect()),
                profiles: Some(vec![ProfileId(12)]),
                ..Default::default()
            },
            pins: Some(RawOverridePins {
                iphy: vec![RawPinConfig {
                    id: PinId::new(ALL_CHIPS, 0),
                    tx: Some(TxSettings::new(-2, 117, -8)),
                }],
            }),
            port_profile_config: None,
        };
        let mut base = RawPlatformMapping {
            port_config_overrides: vec![rule(vec![1, 3])],
            ..Default::default()
        };
        let other = RawPlatformMapping {
            port_config_overrides: vec![rule(vec![3, 5])],
            ..Default::default()
        };
        base.merge(other).unwrap();
        assert_eq!(base.port_config_overrides.len(), 1);
        assert_eq!(
            base.port_config_overrides[0].factor.ports,
            Some(vec![PortId(1), PortId(3), PortId(5)])
        );
    }
}
