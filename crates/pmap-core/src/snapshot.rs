//! Immutable, validated platform mapping snapshot.

use std::collections::BTreeMap;

use pmap_types::{PortId, ProfileId};
use tracing::{info, warn};

use crate::chips::{Chip, ChipRegistry};
use crate::config::{LoaderConfig, ValidationMode};
use crate::error::{ConfigIssue, MappingError, Result};
use crate::overrides::OverrideLayer;
use crate::profiles::ProfileCatalog;
use crate::raw::RawPlatformMapping;
use crate::topology::PinTopology;
use crate::validate;

/// A fully built and validated mapping.
///
/// Never mutated after [`MappingSnapshot::build`] returns; share it behind
/// an `Arc` and replace it wholesale on reload.
#[derive(Debug)]
pub struct MappingSnapshot {
    generation: u64,
    chips: ChipRegistry,
    topology: PinTopology,
    catalog: ProfileCatalog,
    overrides: OverrideLayer,
    quarantined: BTreeMap<(PortId, ProfileId), String>,
}

impl MappingSnapshot {
    /// Builds and validates a snapshot from a raw mapping.
    pub fn build(raw: &RawPlatformMapping, config: &LoaderConfig) -> Result<Self> {
        config.validate()?;

        let mut issues = Vec::new();
        let chips = ChipRegistry::build(&raw.chips, &mut issues);
        let topology = PinTopology::build(&raw.ports, &chips, &mut issues)?;
        let catalog = ProfileCatalog::build(raw, &chips)?;
        let overrides = OverrideLayer::build(&raw.port_config_overrides, &chips)?;
        validate::check_entries(&topology, &catalog, &overrides, config, &mut issues);

        let quarantined = if issues.is_empty() {
            BTreeMap::new()
        } else {
            match config.validation {
                ValidationMode::Strict => return Err(MappingError::InvalidMapping { issues }),
                ValidationMode::Quarantine => quarantine(&catalog, issues, config)?,
            }
        };

        let snapshot = Self {
            generation: 0,
            chips,
            topology,
            catalog,
            overrides,
            quarantined,
        };
        info!(
            ports = snapshot.topology.len(),
            chips = snapshot.chips.len(),
            profiles = snapshot.catalog.len(),
            overrides = snapshot.overrides.len(),
            quarantined = snapshot.quarantined.len(),
            "Built platform mapping snapshot"
        );
        Ok(snapshot)
    }

    /// Parses and builds a snapshot from a JSON document.
    pub fn from_json_str(s: &str, config: &LoaderConfig) -> Result<Self> {
        Self::build(&RawPlatformMapping::from_json_str(s)?, config)
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Store generation this snapshot was published under; zero if it was
    /// never published.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn chips(&self) -> &ChipRegistry {
        &self.chips
    }

    pub fn topology(&self) -> &PinTopology {
        &self.topology
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn overrides(&self) -> &OverrideLayer {
        &self.overrides
    }

    /// Returns the chip of the port's first iphy pin.
    pub fn iphy_chip(&self, port: PortId) -> Result<Option<&Chip>> {
        Ok(self
            .topology
            .iphy_chip(port)?
            .map(|handle| self.chips.chip(handle)))
    }

    /// Returns why the entry was quarantined, if it was.
    pub fn quarantine_reason(&self, port: PortId, profile: ProfileId) -> Option<&str> {
        self.quarantined.get(&(port, profile)).map(String::as_str)
    }

    /// Iterates quarantined entries with their reasons.
    pub fn quarantined(&self) -> impl Iterator<Item = (PortId, ProfileId, &str)> {
        self.quarantined
            .iter()
            .map(|((port, profile), reason)| (*port, *profile, reason.as_str()))
    }
}

/// Maps issues onto the entries they poison.
///
/// Entry-scoped issues quarantine that entry, port-scoped issues every entry
/// of the port. Any unscoped issue fails the load.
fn quarantine(
    catalog: &ProfileCatalog,
    issues: Vec<ConfigIssue>,
    config: &LoaderConfig,
) -> Result<BTreeMap<(PortId, ProfileId), String>> {
    if issues.iter().any(|i| i.port.is_none()) {
        let fatal = issues.into_iter().filter(|i| i.port.is_none()).collect();
        return Err(MappingError::InvalidMapping { issues: fatal });
    }

    let total = issues.len();
    let mut quarantined = BTreeMap::new();
    for (n, issue) in issues.into_iter().enumerate() {
        if n < config.max_logged_issues {
            warn!(issue = %issue, "Quarantining platform mapping entry");
        }
        let Some(port) = issue.port else {
            continue;
        };
        let profiles = match issue.profile {
            Some(profile) => vec![profile],
            None => catalog.supported_profiles(port).unwrap_or_default(),
        };
        for profile in profiles {
            quarantined
                .entry((port, profile))
                .or_insert_with(|| issue.message.clone());
        }
    }
    if total > config.max_logged_issues {
        warn!(
            suppressed = total - config.max_logged_issues,
            "Further quarantine issues not logged"
        );
    }
    Ok(quarantined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_sample() {
        let snapshot =
            MappingSnapshot::from_json_str(&pmap_test::sample_mapping_json(), &LoaderConfig::default())
                .unwrap();
        assert_eq!(snapshot.generation(), 0);
        assert_eq!(snapshot.topology().len(), 4);
        assert_eq!(snapshot.chips().len(), 2);
        assert_eq!(snapshot.quarantined().count(), 0);
        assert_eq!(
            snapshot.iphy_chip(PortId(1)).unwrap().map(|c| c.name.as_str()),
            Some("BC0")
        );
    }

    #[test]
    fn test_strict_rejects_inconsistent_mapping() {
        let err = MappingSnapshot::from_json_str(
            &pmap_test::inconsistent_mapping_json(),
            &LoaderConfig::strict(),
        )
        .unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(err.issues().len(), 1);
    }

    #[test]
    fn test_quarantine_isolates_entry() {
        let snapshot = MappingSnapshot::from_json_str(
            &pmap_test::inconsistent_mapping_json(),
            &LoaderConfig::quarantine(),
        )
        .unwrap();
        assert!(snapshot
            .quarantine_reason(PortId(20), ProfileId(22))
            .unwrap()
            .contains("subsumed port 22"));
        assert_eq!(snapshot.quarantine_reason(PortId(22), ProfileId(22)), None);
        assert_eq!(snapshot.quarantined().count(), 1);
    }

    #[test]
    fn test_quarantine_port_issue_covers_all_profiles() {
        let json = pmap_test::MappingBuilder::new()
            .chip("BC0", 1, 0)
            .port(1, "eth1/1/1", 1, &[("BC0", 0, None)])
            .port(2, "eth1/1/2", 9, &[("BC0", 1, None)])
            .profile(11, 10_000, 1, 1, 1, 1)
            .profile(12, 10_000, 1, 1, 1, 2)
            .supported_profile(2, 11, &[("BC0", 1, None)], &[], &[])
            .supported_profile(2, 12, &[("BC0", 1, None)], &[], &[])
            .to_json_string();
        let snapshot = MappingSnapshot::from_json_str(&json, &LoaderConfig::quarantine()).unwrap();
        let entries: Vec<_> = snapshot.quarantined().map(|(p, f, _)| (p, f)).collect();
        assert_eq!(
            entries,
            vec![(PortId(2), ProfileId(11)), (PortId(2), ProfileId(12))]
        );
    }

    #[test]
    fn test_quarantine_still_fails_on_global_issue() {
        let json = pmap_test::MappingBuilder::new()
            .chip("BC0", 1, 0)
            .chip("BC0", 1, 1)
            .port(1, "eth1/1/1", 1, &[("BC0", 0, None)])
            .to_json_string();
        let err = MappingSnapshot::from_json_str(&json, &LoaderConfig::quarantine()).unwrap_err();
        assert!(matches!(err, MappingError::InvalidMapping { ref issues } if issues.len() == 1));
    }

    #[test]
    fn test_unknown_chip_is_fatal_in_any_mode() {
        let json = pmap_test::MappingBuilder::new()
            .chip("BC0", 1, 0)
            .port(1, "eth1/1/1", 1, &[("BC1", 0, None)])
            .to_json_string();
        let err = MappingSnapshot::from_json_str(&json, &LoaderConfig::quarantine()).unwrap_err();
        assert!(matches!(err, MappingError::UnknownChip { .. }));
    }
}
