//! Port profile resolution.
//!
//! Turns a (port, profile) request into the concrete per-lane programming
//! plan: iphy pins with their effective TX settings, transceiver pins, and
//! the ports the profile subsumes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use pmap_types::{PinId, PortId, PortSpeed, ProfileId, TxSettings};
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::error::{MappingError, Result};
use crate::overrides::{OverridePin, OverrideRule, TransceiverFactor};
use crate::profiles::{PortProfileEntry, Profile};
use crate::snapshot::MappingSnapshot;

/// A resolution request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveRequest {
    pub port: PortId,
    pub profile: ProfileId,
    /// Module currently plugged in, used to match transceiver-gated overrides.
    pub transceiver: Option<TransceiverFactor>,
}

impl ResolveRequest {
    pub fn new(port: PortId, profile: ProfileId) -> Self {
        Self {
            port,
            profile,
            transceiver: None,
        }
    }

    pub fn with_transceiver(mut self, transceiver: TransceiverFactor) -> Self {
        self.transceiver = Some(transceiver);
        self
    }
}

/// Where a resolved TX value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxSource {
    /// The port profile entry's own setting.
    Default,
    /// An override addressing the lane by position.
    AllLanesOverride,
    /// An override addressing the physical (chip, lane).
    ChipOverride,
}

/// An iphy pin with its effective TX settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedIphyPin {
    pub pin: PinId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<TxSettings>,
    pub tx_source: TxSource,
}

/// Everything a driver needs to program a port for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortProgrammingPlan {
    pub port: PortId,
    pub profile: ProfileId,
    pub effective_profile: Profile,
    pub iphy_pins: Vec<ResolvedIphyPin>,
    pub transceiver_pins: Vec<PinId>,
    pub subsumed_ports: BTreeSet<PortId>,
}

/// Resolves programming plans against one snapshot.
///
/// Cheap to clone; holds the snapshot alive for as long as it exists.
#[derive(Debug, Clone)]
pub struct PortProfileResolver {
    snapshot: Arc<MappingSnapshot>,
}

impl PortProfileResolver {
    pub fn new(snapshot: Arc<MappingSnapshot>) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &Arc<MappingSnapshot> {
        &self.snapshot
    }

    /// Resolves a plan with no transceiver context.
    pub fn resolve(&self, port: PortId, profile: ProfileId) -> Result<PortProgrammingPlan> {
        self.resolve_with(&ResolveRequest::new(port, profile))
    }

    /// Resolves a plan.
    #[instrument(skip(self, request), fields(port = %request.port, profile = %request.profile))]
    pub fn resolve_with(&self, request: &ResolveRequest) -> Result<PortProgrammingPlan> {
        let snapshot = &*self.snapshot;
        let port = snapshot.topology().port(request.port)?;
        snapshot.catalog().lookup_profile(request.profile)?;

        let entry = snapshot
            .catalog()
            .lookup_port_profile_entry(request.port, request.profile)?;
        if let Some(reason) = snapshot.quarantine_reason(request.port, request.profile) {
            error!(reason, "Resolving quarantined entry");
            return Err(MappingError::inconsistency(
                request.port,
                request.profile,
                format!("entry quarantined at load: {}", reason),
            ));
        }

        let rules = snapshot.overrides().find_overrides_with(
            request.port,
            request.profile,
            request.transceiver.as_ref(),
        );

        let effective_profile = match rules.iter().rev().find_map(|r| r.profile.as_ref()) {
            Some(config) => {
                debug!("Using override profile");
                Profile::from_config(request.profile, config)
            }
            None => snapshot
                .catalog()
                .lookup_profile_for_pim(request.profile, port.pim_id())
                .map_err(|_| MappingError::UnsupportedProfileForPort {
                    port: request.port,
                    profile: request.profile,
                })?
                .clone(),
        };

        let iphy_pins = self.apply_overrides(entry, &rules);
        self.check_subsumption(request, entry)?;

        let chips = snapshot.chips();
        let transceiver_pins = entry
            .transceiver
            .iter()
            .flatten()
            .map(|pin| chips.pin_id(*pin))
            .collect();

        Ok(PortProgrammingPlan {
            port: request.port,
            profile: request.profile,
            effective_profile,
            iphy_pins,
            transceiver_pins,
            subsumed_ports: entry.subsumed.clone(),
        })
    }

    /// Picks the winning override candidate for each iphy pin.
    ///
    /// Chip-specific entries beat `ALL` entries regardless of rule order;
    /// among equally specific entries the later rule wins.
    fn apply_overrides(
        &self,
        entry: &PortProfileEntry,
        rules: &[&OverrideRule],
    ) -> Vec<ResolvedIphyPin> {
        let chips = self.snapshot.chips();
        entry
            .iphy
            .iter()
            .enumerate()
            .map(|(position, iphy)| {
                let mut winner: Option<(&OverrideRule, &OverridePin)> = None;
                for &rule in rules {
                    let Some(candidate) = rule.candidate(position, iphy.pin) else {
                        continue;
                    };
                    let replaces = match winner {
                        Some((_, current)) => {
                            candidate.is_chip_specific() || !current.is_chip_specific()
                        }
                        None => true,
                    };
                    if replaces {
                        winner = Some((rule, candidate));
                    }
                }

                let pin = chips.pin_id(iphy.pin);
                match winner {
                    Some((rule, candidate)) => {
                        debug!(pin = %pin, rule = rule.index, "Applying TX override");
                        ResolvedIphyPin {
                            pin,
                            tx: candidate.tx,
                            tx_source: if candidate.is_chip_specific() {
                                TxSource::ChipOverride
                            } else {
                                TxSource::AllLanesOverride
                            },
                        }
                    }
                    None => ResolvedIphyPin {
                        pin,
                        tx: iphy.tx,
                        tx_source: TxSource::Default,
                    },
                }
            })
            .collect()
    }

    fn check_subsumption(&self, request: &ResolveRequest, entry: &PortProfileEntry) -> Result<()> {
        let sharing = self
            .snapshot
            .topology()
            .ports_sharing_any(entry.iphy_pins());
        if let Some(stray) = entry.subsumed.iter().find(|p| !sharing.contains(p)) {
            error!(subsumed = %stray, "Subsumed port shares no lane with the profile's pins");
            return Err(MappingError::inconsistency(
                request.port,
                request.profile,
                format!("subsumed port {} shares no lane with the profile's pins", stray),
            ));
        }
        Ok(())
    }

    /// Highest speed among the port's supported profiles.
    pub fn max_speed(&self, port: PortId) -> Result<PortSpeed> {
        let snapshot = &*self.snapshot;
        let pim = snapshot.topology().pim_id(port)?;
        let max = snapshot
            .catalog()
            .supported_profiles(port)?
            .into_iter()
            .filter_map(|profile| {
                snapshot
                    .catalog()
                    .lookup_profile_for_pim(profile, pim)
                    .ok()
            })
            .map(|p| p.speed)
            .max()
            .unwrap_or_default();
        Ok(max)
    }

    /// Resolves controlling ports and groups their iphy pins by core chip.
    ///
    /// Ports that are not their own controlling port are skipped.
    #[instrument(skip(self, ports), fields(count = ports.len()))]
    pub fn core_pin_mapping(
        &self,
        ports: &[(PortId, ProfileId)],
    ) -> Result<BTreeMap<String, Vec<ResolvedIphyPin>>> {
        let mut mapping: BTreeMap<String, Vec<ResolvedIphyPin>> = BTreeMap::new();
        for (port, profile) in ports {
            if !self.snapshot.topology().port(*port)?.is_controlling() {
                continue;
            }
            let plan = self.resolve(*port, *profile)?;
            for pin in plan.iphy_pins {
                mapping.entry(pin.pin.chip.clone()).or_default().push(pin);
            }
        }
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use pretty_assertions::assert_eq;

    fn resolver() -> PortProfileResolver {
        let snapshot =
            MappingSnapshot::from_json_str(&pmap_test::sample_mapping_json(), &LoaderConfig::default())
                .unwrap();
        PortProfileResolver::new(Arc::new(snapshot))
    }

    #[test]
    fn test_resolve_400g() {
        let plan = resolver().resolve(PortId(1), ProfileId(26)).unwrap();
        assert_eq!(plan.iphy_pins.len(), 8);
        assert_eq!(plan.transceiver_pins.len(), 8);
        assert_eq!(plan.iphy_pins[7].pin, PinId::new("BC0", 7));
        assert_eq!(plan.transceiver_pins[7], PinId::new("eth1/1", 7));
        assert!(plan
            .iphy_pins
            .iter()
            .all(|p| p.tx == Some(TxSettings::new(-16, 148, -4)) && p.tx_source == TxSource::Default));
        assert_eq!(plan.effective_profile.speed, PortSpeed(400_000));
        assert!(plan.subsumed_ports.is_empty());
    }

    #[test]
    fn test_unknown_port_checked_before_profile() {
        let err = resolver().resolve(PortId(99), ProfileId(99)).unwrap_err();
        assert!(matches!(err, MappingError::UnknownPort { .. }));
        let err = resolver().resolve(PortId(1), ProfileId(99)).unwrap_err();
        assert!(matches!(err, MappingError::UnknownProfile { .. }));
    }

    #[test]
    fn test_unsupported_profile() {
        let err = resolver().resolve(PortId(7), ProfileId(26)).unwrap_err();
        assert!(matches!(
            err,
            MappingError::UnsupportedProfileForPort { port, profile }
                if port == PortId(7) && profile == ProfileId(26)
        ));
    }

    #[test]
    fn test_max_speed() {
        let resolver = resolver();
        assert_eq!(resolver.max_speed(PortId(1)).unwrap(), PortSpeed(400_000));
        assert_eq!(resolver.max_speed(PortId(3)).unwrap(), PortSpeed(50_000));
        assert_eq!(resolver.max_speed(PortId(7)).unwrap(), PortSpeed(10_000));
        assert!(resolver.max_speed(PortId(99)).is_err());
    }

    #[test]
    fn test_core_pin_mapping_skips_non_controlling_ports() {
        let mapping = resolver()
            .core_pin_mapping(&[
                (PortId(1), ProfileId(22)),
                (PortId(3), ProfileId(11)),
                (PortId(5), ProfileId(22)),
            ])
            .unwrap();
        assert_eq!(mapping.len(), 1);
        let pins: Vec<_> = mapping["BC0"].iter().map(|p| p.pin.lane).collect();
        assert_eq!(pins, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }
}
