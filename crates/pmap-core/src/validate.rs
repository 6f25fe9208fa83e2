//! Load-time consistency checks across topology, catalog and overrides.
//!
//! Structural checks that fall out of building each component (duplicate
//! chips, port key mismatches, controlling ports) are reported by the
//! builders themselves. This module checks every supported (port, profile)
//! entry against the rest of the mapping.

use pmap_types::{PortId, ProfileId};
use tracing::warn;

use crate::config::{LoaderConfig, OverlapPolicy};
use crate::error::ConfigIssue;
use crate::overrides::{OverrideLayer, OverrideRule};
use crate::profiles::{PortProfileEntry, ProfileCatalog};
use crate::topology::{LogicalPort, PinTopology};

/// Checks every supported entry, appending problems to `issues`.
pub fn check_entries(
    topology: &PinTopology,
    catalog: &ProfileCatalog,
    overrides: &OverrideLayer,
    config: &LoaderConfig,
    issues: &mut Vec<ConfigIssue>,
) {
    for (port_id, profile_id, entry) in catalog.port_entries() {
        let Ok(port) = topology.port(port_id) else {
            continue;
        };
        check_entry(topology, catalog, config, port, profile_id, entry, issues);
        check_entry_overrides(overrides, config, port_id, profile_id, entry, issues);
    }
}

fn check_entry(
    topology: &PinTopology,
    catalog: &ProfileCatalog,
    config: &LoaderConfig,
    port: &LogicalPort,
    profile_id: ProfileId,
    entry: &PortProfileEntry,
    issues: &mut Vec<ConfigIssue>,
) {
    let issue = |message: String| ConfigIssue::entry(port.id, profile_id, message);

    if !catalog.contains(profile_id) {
        issues.push(issue("profile is not in the platform profile catalog".to_string()));
        return;
    }
    let pim = port.pim_id();
    let Ok(profile) = catalog.lookup_profile_for_pim(profile_id, pim) else {
        issues.push(issue(format!("no profile variant for PIM {:?}", pim)));
        return;
    };

    let num_lanes = profile.num_lanes as usize;
    if entry.iphy.len() != num_lanes {
        issues.push(issue(format!(
            "{} iphy pins for a {}-lane profile",
            entry.iphy.len(),
            num_lanes
        )));
    }
    if let Some(transceiver) = &entry.transceiver {
        if transceiver.len() != num_lanes {
            issues.push(issue(format!(
                "{} transceiver pins for a {}-lane profile",
                transceiver.len(),
                num_lanes
            )));
        }
    }
    if num_lanes > port.lanes.len() {
        issues.push(issue(format!(
            "profile needs {} lanes but the port has {}",
            num_lanes,
            port.lanes.len()
        )));
    }

    if config.validate_pin_wiring {
        for (i, pin) in entry.iphy.iter().enumerate() {
            if !port.has_a_pin(pin.pin) {
                issues.push(issue(format!("iphy pin {} is not wired to the port", i)));
            }
        }
        for (i, pin) in entry.transceiver.iter().flatten().enumerate() {
            if !port.has_z_pin(*pin) {
                issues.push(issue(format!("transceiver pin {} is not wired to the port", i)));
            }
        }
    }

    let sharing = topology.ports_sharing_any(entry.iphy_pins());
    for subsumed in &entry.subsumed {
        if topology.port(*subsumed).is_err() {
            issues.push(issue(format!("subsumed port {} does not exist", subsumed)));
        } else if !sharing.contains(subsumed) {
            issues.push(issue(format!(
                "subsumed port {} shares no lane with the profile's pins",
                subsumed
            )));
        }
    }
}

fn check_entry_overrides(
    overrides: &OverrideLayer,
    config: &LoaderConfig,
    port: PortId,
    profile: ProfileId,
    entry: &PortProfileEntry,
    issues: &mut Vec<ConfigIssue>,
) {
    let rules = overrides.candidates_for_entry(port, profile);
    let pin_count = entry.iphy.len();

    for rule in &rules {
        // One entry applies to every lane; otherwise there is one per pin.
        let size = rule.iphy.len();
        if size > 1 && size != pin_count {
            issues.push(ConfigIssue::entry(
                port,
                profile,
                format!(
                    "override rule {} has {} iphy pins, entry has {}",
                    rule.index, size, pin_count
                ),
            ));
        }
        if let Some(lane) = rule.max_all_lane() {
            if lane as usize >= pin_count {
                issues.push(ConfigIssue::entry(
                    port,
                    profile,
                    format!(
                        "override rule {} addresses lane {} of {} iphy pins",
                        rule.index, lane, pin_count
                    ),
                ));
            }
        }
        if let Some(replacement) = &rule.profile {
            if replacement.iphy.num_lanes as usize != pin_count {
                issues.push(ConfigIssue::entry(
                    port,
                    profile,
                    format!(
                        "override rule {} profile has {} lanes, entry has {}",
                        rule.index, replacement.iphy.num_lanes, pin_count
                    ),
                ));
            }
        }
    }

    if config.overlapping_overrides == OverlapPolicy::Allow {
        return;
    }
    for (i, first) in rules.iter().enumerate() {
        for second in &rules[i + 1..] {
            let Some(key) = overlapping_key(first, second, entry) else {
                continue;
            };
            if config.overlapping_overrides.is_reject() {
                issues.push(ConfigIssue::entry(
                    port,
                    profile,
                    format!(
                        "override rules {} and {} both write {}",
                        first.index, second.index, key
                    ),
                ));
            } else {
                warn!(
                    port = %port,
                    profile = %profile,
                    first = first.index,
                    second = second.index,
                    key = %key,
                    "Overlapping override rules, later rule wins"
                );
            }
        }
    }
}

/// Returns the first override key both rules write for the entry, if their
/// transceiver conditions are identical.
fn overlapping_key(
    first: &OverrideRule,
    second: &OverrideRule,
    entry: &PortProfileEntry,
) -> Option<String> {
    if !first.factor.same_transceiver_conditions(&second.factor) {
        return None;
    }
    if first.profile.is_some() && second.profile.is_some() {
        return Some("the profile".to_string());
    }
    entry.iphy.iter().enumerate().find_map(|(position, pin)| {
        let a = first.candidate(position, pin.pin)?;
        let b = second.candidate(position, pin.pin)?;
        (a.is_chip_specific() == b.is_chip_specific())
            .then(|| format!("iphy position {}", position))
    })
}
