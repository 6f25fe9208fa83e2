//! Port config override layer.
//!
//! An override rule carries a factor describing which (port, profile,
//! transceiver) combinations it applies to, a list of TX replacements for
//! iphy pins, and optionally a replacement profile. Rules keep their
//! registration order; precedence between them is decided by the resolver.

use std::collections::BTreeSet;

use pmap_types::{PortId, ProfileId, TxSettings};
use serde::{Deserialize, Serialize};

use crate::chips::{ChipHandle, ChipRegistry, Pin};
use crate::error::Result;
use crate::raw::{RawOverrideFactor, RawPortConfigOverride, RawProfileConfig, ALL_CHIPS};

/// Description of the transceiver currently plugged into a port.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransceiverFactor {
    /// Cable lengths in meters reported by the module.
    #[serde(default)]
    pub cable_lengths: Vec<f64>,
    #[serde(default)]
    pub media_interface_code: Option<i32>,
    #[serde(default)]
    pub management_interface: Option<i32>,
}

impl TransceiverFactor {
    pub fn with_cable_length(mut self, meters: f64) -> Self {
        self.cable_lengths.push(meters);
        self
    }

    pub fn with_media_interface_code(mut self, code: i32) -> Self {
        self.media_interface_code = Some(code);
        self
    }

    pub fn with_management_interface(mut self, code: i32) -> Self {
        self.management_interface = Some(code);
        self
    }
}

/// Conditions under which an override rule applies.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverrideFactor {
    pub ports: Option<BTreeSet<PortId>>,
    pub profiles: Option<BTreeSet<ProfileId>>,
    pub cable_lengths: Option<Vec<f64>>,
    pub media_interface_code: Option<i32>,
    pub transceiver_management_interface: Option<i32>,
}

impl OverrideFactor {
    fn from_raw(raw: &RawOverrideFactor) -> Self {
        Self {
            ports: raw.ports.as_ref().map(|p| p.iter().copied().collect()),
            profiles: raw.profiles.as_ref().map(|p| p.iter().copied().collect()),
            cable_lengths: raw.cable_lengths.clone(),
            media_interface_code: raw.media_interface_code,
            transceiver_management_interface: raw.transceiver_management_interface,
        }
    }

    /// Matches the port and profile sets only.
    pub fn matches_entry(&self, port: PortId, profile: ProfileId) -> bool {
        self.ports.as_ref().map_or(true, |p| p.contains(&port))
            && self.profiles.as_ref().map_or(true, |p| p.contains(&profile))
    }

    /// Matches the transceiver sub-factors against a runtime context.
    pub fn matches_transceiver(&self, transceiver: Option<&TransceiverFactor>) -> bool {
        if let Some(lengths) = &self.cable_lengths {
            let Some(ctx) = transceiver else {
                return false;
            };
            if ctx.cable_lengths.is_empty()
                || !ctx.cable_lengths.iter().all(|len| lengths.contains(len))
            {
                return false;
            }
        }
        if let Some(code) = self.media_interface_code {
            if transceiver.and_then(|t| t.media_interface_code) != Some(code) {
                return false;
            }
        }
        if let Some(code) = self.transceiver_management_interface {
            if transceiver.and_then(|t| t.management_interface) != Some(code) {
                return false;
            }
        }
        true
    }

    pub fn matches(
        &self,
        port: PortId,
        profile: ProfileId,
        transceiver: Option<&TransceiverFactor>,
    ) -> bool {
        self.matches_entry(port, profile) && self.matches_transceiver(transceiver)
    }

    /// Returns true if both factors place the same transceiver conditions.
    pub fn same_transceiver_conditions(&self, other: &OverrideFactor) -> bool {
        self.cable_lengths == other.cable_lengths
            && self.media_interface_code == other.media_interface_code
            && self.transceiver_management_interface == other.transceiver_management_interface
    }
}

/// Which pins an override pin entry addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideTarget {
    /// The lane is a position within the port's iphy pin list.
    All,
    /// The lane is a physical lane of this chip.
    Chip(ChipHandle),
}

/// One TX replacement entry of an override rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverridePin {
    pub target: OverrideTarget,
    pub lane: u32,
    pub tx: Option<TxSettings>,
}

impl OverridePin {
    pub const fn is_chip_specific(&self) -> bool {
        matches!(self.target, OverrideTarget::Chip(_))
    }
}

/// A registered override rule.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRule {
    /// Registration order, starting at zero.
    pub index: usize,
    pub factor: OverrideFactor,
    pub iphy: Vec<OverridePin>,
    pub profile: Option<RawProfileConfig>,
}

impl OverrideRule {
    /// A rule whose pin list is a single `ALL` entry applies it to every lane.
    pub fn is_broadcast(&self) -> bool {
        matches!(
            self.iphy.as_slice(),
            [OverridePin {
                target: OverrideTarget::All,
                ..
            }]
        )
    }

    /// Returns this rule's most specific entry for the pin at `position`.
    pub fn candidate(&self, position: usize, pin: Pin) -> Option<&OverridePin> {
        let chip_entry = self.iphy.iter().find(|p| {
            p.target == OverrideTarget::Chip(pin.chip) && p.lane == pin.lane
        });
        if chip_entry.is_some() {
            return chip_entry;
        }
        if self.is_broadcast() {
            return self.iphy.first();
        }
        self.iphy
            .iter()
            .find(|p| p.target == OverrideTarget::All && p.lane as usize == position)
    }

    /// Largest positional lane addressed by a non-broadcast `ALL` entry.
    pub fn max_all_lane(&self) -> Option<u32> {
        if self.is_broadcast() {
            return None;
        }
        self.iphy
            .iter()
            .filter(|p| p.target == OverrideTarget::All)
            .map(|p| p.lane)
            .max()
    }
}

/// Registered override rules in registration order.
#[derive(Debug, Default)]
pub struct OverrideLayer {
    rules: Vec<OverrideRule>,
}

impl OverrideLayer {
    /// Builds the layer. Chip names other than `ALL` must be registered.
    pub fn build(raw: &[RawPortConfigOverride], chips: &ChipRegistry) -> Result<Self> {
        let mut rules = Vec::with_capacity(raw.len());
        for (index, rule) in raw.iter().enumerate() {
            let mut iphy = Vec::new();
            for pin in rule.pins.iter().flat_map(|p| p.iphy.iter()) {
                let target = if pin.id.chip == ALL_CHIPS {
                    OverrideTarget::All
                } else {
                    OverrideTarget::Chip(chips.handle(&pin.id.chip)?)
                };
                iphy.push(OverridePin {
                    target,
                    lane: pin.id.lane,
                    tx: pin.tx,
                });
            }
            rules.push(OverrideRule {
                index,
                factor: OverrideFactor::from_raw(&rule.factor),
                iphy,
                profile: rule.port_profile_config.clone(),
            });
        }
        Ok(Self { rules })
    }

    /// Rules matching the entry with no transceiver context.
    pub fn find_overrides(&self, port: PortId, profile: ProfileId) -> Vec<&OverrideRule> {
        self.find_overrides_with(port, profile, None)
    }

    /// Rules matching the entry and transceiver context, in registration order.
    pub fn find_overrides_with(
        &self,
        port: PortId,
        profile: ProfileId,
        transceiver: Option<&TransceiverFactor>,
    ) -> Vec<&OverrideRule> {
        self.rules
            .iter()
            .filter(|r| r.factor.matches(port, profile, transceiver))
            .collect()
    }

    /// Rules that could apply to the entry under some transceiver context.
    pub fn candidates_for_entry(&self, port: PortId, profile: ProfileId) -> Vec<&OverrideRule> {
        self.rules
            .iter()
            .filter(|r| r.factor.matches_entry(port, profile))
            .collect()
    }

    /// Rules naming the port or not restricted by port.
    pub fn overrides_for_port(&self, port: PortId) -> Vec<&OverrideRule> {
        self.rules
            .iter()
            .filter(|r| r.factor.ports.as_ref().map_or(true, |p| p.contains(&port)))
            .collect()
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawPlatformMapping;
    use pretty_assertions::assert_eq;

    fn layer() -> (ChipRegistry, OverrideLayer) {
        let raw = RawPlatformMapping::from_json_str(&pmap_test::sample_mapping_json()).unwrap();
        let mut issues = Vec::new();
        let chips = ChipRegistry::build(&raw.chips, &mut issues);
        let layer = OverrideLayer::build(&raw.port_config_overrides, &chips).unwrap();
        (chips, layer)
    }

    fn factor(json: &str) -> OverrideFactor {
        OverrideFactor::from_raw(&serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_absent_sets_match_everything() {
        let f = factor("{}");
        assert!(f.matches(PortId(9), ProfileId(99), None));
    }

    #[test]
    fn test_empty_sets_match_nothing() {
        let f = factor(r#"{"ports": []}"#);
        assert!(!f.matches(PortId(1), ProfileId(11), None));
        let f = factor(r#"{"profiles": []}"#);
        assert!(!f.matches(PortId(1), ProfileId(11), None));
    }

    #[test]
    fn test_cable_lengths_require_context() {
        let f = factor(r#"{"ports": [1], "cableLengths": [1.0, 1.5]}"#);
        assert!(!f.matches(PortId(1), ProfileId(11), None));
        assert!(!f.matches(PortId(1), ProfileId(11), Some(&TransceiverFactor::default())));

        let ctx = TransceiverFactor::default().with_cable_length(1.5);
        assert!(f.matches(PortId(1), ProfileId(11), Some(&ctx)));

        let ctx = ctx.with_cable_length(3.0);
        assert!(!f.matches(PortId(1), ProfileId(11), Some(&ctx)));
    }

    #[test]
    fn test_interface_codes_require_equality() {
        let f = factor(r#"{"mediaInterfaceCode": 4, "transceiverManagementInterface": 2}"#);
        let ctx = TransceiverFactor::default()
            .with_media_interface_code(4)
            .with_management_interface(2);
        assert!(f.matches(PortId(1), ProfileId(11), Some(&ctx)));

        let ctx = TransceiverFactor::default().with_media_interface_code(4);
        assert!(!f.matches(PortId(1), ProfileId(11), Some(&ctx)));
    }

    #[test]
    fn test_find_overrides_on_sample() {
        let (_, layer) = layer();
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.find_overrides(PortId(1), ProfileId(12)).len(), 1);
        assert!(layer.find_overrides(PortId(1), ProfileId(22)).is_empty());
        assert!(layer.find_overrides(PortId(2), ProfileId(12)).is_empty());
        assert_eq!(layer.overrides_for_port(PortId(5)).len(), 1);
        assert!(layer.overrides_for_port(PortId(20)).is_empty());
    }

    #[test]
    fn test_cable_rule_needs_context() {
        let json = pmap_test::sample_mapping()
            .override_rule(pmap_test::sample_cable_override())
            .to_json_string();
        let raw = RawPlatformMapping::from_json_str(&json).unwrap();
        let mut issues = Vec::new();
        let chips = ChipRegistry::build(&raw.chips, &mut issues);
        let layer = OverrideLayer::build(&raw.port_config_overrides, &chips).unwrap();

        let found = layer.find_overrides(PortId(1), ProfileId(12));
        assert_eq!(found.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0]);

        let ctx = TransceiverFactor::default().with_cable_length(1.0);
        let found = layer.find_overrides_with(PortId(1), ProfileId(12), Some(&ctx));
        assert_eq!(found.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_candidate_precedence_within_rule() {
        let mut issues = Vec::new();
        let chips = ChipRegistry::build(
            &[crate::raw::RawChip {
                name: "BC0".to_string(),
                kind: pmap_types::ChipKind::Core,
                physical_id: 0,
            }],
            &mut issues,
        );
        let bc0 = chips.handle("BC0").unwrap();
        let rule = OverrideRule {
            index: 0,
            factor: OverrideFactor::default(),
            iphy: vec![
                OverridePin {
                    target: OverrideTarget::All,
                    lane: 0,
                    tx: Some(TxSettings::new(1, 1, 1)),
                },
                OverridePin {
                    target: OverrideTarget::Chip(bc0),
                    lane: 4,
                    tx: Some(TxSettings::new(2, 2, 2)),
                },
            ],
            profile: None,
        };
        assert!(!rule.is_broadcast());
        assert_eq!(rule.max_all_lane(), Some(0));

        let chip_hit = rule.candidate(0, Pin::new(bc0, 4)).unwrap();
        assert!(chip_hit.is_chip_specific());
        let all_hit = rule.candidate(0, Pin::new(bc0, 5)).unwrap();
        assert_eq!(all_hit.target, OverrideTarget::All);
        assert!(rule.candidate(1, Pin::new(bc0, 5)).is_none());
    }

    #[test]
    fn test_broadcast_rule() {
        let (chips, layer) = layer();
        let rule = &layer.rules()[0];
        assert!(rule.is_broadcast());
        assert_eq!(rule.max_all_lane(), None);
        let bc0 = chips.handle("BC0").unwrap();
        for position in 0..8 {
            assert!(rule.candidate(position, Pin::new(bc0, position as u32)).is_some());
        }
    }
}
