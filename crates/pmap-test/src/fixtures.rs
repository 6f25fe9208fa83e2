//! Mapping document builders and canonical sample mappings
//!
//! Builders emit the same JSON shape a platform ships, so tests exercise the
//! real loader instead of constructing engine types by hand.

use serde_json::{json, Map, Value};

/// TX taps as `(pre, main, post)`; the remaining taps are zero.
pub type Tx = (i32, i32, i32);

/// A lane: a-side `(chip, lane)` plus an optional transceiver end.
pub type Lane<'a> = (&'a str, u32, Option<(&'a str, u32)>);

/// An iphy pin of a supported profile with optional default TX.
pub type IphyPin<'a> = (&'a str, u32, Option<Tx>);

fn tx_value(tx: Tx) -> Value {
    json!({"pre": tx.0, "main": tx.1, "post": tx.2})
}

fn pin_value(chip: &str, lane: u32) -> Value {
    json!({"chip": chip, "lane": lane})
}

fn profile_value(speed: u32, num_lanes: u32, modulation: i32, fec: i32, medium: i32) -> Value {
    json!({
        "speed": speed,
        "iphy": {
            "numLanes": num_lanes,
            "modulation": modulation,
            "fec": fec,
            "medium": medium,
            "interfaceMode": 0,
            "interfaceType": 0
        }
    })
}

/// Builds a platform mapping JSON document
#[derive(Debug, Clone)]
pub struct MappingBuilder {
    ports: Map<String, Value>,
    chips: Vec<Value>,
    overrides: Vec<Value>,
    profiles: Vec<Value>,
}

impl Default for MappingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingBuilder {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self {
            ports: Map::new(),
            chips: Vec::new(),
            overrides: Vec::new(),
            profiles: Vec::new(),
        }
    }

    /// Add a chip (`kind` 1 = core, 2 = phy, 3 = transceiver, 4 = backplane)
    pub fn chip(mut self, name: &str, kind: u8, physical_id: u32) -> Self {
        self.chips
            .push(json!({"name": name, "type": kind, "physicalID": physical_id}));
        self
    }

    /// Add a port and its lane wiring
    pub fn port(mut self, id: u32, name: &str, controlling_port: u32, lanes: &[Lane<'_>]) -> Self {
        let pins: Vec<Value> = lanes
            .iter()
            .map(|(chip, lane, end)| {
                let mut conn = Map::new();
                conn.insert("a".to_string(), pin_value(chip, *lane));
                if let Some((z_chip, z_lane)) = end {
                    conn.insert("z".to_string(), json!({"end": pin_value(z_chip, *z_lane)}));
                }
                Value::Object(conn)
            })
            .collect();
        self.ports.insert(
            id.to_string(),
            json!({
                "mapping": {
                    "id": id,
                    "name": name,
                    "controllingPort": controlling_port,
                    "pins": pins
                },
                "supportedProfiles": {}
            }),
        );
        self
    }

    /// Set the port type code of an existing port
    pub fn port_type(mut self, id: u32, port_type: i32) -> Self {
        if let Some(mapping) = self
            .ports
            .get_mut(&id.to_string())
            .and_then(|p| p.get_mut("mapping"))
        {
            mapping["portType"] = json!(port_type);
        }
        self
    }

    /// Add a platform profile available on every PIM
    pub fn profile(
        mut self,
        id: u32,
        speed: u32,
        num_lanes: u32,
        modulation: i32,
        fec: i32,
        medium: i32,
    ) -> Self {
        self.profiles.push(json!({
            "factor": {"profileID": id},
            "profile": profile_value(speed, num_lanes, modulation, fec, medium)
        }));
        self
    }

    /// Add a platform profile restricted to some PIMs
    #[allow(clippy::too_many_arguments)]
    pub fn profile_for_pims(
        mut self,
        id: u32,
        pims: &[u32],
        speed: u32,
        num_lanes: u32,
        modulation: i32,
        fec: i32,
        medium: i32,
    ) -> Self {
        self.profiles.push(json!({
            "factor": {"profileID": id, "pimIDs": pims},
            "profile": profile_value(speed, num_lanes, modulation, fec, medium)
        }));
        self
    }

    /// Add a supported profile to an existing port.
    ///
    /// An empty `transceiver` list leaves the transceiver pins out; an empty
    /// `subsumed` list leaves `subsumedPorts` out.
    pub fn supported_profile(
        mut self,
        port: u32,
        profile: u32,
        iphy: &[IphyPin<'_>],
        transceiver: &[(&str, u32)],
        subsumed: &[u32],
    ) -> Self {
        let iphy: Vec<Value> = iphy
            .iter()
            .map(|(chip, lane, tx)| {
                let mut pin = Map::new();
                pin.insert("id".to_string(), pin_value(chip, *lane));
                if let Some(tx) = tx {
                    pin.insert("tx".to_string(), tx_value(*tx));
                }
                Value::Object(pin)
            })
            .collect();

        let mut pins = Map::new();
        pins.insert("iphy".to_string(), Value::Array(iphy));
        if !transceiver.is_empty() {
            let transceiver: Vec<Value> = transceiver
                .iter()
                .map(|(chip, lane)| json!({"id": pin_value(chip, *lane)}))
                .collect();
            pins.insert("transceiver".to_string(), Value::Array(transceiver));
        }

        let mut config = Map::new();
        config.insert("pins".to_string(), Value::Object(pins));
        if !subsumed.is_empty() {
            config.insert("subsumedPorts".to_string(), json!(subsumed));
        }

        if let Some(supported) = self
            .ports
            .get_mut(&port.to_string())
            .and_then(|p| p.get_mut("supportedProfiles"))
            .and_then(Value::as_object_mut)
        {
            supported.insert(profile.to_string(), Value::Object(config));
        }
        self
    }

    /// Append a port config override rule
    pub fn override_rule(mut self, rule: OverrideRuleBuilder) -> Self {
        self.overrides.push(rule.build());
        self
    }

    /// Build the JSON document
    pub fn build(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("ports".to_string(), Value::Object(self.ports.clone()));
        doc.insert("chips".to_string(), Value::Array(self.chips.clone()));
        if !self.overrides.is_empty() {
            doc.insert(
                "portConfigOverrides".to_string(),
                Value::Array(self.overrides.clone()),
            );
        }
        doc.insert(
            "platformSupportedProfiles".to_string(),
            Value::Array(self.profiles.clone()),
        );
        Value::Object(doc)
    }

    /// Build the JSON document as a string
    pub fn to_json_string(&self) -> String {
        self.build().to_string()
    }
}

/// Builds one `portConfigOverrides` entry
#[derive(Debug, Clone, Default)]
pub struct OverrideRuleBuilder {
    factor: Map<String, Value>,
    pins: Vec<Value>,
    profile: Option<Value>,
}

impl OverrideRuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ports(mut self, ports: &[u32]) -> Self {
        self.factor.insert("ports".to_string(), json!(ports));
        self
    }

    pub fn profiles(mut self, profiles: &[u32]) -> Self {
        self.factor.insert("profiles".to_string(), json!(profiles));
        self
    }

    pub fn cable_lengths(mut self, lengths: &[f64]) -> Self {
        self.factor.insert("cableLengths".to_string(), json!(lengths));
        self
    }

    pub fn media_interface_code(mut self, code: i32) -> Self {
        self.factor.insert("mediaInterfaceCode".to_string(), json!(code));
        self
    }

    pub fn management_interface(mut self, code: i32) -> Self {
        self.factor
            .insert("transceiverManagementInterface".to_string(), json!(code));
        self
    }

    /// Add an iphy pin override; `chip` may be `"ALL"`
    pub fn pin(mut self, chip: &str, lane: u32, tx: Tx) -> Self {
        self.pins
            .push(json!({"id": pin_value(chip, lane), "tx": tx_value(tx)}));
        self
    }

    /// Add an iphy pin override that clears TX
    pub fn pin_without_tx(mut self, chip: &str, lane: u32) -> Self {
        self.pins.push(json!({"id": pin_value(chip, lane)}));
        self
    }

    /// Replace the profile config
    pub fn profile_config(
        mut self,
        speed: u32,
        num_lanes: u32,
        modulation: i32,
        fec: i32,
        medium: i32,
    ) -> Self {
        self.profile = Some(profile_value(speed, num_lanes, modulation, fec, medium));
        self
    }

    pub fn build(self) -> Value {
        let mut rule = Map::new();
        rule.insert("factor".to_string(), Value::Object(self.factor));
        if !self.pins.is_empty() {
            rule.insert("pins".to_string(), json!({"iphy": self.pins}));
        }
        if let Some(profile) = self.profile {
            rule.insert("portProfileConfig".to_string(), profile);
        }
        Value::Object(rule)
    }
}

/// Sample platform profiles
pub mod profiles {
    pub const PROFILE_10G_1_NRZ_COPPER: u32 = 11;
    pub const PROFILE_10G_1_NRZ_OPTICAL: u32 = 12;
    pub const PROFILE_50G_2_PAM4_OPTICAL: u32 = 19;
    pub const PROFILE_100G_4_NRZ_RS528_OPTICAL: u32 = 22;
    pub const PROFILE_400G_8_PAM4_RS544X2N_OPTICAL: u32 = 26;
}

/// TX taps of the 400G profile on port 1
pub const SAMPLE_400G_TX: Tx = (-16, 148, -4);

/// TX taps of the 100G profile on ports 1 and 5
pub const SAMPLE_100G_TX: Tx = (-8, 132, -4);

/// TX taps set by the sample override
pub const SAMPLE_OVERRIDE_TX: Tx = (-2, 117, -8);

/// TX taps set by [`sample_cable_override`]
pub const SAMPLE_CABLE_TX: Tx = (-4, 110, -6);

fn bc0_lanes(first: u32, count: u32) -> Vec<Lane<'static>> {
    (first..first + count)
        .map(|lane| ("BC0", lane, Some(("eth1/1", lane))))
        .collect()
}

fn iphy(first: u32, count: u32, tx: Option<Tx>) -> Vec<IphyPin<'static>> {
    (first..first + count).map(|lane| ("BC0", lane, tx)).collect()
}

fn transceiver(first: u32, count: u32) -> Vec<(&'static str, u32)> {
    (first..first + count).map(|lane| ("eth1/1", lane)).collect()
}

/// The sample platform: one 8-lane core group on BC0 wired to cage eth1/1.
///
/// | port | name     | controlling | BC0 lanes | profiles          |
/// |------|----------|-------------|-----------|-------------------|
/// | 1    | eth1/1/1 | 1           | 0-7       | 11, 12, 22, 26    |
/// | 3    | eth1/1/3 | 1           | 2-3       | 11, 19            |
/// | 5    | eth1/1/5 | 5           | 4-7       | 22                |
/// | 7    | eth1/1/7 | 5           | 6-7       | 11                |
///
/// One override rule sets TX on ports 1, 3, 5 and 7 for profiles 11 and 12.
pub fn sample_mapping() -> MappingBuilder {
    use profiles::*;

    MappingBuilder::new()
        .chip("BC0", 1, 0)
        .chip("eth1/1", 3, 0)
        .port(1, "eth1/1/1", 1, &bc0_lanes(0, 8))
        .port(3, "eth1/1/3", 1, &bc0_lanes(2, 2))
        .port(5, "eth1/1/5", 5, &bc0_lanes(4, 4))
        .port(7, "eth1/1/7", 5, &bc0_lanes(6, 2))
        .profile(PROFILE_10G_1_NRZ_COPPER, 10_000, 1, 1, 1, 1)
        .profile(PROFILE_10G_1_NRZ_OPTICAL, 10_000, 1, 1, 1, 2)
        .profile(PROFILE_50G_2_PAM4_OPTICAL, 50_000, 2, 2, 544, 2)
        .profile(PROFILE_100G_4_NRZ_RS528_OPTICAL, 100_000, 4, 1, 528, 2)
        .profile(PROFILE_400G_8_PAM4_RS544X2N_OPTICAL, 400_000, 8, 2, 11, 2)
        .supported_profile(1, PROFILE_10G_1_NRZ_COPPER, &iphy(0, 1, None), &transceiver(0, 1), &[])
        .supported_profile(1, PROFILE_10G_1_NRZ_OPTICAL, &iphy(0, 1, None), &transceiver(0, 1), &[])
        .supported_profile(
            1,
            PROFILE_100G_4_NRZ_RS528_OPTICAL,
            &iphy(0, 4, Some(SAMPLE_100G_TX)),
            &transceiver(0, 4),
            &[3],
        )
        .supported_profile(
            1,
            PROFILE_400G_8_PAM4_RS544X2N_OPTICAL,
            &iphy(0, 8, Some(SAMPLE_400G_TX)),
            &transceiver(0, 8),
            &[],
        )
        .supported_profile(3, PROFILE_10G_1_NRZ_COPPER, &iphy(2, 1, None), &transceiver(2, 1), &[])
        .supported_profile(3, PROFILE_50G_2_PAM4_OPTICAL, &iphy(2, 2, None), &transceiver(2, 2), &[])
        .supported_profile(
            5,
            PROFILE_100G_4_NRZ_RS528_OPTICAL,
            &iphy(4, 4, Some(SAMPLE_100G_TX)),
            &transceiver(4, 4),
            &[7],
        )
        .supported_profile(7, PROFILE_10G_1_NRZ_COPPER, &iphy(6, 1, None), &transceiver(6, 1), &[])
        .override_rule(
            OverrideRuleBuilder::new()
                .ports(&[1, 3, 5, 7])
                .profiles(&[PROFILE_10G_1_NRZ_COPPER, PROFILE_10G_1_NRZ_OPTICAL])
                .pin("ALL", 0, SAMPLE_OVERRIDE_TX),
        )
}

/// A rule for the sample ports that only applies to 1.0, 1.5 and 2.0 meter
/// cables. Registered after the sample rule, it wins when it matches.
pub fn sample_cable_override() -> OverrideRuleBuilder {
    use profiles::*;

    OverrideRuleBuilder::new()
        .ports(&[1, 3, 5, 7])
        .profiles(&[PROFILE_10G_1_NRZ_COPPER, PROFILE_10G_1_NRZ_OPTICAL])
        .cable_lengths(&[1.0, 1.5, 2.0])
        .pin("ALL", 0, SAMPLE_CABLE_TX)
}

/// The sample platform as a JSON document.
pub fn sample_mapping_json() -> String {
    sample_mapping().to_json_string()
}

/// Two separate 4-lane groups where port 20's 100G profile claims to
/// subsume port 22, which shares none of its lanes.
pub fn inconsistent_mapping() -> MappingBuilder {
    use profiles::PROFILE_100G_4_NRZ_RS528_OPTICAL as P100G;

    let lanes = |first: u32, cage: &'static str| -> Vec<Lane<'static>> {
        (0..4).map(|i| ("BC0", first + i, Some((cage, i)))).collect()
    };
    let pins = |first: u32| -> Vec<IphyPin<'static>> {
        (0..4).map(|i| ("BC0", first + i, Some(SAMPLE_100G_TX))).collect()
    };
    let cage = |name: &'static str| -> Vec<(&'static str, u32)> {
        (0..4).map(|i| (name, i)).collect()
    };

    MappingBuilder::new()
        .chip("BC0", 1, 0)
        .chip("eth1/5", 3, 4)
        .chip("eth1/6", 3, 5)
        .port(20, "eth1/5/1", 20, &lanes(16, "eth1/5"))
        .port(22, "eth1/6/1", 22, &lanes(20, "eth1/6"))
        .profile(P100G, 100_000, 4, 1, 528, 2)
        .supported_profile(20, P100G, &pins(16), &cage("eth1/5"), &[22])
        .supported_profile(22, P100G, &pins(20), &cage("eth1/6"), &[])
}

/// The inconsistent platform as a JSON document.
pub fn inconsistent_mapping_json() -> String {
    inconsistent_mapping().to_json_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_shape() {
        let doc = sample_mapping().build();
        assert_eq!(doc["ports"].as_object().map(|p| p.len()), Some(4));
        assert_eq!(doc["chips"][1]["type"], json!(3));
        assert_eq!(
            doc["ports"]["1"]["supportedProfiles"]["26"]["pins"]["iphy"][0]["tx"]["main"],
            json!(148)
        );
        assert!(doc["ports"]["1"]["supportedProfiles"]["26"]
            .get("subsumedPorts")
            .is_none());
        assert!(doc["ports"]["1"]["supportedProfiles"]["11"]["pins"]["iphy"][0]
            .get("tx")
            .is_none());
        assert_eq!(
            doc["portConfigOverrides"][0]["pins"]["iphy"][0]["id"]["chip"],
            json!("ALL")
        );
    }

    #[test]
    fn test_lane_without_transceiver_end() {
        let doc = MappingBuilder::new()
            .chip("BC0", 1, 0)
            .port(1, "fab1/1/1", 1, &[("BC0", 0, None)])
            .build();
        assert!(doc["ports"]["1"]["mapping"]["pins"][0].get("z").is_none());
        assert!(doc.get("portConfigOverrides").is_none());
    }

    #[test]
    fn test_supported_profile_on_missing_port_is_ignored() {
        let doc = MappingBuilder::new()
            .supported_profile(9, 11, &[("BC0", 0, None)], &[], &[])
            .build();
        assert_eq!(doc["ports"].as_object().map(|p| p.len()), Some(0));
    }
}
