//! Logical port identity and classification.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical port identifier.
///
/// Serialized transparently, so it can key JSON objects (`"1": {...}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub u32);

impl PortId {
    /// Returns the id as a u32.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for PortId {
    fn from(x: u32) -> Self {
        PortId(x)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PortId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(PortId)
            .map_err(|_| ParseError::InvalidId(s.to_string()))
    }
}

/// Type of logical port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum PortType {
    /// Front panel data port (default).
    #[default]
    Interface,
    /// Switch fabric port.
    Fabric,
    /// Recycle port (internal).
    Recycle,
    /// Management port.
    Management,
    /// Eventor port (internal).
    Eventor,
    /// Hyper port aggregating member lanes.
    Hyper,
    /// Member of a hyper port.
    HyperMember,
}

impl PortType {
    /// Returns the wire encoding of this port type.
    pub const fn as_i32(&self) -> i32 {
        match self {
            PortType::Interface => 0,
            PortType::Fabric => 1,
            PortType::Recycle => 2,
            PortType::Management => 3,
            PortType::Eventor => 4,
            PortType::Hyper => 5,
            PortType::HyperMember => 6,
        }
    }

    /// Returns true if this port normally connects to a transceiver.
    pub const fn is_front_panel(&self) -> bool {
        matches!(self, PortType::Interface | PortType::Management)
    }

    /// Returns true if this is an internal port type.
    pub const fn is_internal(&self) -> bool {
        matches!(self, PortType::Recycle | PortType::Eventor)
    }
}

impl TryFrom<i32> for PortType {
    type Error = ParseError;

    fn try_from(x: i32) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(PortType::Interface),
            1 => Ok(PortType::Fabric),
            2 => Ok(PortType::Recycle),
            3 => Ok(PortType::Management),
            4 => Ok(PortType::Eventor),
            5 => Ok(PortType::Hyper),
            6 => Ok(PortType::HyperMember),
            _ => Err(ParseError::InvalidPortType(x.to_string())),
        }
    }
}

impl From<PortType> for i32 {
    fn from(t: PortType) -> i32 {
        t.as_i32()
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortType::Interface => "interface",
            PortType::Fabric => "fabric",
            PortType::Recycle => "recycle",
            PortType::Management => "management",
            PortType::Eventor => "eventor",
            PortType::Hyper => "hyper",
            PortType::HyperMember => "hyper_member",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PortType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interface" | "interface_port" => Ok(PortType::Interface),
            "fabric" | "fabric_port" => Ok(PortType::Fabric),
            "recycle" | "recycle_port" => Ok(PortType::Recycle),
            "management" | "management_port" | "mgmt" => Ok(PortType::Management),
            "eventor" | "eventor_port" => Ok(PortType::Eventor),
            "hyper" | "hyper_port" => Ok(PortType::Hyper),
            "hyper_member" | "hyper_port_member" => Ok(PortType::HyperMember),
            _ => Err(ParseError::InvalidPortType(s.to_string())),
        }
    }
}

/// Scope in which a port id is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum PortScope {
    /// Local to one switch ASIC (default).
    #[default]
    Local,
    /// Global across a distributed system.
    Global,
}

impl TryFrom<i32> for PortScope {
    type Error = ParseError;

    fn try_from(x: i32) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(PortScope::Local),
            1 => Ok(PortScope::Global),
            _ => Err(ParseError::InvalidPortScope(x.to_string())),
        }
    }
}

impl From<PortScope> for i32 {
    fn from(s: PortScope) -> i32 {
        match s {
            PortScope::Local => 0,
            PortScope::Global => 1,
        }
    }
}

impl fmt::Display for PortScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortScope::Local => write!(f, "local"),
            PortScope::Global => write!(f, "global"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_port_id_parse() {
        assert_eq!("17".parse::<PortId>().unwrap(), PortId(17));
        assert_eq!(" 3 ".parse::<PortId>().unwrap(), PortId(3));
        assert!("eth1/1/1".parse::<PortId>().is_err());
    }

    #[test]
    fn test_port_id_as_map_key() {
        let map: std::collections::BTreeMap<PortId, u8> =
            serde_json::from_str(r#"{"1": 7, "20": 9}"#).unwrap();
        assert_eq!(map.get(&PortId(20)), Some(&9));
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"1":7,"20":9}"#);
    }

    #[test]
    fn test_port_type_classification() {
        assert!(PortType::Interface.is_front_panel());
        assert!(PortType::Management.is_front_panel());
        assert!(!PortType::Fabric.is_front_panel());
        assert!(PortType::Recycle.is_internal());
        assert!(!PortType::Interface.is_internal());
    }

    #[test]
    fn test_port_type_wire_encoding() {
        assert_eq!(PortType::try_from(1).unwrap(), PortType::Fabric);
        assert!(PortType::try_from(42).is_err());
        assert_eq!(serde_json::to_string(&PortType::Recycle).unwrap(), "2");
        assert_eq!("FABRIC_PORT".parse::<PortType>().unwrap(), PortType::Fabric);
    }

    #[test]
    fn test_display() {
        assert_eq!(PortId(5).to_string(), "5");
        assert_eq!(PortType::HyperMember.to_string(), "hyper_member");
        assert_eq!(PortScope::Global.to_string(), "global");
    }
}
