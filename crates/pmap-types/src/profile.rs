//! Speed profile characteristics.
//!
//! Enumerations here are integer-coded in mapping documents. Codes this
//! crate does not know about are preserved as `Other(code)` rather than
//! rejected, so mappings produced for newer platforms still load.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Port profile identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub u32);

impl ProfileId {
    /// Returns the id as a u32.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ProfileId {
    fn from(x: u32) -> Self {
        ProfileId(x)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProfileId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(ProfileId)
            .map_err(|_| ParseError::InvalidId(s.to_string()))
    }
}

/// Port speed in Mbps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PortSpeed(pub u32);

impl PortSpeed {
    /// Returns the speed in Mbps.
    pub const fn mbps(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PortSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 != 0 && self.0 % 1000 == 0 {
            write!(f, "{}G", self.0 / 1000)
        } else {
            write!(f, "{}M", self.0)
        }
    }
}

/// Line modulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Modulation {
    Nrz,
    Pam4,
    Other(i32),
}

impl From<i32> for Modulation {
    fn from(x: i32) -> Self {
        match x {
            1 => Modulation::Nrz,
            2 => Modulation::Pam4,
            other => Modulation::Other(other),
        }
    }
}

impl From<Modulation> for i32 {
    fn from(m: Modulation) -> i32 {
        match m {
            Modulation::Nrz => 1,
            Modulation::Pam4 => 2,
            Modulation::Other(x) => x,
        }
    }
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modulation::Nrz => write!(f, "NRZ"),
            Modulation::Pam4 => write!(f, "PAM4"),
            Modulation::Other(x) => write!(f, "MODULATION_{}", x),
        }
    }
}

/// Forward error correction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum FecMode {
    None,
    Cl74,
    Cl91,
    Rs528,
    Rs544,
    Rs544x2n,
    Other(i32),
}

impl From<i32> for FecMode {
    fn from(x: i32) -> Self {
        match x {
            1 => FecMode::None,
            11 => FecMode::Rs544x2n,
            74 => FecMode::Cl74,
            91 => FecMode::Cl91,
            528 => FecMode::Rs528,
            544 => FecMode::Rs544,
            other => FecMode::Other(other),
        }
    }
}

impl From<FecMode> for i32 {
    fn from(m: FecMode) -> i32 {
        match m {
            FecMode::None => 1,
            FecMode::Rs544x2n => 11,
            FecMode::Cl74 => 74,
            FecMode::Cl91 => 91,
            FecMode::Rs528 => 528,
            FecMode::Rs544 => 544,
            FecMode::Other(x) => x,
        }
    }
}

impl fmt::Display for FecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FecMode::None => write!(f, "NONE"),
            FecMode::Cl74 => write!(f, "CL74"),
            FecMode::Cl91 => write!(f, "CL91"),
            FecMode::Rs528 => write!(f, "RS528"),
            FecMode::Rs544 => write!(f, "RS544"),
            FecMode::Rs544x2n => write!(f, "RS544_2N"),
            FecMode::Other(x) => write!(f, "FEC_{}", x),
        }
    }
}

/// Transmission medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Medium {
    Unknown,
    Copper,
    Optical,
    Backplane,
    Other(i32),
}

impl From<i32> for Medium {
    fn from(x: i32) -> Self {
        match x {
            0 => Medium::Unknown,
            1 => Medium::Copper,
            2 => Medium::Optical,
            3 => Medium::Backplane,
            other => Medium::Other(other),
        }
    }
}

impl From<Medium> for i32 {
    fn from(m: Medium) -> i32 {
        match m {
            Medium::Unknown => 0,
            Medium::Copper => 1,
            Medium::Optical => 2,
            Medium::Backplane => 3,
            Medium::Other(x) => x,
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Medium::Unknown => write!(f, "UNKNOWN"),
            Medium::Copper => write!(f, "COPPER"),
            Medium::Optical => write!(f, "OPTICAL"),
            Medium::Backplane => write!(f, "BACKPLANE"),
            Medium::Other(x) => write!(f, "MEDIUM_{}", x),
        }
    }
}

/// SDK interface mode code. Opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceMode(pub i32);

/// SDK interface type code. Opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceType(pub i32);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_speed_display() {
        assert_eq!(PortSpeed(400_000).to_string(), "400G");
        assert_eq!(PortSpeed(10_000).to_string(), "10G");
        assert_eq!(PortSpeed(2_500).to_string(), "2500M");
    }

    #[test]
    fn test_fec_codes() {
        assert_eq!(FecMode::from(528), FecMode::Rs528);
        assert_eq!(FecMode::from(11), FecMode::Rs544x2n);
        assert_eq!(FecMode::from(999), FecMode::Other(999));
        assert_eq!(i32::from(FecMode::Other(999)), 999);
    }

    #[test]
    fn test_medium_serde() {
        let m: Medium = serde_json::from_str("2").unwrap();
        assert_eq!(m, Medium::Optical);
        assert_eq!(serde_json::to_string(&Medium::Copper).unwrap(), "1");
    }

    #[test]
    fn test_unknown_modulation_is_preserved() {
        let m: Modulation = serde_json::from_str("5").unwrap();
        assert_eq!(m, Modulation::Other(5));
        assert_eq!(serde_json::to_string(&m).unwrap(), "5");
        assert_eq!(m.to_string(), "MODULATION_5");
    }

    #[test]
    fn test_profile_id_parse() {
        assert_eq!("26".parse::<ProfileId>().unwrap(), ProfileId(26));
        assert!("PROFILE_400G".parse::<ProfileId>().is_err());
    }
}
