//! Data plane chip classification.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of data plane chip.
///
/// Encoded as an integer in platform mapping documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ChipKind {
    /// SerDes core of the switch ASIC (the "iphy" side).
    Core,
    /// External PHY or gearbox.
    Phy,
    /// Front panel transceiver cage.
    Transceiver,
    /// Backplane connector.
    Backplane,
}

impl ChipKind {
    /// Returns the wire encoding of this kind.
    pub const fn as_u8(&self) -> u8 {
        match self {
            ChipKind::Core => 1,
            ChipKind::Phy => 2,
            ChipKind::Transceiver => 3,
            ChipKind::Backplane => 4,
        }
    }

    /// Returns true if pins on this chip may carry TX equalization.
    pub const fn is_serdes(&self) -> bool {
        matches!(self, ChipKind::Core | ChipKind::Phy)
    }
}

impl TryFrom<u8> for ChipKind {
    type Error = ParseError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(ChipKind::Core),
            2 => Ok(ChipKind::Phy),
            3 => Ok(ChipKind::Transceiver),
            4 => Ok(ChipKind::Backplane),
            _ => Err(ParseError::InvalidChipKind(x.to_string())),
        }
    }
}

impl From<ChipKind> for u8 {
    fn from(kind: ChipKind) -> u8 {
        kind.as_u8()
    }
}

impl fmt::Display for ChipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChipKind::Core => "core",
            ChipKind::Phy => "phy",
            ChipKind::Transceiver => "transceiver",
            ChipKind::Backplane => "backplane",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ChipKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "core" | "iphy" => Ok(ChipKind::Core),
            "phy" | "xphy" => Ok(ChipKind::Phy),
            "transceiver" => Ok(ChipKind::Transceiver),
            "backplane" => Ok(ChipKind::Backplane),
            _ => Err(ParseError::InvalidChipKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chip_kind_wire_encoding() {
        assert_eq!(ChipKind::try_from(1).unwrap(), ChipKind::Core);
        assert_eq!(ChipKind::try_from(3).unwrap(), ChipKind::Transceiver);
        assert!(ChipKind::try_from(0).is_err());
        assert!(ChipKind::try_from(9).is_err());
        assert_eq!(u8::from(ChipKind::Phy), 2);
    }

    #[test]
    fn test_chip_kind_serde() {
        let kind: ChipKind = serde_json::from_str("3").unwrap();
        assert_eq!(kind, ChipKind::Transceiver);
        assert_eq!(serde_json::to_string(&ChipKind::Core).unwrap(), "1");
        assert!(serde_json::from_str::<ChipKind>("7").is_err());
    }

    #[test]
    fn test_chip_kind_parse() {
        assert_eq!("iphy".parse::<ChipKind>().unwrap(), ChipKind::Core);
        assert_eq!("TRANSCEIVER".parse::<ChipKind>().unwrap(), ChipKind::Transceiver);
        assert!(ChipKind::Core.is_serdes());
        assert!(!ChipKind::Transceiver.is_serdes());
    }
}
