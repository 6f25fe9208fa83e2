//! Pin coordinates and transmitter equalization settings.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named (chip, lane) coordinate.
///
/// This is the form pins take in mapping documents and in resolved
/// programming plans. Inside a loaded snapshot chips are interned, so this
/// type only appears at the edges.
///
/// # Examples
///
/// ```
/// use pmap_types::PinId;
///
/// let pin: PinId = "BC0:3".parse().unwrap();
/// assert_eq!(pin.chip, "BC0");
/// assert_eq!(pin.lane, 3);
/// assert_eq!(pin.to_string(), "BC0:3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinId {
    /// Chip name (e.g., "BC0", "eth1/1").
    pub chip: String,
    /// Lane on the chip.
    pub lane: u32,
}

impl PinId {
    /// Creates a new pin id.
    pub fn new(chip: impl Into<String>, lane: u32) -> Self {
        Self {
            chip: chip.into(),
            lane,
        }
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chip, self.lane)
    }
}

impl FromStr for PinId {
    type Err = ParseError;

    // Chip names may themselves contain '/', so split on the last ':'.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chip, lane) = s
            .rsplit_once(':')
            .ok_or_else(|| ParseError::InvalidPinId(s.to_string()))?;
        if chip.is_empty() {
            return Err(ParseError::InvalidPinId(s.to_string()));
        }
        let lane = lane
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidPinId(s.to_string()))?;
        Ok(PinId::new(chip, lane))
    }
}

/// Transmitter equalization taps for one lane.
///
/// Values are unit-less tap weight codes as programmed into the SerDes.
/// Taps missing from a mapping document default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TxSettings {
    pub pre: i32,
    pub pre2: i32,
    pub main: i32,
    pub post: i32,
    pub post2: i32,
    pub post3: i32,
}

impl TxSettings {
    /// Creates TX settings from the three most common taps.
    pub const fn new(pre: i32, main: i32, post: i32) -> Self {
        Self {
            pre,
            pre2: 0,
            main,
            post,
            post2: 0,
            post3: 0,
        }
    }

    /// Returns the taps in `[pre2, pre, main, post, post2, post3]` order.
    pub const fn taps(&self) -> [i32; 6] {
        [self.pre2, self.pre, self.main, self.post, self.post2, self.post3]
    }
}

impl fmt::Display for TxSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pre={} pre2={} main={} post={} post2={} post3={}",
            self.pre, self.pre2, self.main, self.post, self.post2, self.post3
        )
    }
}
