//! Common platform mapping types.
//!
//! This crate provides type-safe representations of the primitives found in
//! a switch platform mapping:
//!
//! - [`PortId`], [`PortType`], [`PortScope`]: logical port identity
//! - [`ProfileId`], [`PortSpeed`], [`Modulation`], [`FecMode`], [`Medium`]:
//!   speed profile characteristics
//! - [`ChipKind`]: classification of data plane chips
//! - [`PinId`]: a named (chip, lane) coordinate
//! - [`TxSettings`]: per-lane transmitter equalization taps

mod chip;
mod pin;
mod port;
mod profile;

pub use chip::ChipKind;
pub use pin::{PinId, TxSettings};
pub use port::{PortId, PortScope, PortType};
pub use profile::{
    FecMode, InterfaceMode, InterfaceType, Medium, Modulation, PortSpeed, ProfileId,
};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid chip type: {0}")]
    InvalidChipKind(String),

    #[error("invalid port type: {0}")]
    InvalidPortType(String),

    #[error("invalid port scope: {0}")]
    InvalidPortScope(String),

    #[error("invalid pin id: {0} (expected <chip>:<lane>)")]
    InvalidPinId(String),

    #[error("invalid numeric id: {0}")]
    InvalidId(String),
}
