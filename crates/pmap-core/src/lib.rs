//! Platform mapping resolution engine.
//!
//! Loads a platform's static port/lane mapping into an immutable snapshot
//! and resolves (port, profile) pairs into concrete programming plans:
//!
//! - [`RawPlatformMapping`]: the JSON mapping document, loader and merge
//! - [`ChipRegistry`]: interned chip names
//! - [`PinTopology`]: port lane wiring and the shared-lane index
//! - [`ProfileCatalog`]: speed profiles and per-port profile entries
//! - [`OverrideLayer`]: TX and profile overrides keyed by port, profile and
//!   transceiver
//! - [`MappingSnapshot`]: a validated mapping, optionally with quarantined
//!   entries
//! - [`PortProfileResolver`]: builds [`PortProgrammingPlan`]s
//! - [`MappingStore`]: the active snapshot with atomic reload
//! - [`PlanSink`]: the seam toward hardware drivers

pub mod chips;
pub mod config;
pub mod driver;
pub mod error;
pub mod overrides;
pub mod profiles;
pub mod raw;
pub mod resolver;
pub mod snapshot;
pub mod store;
pub mod topology;
mod validate;

pub use chips::{Chip, ChipHandle, ChipRegistry, Pin};
pub use config::{LoaderConfig, OverlapPolicy, ValidationMode};
pub use driver::{program_ports, PlanSink, ProgramError};
pub use error::{ConfigIssue, MappingError, Result};
pub use overrides::{
    OverrideFactor, OverrideLayer, OverridePin, OverrideRule, OverrideTarget, TransceiverFactor,
};
pub use profiles::{IphyPin, PortProfileEntry, Profile, ProfileCatalog};
pub use raw::RawPlatformMapping;
pub use resolver::{
    PortProfileResolver, PortProgrammingPlan, ResolveRequest, ResolvedIphyPin, TxSource,
};
pub use snapshot::MappingSnapshot;
pub use store::MappingStore;
pub use topology::{LogicalPort, PinConnection, PinTopology};
