//! Pin topology graph.
//!
//! Holds every logical port with its ordered lane list and a reverse index
//! from a-side pin to the ports wired through it. The index is derived once
//! per snapshot and never mutated afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use once_cell::sync::Lazy;
use pmap_types::{PortId, PortScope, PortType};
use regex::Regex;

use crate::chips::{ChipHandle, ChipRegistry, Pin};
use crate::error::{ConfigIssue, MappingError, Result};
use crate::raw::RawPortEntry;

/// Port names of the form `eth<pim>/<module>/<lane>`.
static PORT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^eth(\d+)/(\d+)/(\d+)$").expect("valid port name regex"));

/// One lane of a port: the a-side SerDes pin and its transceiver end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConnection {
    pub a: Pin,
    pub z: Option<Pin>,
}

/// A logical port and its physical wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPort {
    pub id: PortId,
    pub name: String,
    pub controlling_port: PortId,
    pub lanes: Vec<PinConnection>,
    pub port_type: PortType,
    pub scope: PortScope,
    pub attached_core_id: Option<i32>,
    pub attached_core_port_index: Option<i32>,
    pub virtual_device_id: Option<i32>,
}

impl LogicalPort {
    /// Returns true if this port controls its own lane group.
    pub fn is_controlling(&self) -> bool {
        self.controlling_port == self.id
    }

    /// Returns true if `pin` is one of this port's a-side pins.
    pub fn has_a_pin(&self, pin: Pin) -> bool {
        self.lanes.iter().any(|c| c.a == pin)
    }

    /// Returns true if `pin` is one of this port's transceiver-side pins.
    pub fn has_z_pin(&self, pin: Pin) -> bool {
        self.lanes.iter().any(|c| c.z == Some(pin))
    }

    /// Returns the PIM slot encoded in the port name, if any.
    pub fn pim_id(&self) -> Option<u32> {
        parse_pim_id(&self.name)
    }
}

/// Parses the PIM slot from an `eth<pim>/<module>/<lane>` port name.
pub fn parse_pim_id(name: &str) -> Option<u32> {
    PORT_NAME_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Ports, their lanes, and the shared-lane index.
#[derive(Debug, Default)]
pub struct PinTopology {
    ports: BTreeMap<PortId, LogicalPort>,
    by_name: HashMap<String, PortId>,
    lane_index: HashMap<Pin, BTreeSet<PortId>>,
}

impl PinTopology {
    /// Builds the topology from raw port entries.
    ///
    /// Pins naming unregistered chips fail the build. Structural problems
    /// scoped to a port are pushed onto `issues`.
    pub fn build(
        raw: &BTreeMap<PortId, RawPortEntry>,
        chips: &ChipRegistry,
        issues: &mut Vec<ConfigIssue>,
    ) -> Result<Self> {
        let mut topology = PinTopology::default();

        for (key, entry) in raw {
            let mapping = &entry.mapping;
            if *key != mapping.id {
                issues.push(ConfigIssue::port(
                    *key,
                    format!("port key {} does not match mapping id {}", key, mapping.id),
                ));
            }

            let mut lanes = Vec::with_capacity(mapping.pins.len());
            for conn in &mapping.pins {
                let a = chips.intern(&conn.a)?;
                let z = match conn.z.as_ref().and_then(|z| z.end.as_ref()) {
                    Some(end) => Some(chips.intern(end)?),
                    None => None,
                };
                lanes.push(PinConnection { a, z });
            }

            if let Some(existing) = topology.by_name.get(&mapping.name) {
                issues.push(ConfigIssue::port(
                    *key,
                    format!("port name '{}' already used by port {}", mapping.name, existing),
                ));
            } else {
                topology.by_name.insert(mapping.name.clone(), *key);
            }

            for conn in &lanes {
                topology.lane_index.entry(conn.a).or_default().insert(*key);
            }

            topology.ports.insert(
                *key,
                LogicalPort {
                    id: *key,
                    name: mapping.name.clone(),
                    controlling_port: mapping.controlling_port,
                    lanes,
                    port_type: mapping.port_type,
                    scope: mapping.scope,
                    attached_core_id: mapping.attached_core_id,
                    attached_core_port_index: mapping.attached_core_port_index,
                    virtual_device_id: mapping.virtual_device_id,
                },
            );
        }

        topology.check_controlling_ports(issues);
        Ok(topology)
    }

    fn check_controlling_ports(&self, issues: &mut Vec<ConfigIssue>) {
        for port in self.ports.values() {
            if port.is_controlling() {
                continue;
            }
            let Some(controller) = self.ports.get(&port.controlling_port) else {
                issues.push(ConfigIssue::port(
                    port.id,
                    format!("controlling port {} does not exist", port.controlling_port),
                ));
                continue;
            };
            if !port.lanes.iter().any(|c| controller.has_a_pin(c.a)) {
                issues.push(ConfigIssue::port(
                    port.id,
                    format!(
                        "controlling port {} shares no lane with the port",
                        port.controlling_port
                    ),
                ));
            }
        }
    }

    pub fn port(&self, port: PortId) -> Result<&LogicalPort> {
        self.ports
            .get(&port)
            .ok_or(MappingError::UnknownPort { port })
    }

    /// Resolves a port name to its id.
    pub fn port_by_name(&self, name: &str) -> Result<PortId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| MappingError::UnknownPortName {
                name: name.to_string(),
            })
    }

    /// Returns the port's lane connections in declaration order.
    pub fn lanes_of(&self, port: PortId) -> Result<&[PinConnection]> {
        self.port(port).map(|p| p.lanes.as_slice())
    }

    /// Returns every port wired through the given a-side pin.
    pub fn ports_sharing_lane(&self, pin: Pin) -> BTreeSet<PortId> {
        self.lane_index.get(&pin).cloned().unwrap_or_default()
    }

    /// Returns every port wired through any of the given a-side pins.
    pub fn ports_sharing_any<'a>(&self, pins: impl IntoIterator<Item = &'a Pin>) -> BTreeSet<PortId> {
        let mut ports = BTreeSet::new();
        for pin in pins {
            if let Some(sharing) = self.lane_index.get(pin) {
                ports.extend(sharing.iter().copied());
            }
        }
        ports
    }

    /// Iterates ports in ascending id order.
    pub fn ports(&self) -> impl Iterator<Item = &LogicalPort> {
        self.ports.values()
    }

    pub fn pim_id(&self, port: PortId) -> Result<Option<u32>> {
        self.port(port).map(LogicalPort::pim_id)
    }

    /// Returns the chip of the port's first a-side pin.
    pub fn iphy_chip(&self, port: PortId) -> Result<Option<ChipHandle>> {
        self.port(port).map(|p| p.lanes.first().map(|c| c.a.chip))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
