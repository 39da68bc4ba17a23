//! Northbound status types for the switch surface.

use serde::{Deserialize, Serialize};

/// Link state classification for a switch port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Line protocol is up ("connected"/"up").
    Active,
    /// Line protocol is down ("notconnect"/"down").
    Inactive,
    /// Neither marker appeared in the response.
    Unknown,
}

impl LinkState {
    /// Returns the state name as exposed northbound.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Active => "active",
            LinkState::Inactive => "inactive",
            LinkState::Unknown => "unknown",
        }
    }
}

/// Status of a single switch port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStatus {
    /// Port identifier in the switch's own naming (e.g. "Gi1/0/10").
    pub port: String,
    /// Link state classification.
    pub status: LinkState,
    /// Access VLAN, when one could be extracted.
    pub vlan: Option<String>,
}

/// One row of the VLAN table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanEntry {
    /// VLAN id as reported by the device.
    pub id: String,
    /// VLAN name; defaults to "VLAN<id>" when the device omits one.
    pub name: String,
}

/// Aggregate switch status for the northbound surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchInfo {
    /// True if a console session is currently open.
    pub connected: bool,
    /// Per-port status rows.
    pub ports: Vec<PortStatus>,
    /// Known VLANs.
    pub vlans: Vec<VlanEntry>,
}

impl Default for LinkState {
    fn default() -> Self {
        LinkState::Unknown
    }
}
