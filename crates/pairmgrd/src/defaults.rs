//! Default VLAN targets for freed ports.

/// VLAN a box port falls back to when its record has none configured.
pub const DEFAULT_BOX_VLAN: &str = "1";

/// Fixed "disconnected" VLAN for screen ports absent a pairing.
pub const DEFAULT_SCREEN_VLAN: &str = "999";
