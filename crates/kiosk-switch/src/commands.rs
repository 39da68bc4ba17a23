//! IOS command builders for VLAN and port operations.
//!
//! One builder per device command; the configurator strings these into
//! sequences. VLAN ids and port names are opaque strings here, passed
//! through verbatim.

/// Command to force a port into access (non-trunk) switching.
pub const ACCESS_MODE_CMD: &str = "switchport mode access";

/// Command to administratively enable the selected port.
pub const NO_SHUTDOWN_CMD: &str = "no shutdown";

/// Bulk port status query.
pub const SHOW_ALL_PORTS_CMD: &str = "show interfaces status";

/// VLAN table listing query.
pub const SHOW_VLAN_BRIEF_CMD: &str = "show vlan brief";

/// Builds the existence query for a single VLAN.
pub fn build_show_vlan_cmd(vlan_id: &str) -> String {
    format!("show vlan id {}", vlan_id)
}

/// Builds the VLAN creation command, optionally naming the VLAN.
///
/// The name sub-command rides in the same exchange: the device consumes
/// both lines before the next prompt.
pub fn build_create_vlan_cmd(vlan_id: &str, name: Option<&str>) -> String {
    match name {
        Some(n) => format!("vlan {}\nname {}", vlan_id, n),
        None => format!("vlan {}", vlan_id),
    }
}

/// Builds the interface selection command.
pub fn build_select_interface_cmd(port: &str) -> String {
    format!("interface {}", port)
}

/// Builds the access-VLAN binding command for the selected interface.
pub fn build_access_vlan_cmd(vlan_id: &str) -> String {
    format!("switchport access vlan {}", vlan_id)
}

/// Builds the switchport detail query for a port.
pub fn build_show_switchport_cmd(port: &str) -> String {
    format!("show interfaces {} switchport", port)
}

/// Builds the status query for a single port.
pub fn build_show_port_status_cmd(port: &str) -> String {
    format!("show interfaces {} status", port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_show_vlan_cmd() {
        assert_eq!(build_show_vlan_cmd("50"), "show vlan id 50");
    }

    #[test]
    fn test_build_create_vlan_cmd() {
        assert_eq!(build_create_vlan_cmd("50", None), "vlan 50");

        let cmd = build_create_vlan_cmd("50", Some("kiosk-a"));
        assert!(cmd.starts_with("vlan 50\n"));
        assert!(cmd.contains("name kiosk-a"));
    }

    #[test]
    fn test_build_port_commands() {
        assert_eq!(build_select_interface_cmd("Gi1/0/10"), "interface Gi1/0/10");
        assert_eq!(build_access_vlan_cmd("50"), "switchport access vlan 50");
        assert_eq!(
            build_show_switchport_cmd("Gi1/0/10"),
            "show interfaces Gi1/0/10 switchport"
        );
        assert_eq!(
            build_show_port_status_cmd("Gi1/0/10"),
            "show interfaces Gi1/0/10 status"
        );
    }
}
