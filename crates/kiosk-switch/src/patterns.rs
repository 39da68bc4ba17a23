//! Response pattern tables for the IOS dialect.
//!
//! All interpretation of device output lives here as ordered
//! (pattern, extractor) tables, so the southbound dialect can be
//! extended without touching the operation call sites. Matching is
//! case-insensitive throughout.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{LinkState, VlanEntry};

/// Known port-name prefixes used to filter bulk status lines.
pub const PORT_NAME_PREFIXES: &[&str] = &["Gi", "Fa", "Te"];

/// Ordered patterns for extracting the access VLAN from a switchport
/// query; first match wins. The explicit "Access Mode VLAN" form takes
/// precedence over the generic "VLAN <n>" fallback.
static PORT_VLAN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)Access Mode VLAN:\s*(\d+)").expect("invalid access-mode pattern"),
        Regex::new(r"(?i)VLAN\s+(\d+)").expect("invalid vlan fallback pattern"),
    ]
});

/// Ordered substring table for link-state classification; first match
/// wins. "up" goes last so incidental words ("Duplex") cannot shadow
/// the explicit status markers.
const LINK_STATE_MARKERS: &[(&str, LinkState)] = &[
    ("connected", LinkState::Active),
    ("notconnect", LinkState::Inactive),
    ("down", LinkState::Inactive),
    ("up", LinkState::Active),
];

/// Extracts the VLAN id from a switchport query response.
///
/// Returns `None` when no pattern matches; a value is never fabricated.
pub fn extract_port_vlan(response: &str) -> Option<String> {
    PORT_VLAN_PATTERNS
        .iter()
        .find_map(|re| re.captures(response).map(|caps| caps[1].to_string()))
}

/// True if the response marks the VLAN as nonexistent.
///
/// The device emits "VLAN <id> not found" or "VLAN<id> not found";
/// matching is case- and spacing-insensitive. Absence is a valid
/// answer, not an error.
pub fn vlan_missing(response: &str, vlan_id: &str) -> bool {
    let marker = format!(r"(?i)VLAN\s*{}\s+not\s+found", regex::escape(vlan_id));
    Regex::new(&marker)
        .map(|re| re.is_match(response))
        .unwrap_or(false)
}

/// Classifies the link state from a status response.
pub fn classify_link_state(response: &str) -> LinkState {
    let lower = response.to_lowercase();
    LINK_STATE_MARKERS
        .iter()
        .find(|(marker, _)| lower.contains(marker))
        .map(|(_, state)| *state)
        .unwrap_or(LinkState::Unknown)
}

/// Parses one line of bulk status output into (port, state).
///
/// Returns `None` unless the first token carries a known port-name
/// prefix and the line has at least a status column.
pub fn parse_status_line(line: &str) -> Option<(String, LinkState)> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    if !PORT_NAME_PREFIXES.iter().any(|p| first.starts_with(p)) {
        return None;
    }
    tokens.next()?;
    Some((first.to_string(), classify_link_state(line)))
}

/// Parses a "show vlan brief" row into a [`VlanEntry`].
///
/// Rows start with a numeric VLAN id; the name defaults to "VLAN<id>"
/// when the device omits the column.
pub fn parse_vlan_brief_line(line: &str) -> Option<VlanEntry> {
    let mut tokens = line.split_whitespace();
    let id = tokens.next()?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let name = tokens
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| format!("VLAN{}", id));
    Some(VlanEntry {
        id: id.to_string(),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_port_vlan_access_mode_first() {
        let response = "Name: Gi1/0/10\nAdministrative Mode: static access\n\
                        Access Mode VLAN: 50 (VLAN0050)\nTrunking VLANs Enabled: ALL";
        assert_eq!(extract_port_vlan(response), Some("50".to_string()));
    }

    #[test]
    fn test_extract_port_vlan_fallback() {
        assert_eq!(
            extract_port_vlan("port is on VLAN 120"),
            Some("120".to_string())
        );
        assert_eq!(extract_port_vlan("no vlan info here"), None);
    }

    #[test]
    fn test_extract_is_case_insensitive() {
        assert_eq!(
            extract_port_vlan("access mode vlan: 7"),
            Some("7".to_string())
        );
    }

    #[test]
    fn test_vlan_missing_markers() {
        assert!(vlan_missing("VLAN 999 not found in current VLAN database", "999"));
        assert!(vlan_missing("VLAN999 not found", "999"));
        assert!(vlan_missing("vlan  999  not  found", "999"));
        assert!(!vlan_missing("VLAN 999 active", "999"));
        // A different id's absence says nothing about this one.
        assert!(!vlan_missing("VLAN 998 not found", "999"));
    }

    #[test]
    fn test_classify_link_state() {
        assert_eq!(
            classify_link_state("Gi1/0/1  connected  50"),
            LinkState::Active
        );
        assert_eq!(
            classify_link_state("Gi1/0/2  notconnect  1"),
            LinkState::Inactive
        );
        assert_eq!(classify_link_state("line protocol is down"), LinkState::Inactive);
        assert_eq!(classify_link_state("line protocol is up"), LinkState::Active);
        assert_eq!(classify_link_state("no markers at all"), LinkState::Unknown);
    }

    #[test]
    fn test_parse_status_line() {
        let (port, state) =
            parse_status_line("Gi1/0/1   connected  trunk  a-full  a-1000").unwrap();
        assert_eq!(port, "Gi1/0/1");
        assert_eq!(state, LinkState::Active);

        let (port, state) = parse_status_line("Fa0/3  notconnect  1").unwrap();
        assert_eq!(port, "Fa0/3");
        assert_eq!(state, LinkState::Inactive);

        assert!(parse_status_line("Port  Name  Status  Vlan").is_none());
        assert!(parse_status_line("Gi1/0/1").is_none());
        assert!(parse_status_line("").is_none());
    }

    #[test]
    fn test_parse_vlan_brief_line() {
        let entry = parse_vlan_brief_line("50   kiosk-a   active").unwrap();
        assert_eq!(entry.id, "50");
        assert_eq!(entry.name, "kiosk-a");

        let entry = parse_vlan_brief_line("7").unwrap();
        assert_eq!(entry.name, "VLAN7");

        assert!(parse_vlan_brief_line("VLAN Name Status").is_none());
        assert!(parse_vlan_brief_line("----").is_none());
    }
}
