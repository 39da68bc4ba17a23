//! Box and screen record types.

use serde::{Deserialize, Serialize};

/// A user-claimable device endpoint bound to one switch port.
///
/// At most one box references a given user id at any time; the store
/// enforces this across every assignment path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxRecord {
    /// Unique id, assigned as max-existing+1.
    pub box_id: u32,
    /// Human-facing box label.
    pub box_number: String,
    /// Physical switch port, in the switch's own naming.
    pub port_number: String,
    /// Configured VLAN; `None` means the device default applies.
    #[serde(default)]
    pub vlan_number: Option<String>,
    /// Owning user, if claimed.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl BoxRecord {
    /// True if no user owns this box.
    pub fn is_free(&self) -> bool {
        self.user_id.is_none()
    }

    /// True if this box is owned by exactly the given user.
    pub fn is_owned_by(&self, user: &str) -> bool {
        self.user_id.as_deref() == Some(user)
    }
}

/// A display endpoint bound to one switch port, paired 1:1 with at most
/// one box. The pairing is recorded on the screen side only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRecord {
    /// Unique id, assigned as max-existing+1.
    pub screen_id: u32,
    /// Optional human-facing screen label.
    #[serde(default)]
    pub screen_number: Option<String>,
    /// Physical switch port, in the switch's own naming.
    pub port_number: String,
    /// Fixed VLAN the screen sits on absent a pairing.
    #[serde(default)]
    pub vlan_number: Option<String>,
    /// Paired box id, if any.
    #[serde(default)]
    pub box_id: Option<u32>,
}

impl ScreenRecord {
    /// True if no box is paired to this screen.
    pub fn is_free(&self) -> bool {
        self.box_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_ownership() {
        let mut bx = BoxRecord {
            box_id: 1,
            box_number: "B1".to_string(),
            port_number: "Gi1/0/1".to_string(),
            vlan_number: Some("50".to_string()),
            user_id: None,
        };
        assert!(bx.is_free());
        assert!(!bx.is_owned_by("7001"));

        bx.user_id = Some("7001".to_string());
        assert!(!bx.is_free());
        assert!(bx.is_owned_by("7001"));
        assert!(!bx.is_owned_by("7002"));
    }

    #[test]
    fn test_record_json_shape() {
        let screen = ScreenRecord {
            screen_id: 2,
            screen_number: None,
            port_number: "Gi1/0/10".to_string(),
            vlan_number: Some("999".to_string()),
            box_id: None,
        };
        let json = serde_json::to_value(&screen).unwrap();
        assert_eq!(json["screen_id"], 2);
        assert_eq!(json["port_number"], "Gi1/0/10");
        assert!(json["box_id"].is_null());
    }

    #[test]
    fn test_missing_optionals_default() {
        let bx: BoxRecord = serde_json::from_str(
            r#"{"box_id": 1, "box_number": "B1", "port_number": "Gi1/0/1"}"#,
        )
        .unwrap();
        assert_eq!(bx.vlan_number, None);
        assert_eq!(bx.user_id, None);
    }
}
