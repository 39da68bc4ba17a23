//! JSON document persistence for the record collections.
//!
//! The whole datastore is one document with three named collections.
//! Writes go through a temp file and rename so a crash mid-write leaves
//! the previous document intact.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::records::{BoxRecord, ScreenRecord};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct Document {
    #[serde(default)]
    pub boxes: Vec<BoxRecord>,
    #[serde(default)]
    pub screens: Vec<ScreenRecord>,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

impl Document {
    /// Loads the document; a missing file is an empty store.
    pub fn load(path: &Path) -> StoreResult<Self> {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::persist(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(StoreError::persist(format!("{}: {}", path.display(), e))),
        }
    }

    /// Writes the document atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| StoreError::persist(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, path))
            .map_err(|e| StoreError::persist(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::load(&dir.path().join("absent.json")).unwrap();
        assert!(doc.boxes.is_empty());
        assert!(doc.screens.is_empty());
        assert!(doc.config.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut doc = Document::default();
        doc.boxes.push(BoxRecord {
            box_id: 1,
            box_number: "B1".to_string(),
            port_number: "Gi1/0/1".to_string(),
            vlan_number: Some("50".to_string()),
            user_id: None,
        });
        doc.config
            .insert("serial_port".to_string(), "/dev/ttyUSB1".to_string());
        doc.save(&path).unwrap();

        let loaded = Document::load(&path).unwrap();
        assert_eq!(loaded.boxes.len(), 1);
        assert_eq!(loaded.boxes[0].box_id, 1);
        assert_eq!(
            loaded.config.get("serial_port").map(String::as_str),
            Some("/dev/ttyUSB1")
        );
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{ not json").unwrap();

        let err = Document::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Persist { .. }));
    }
}
