//! AssignmentStore - CRUD plus invariant-preserving relationship ops.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::records::{BoxRecord, ScreenRecord};

/// Configuration key holding the console serial device.
pub const CONFIG_SERIAL_PORT_KEY: &str = "serial_port";

/// Record store for boxes, screens and configuration.
///
/// Mutations are atomic per call and rewrite the backing document
/// before returning. No cross-record transaction spans a box and its
/// paired screen; callers sequence multi-record flows explicitly.
pub struct AssignmentStore {
    path: Option<PathBuf>,
    doc: Document,
}

impl AssignmentStore {
    /// Opens (or creates) a store backed by the given JSON document.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let doc = Document::load(&path)?;
        debug!(
            path = %path.display(),
            boxes = doc.boxes.len(),
            screens = doc.screens.len(),
            "opened datastore"
        );
        Ok(Self {
            path: Some(path),
            doc,
        })
    }

    /// Creates an unbacked store; nothing is persisted.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: Document::default(),
        }
    }

    fn persist(&self) -> StoreResult<()> {
        match &self.path {
            Some(path) => self.doc.save(path),
            None => Ok(()),
        }
    }

    // --- box records -----------------------------------------------------

    /// Creates a box with the next free id.
    pub fn create_box(
        &mut self,
        port_number: impl Into<String>,
        box_number: impl Into<String>,
        vlan_number: Option<String>,
    ) -> StoreResult<BoxRecord> {
        let box_id = next_id(self.doc.boxes.iter().map(|b| b.box_id));
        let record = BoxRecord {
            box_id,
            box_number: box_number.into(),
            port_number: port_number.into(),
            vlan_number,
            user_id: None,
        };
        self.doc.boxes.push(record.clone());
        self.persist()?;
        info!(box_id, "created box");
        Ok(record)
    }

    /// Deletes a box, severing any screen pairing that references it.
    pub fn delete_box(&mut self, box_id: u32) -> StoreResult<()> {
        let before = self.doc.boxes.len();
        self.doc.boxes.retain(|b| b.box_id != box_id);
        if self.doc.boxes.len() == before {
            return Err(StoreError::box_not_found(box_id));
        }
        for screen in &mut self.doc.screens {
            if screen.box_id == Some(box_id) {
                screen.box_id = None;
                info!(box_id, screen_id = screen.screen_id, "severed pairing of deleted box");
            }
        }
        self.persist()?;
        info!(box_id, "deleted box");
        Ok(())
    }

    /// Returns a box by id.
    pub fn get_box(&self, box_id: u32) -> Option<&BoxRecord> {
        self.doc.boxes.iter().find(|b| b.box_id == box_id)
    }

    /// Returns the box owned by a user, if any.
    pub fn box_for_user(&self, user: &str) -> Option<&BoxRecord> {
        self.doc.boxes.iter().find(|b| b.is_owned_by(user))
    }

    /// Returns every box in storage order.
    pub fn all_boxes(&self) -> &[BoxRecord] {
        &self.doc.boxes
    }

    /// Returns every unowned box in storage order.
    pub fn free_boxes(&self) -> Vec<&BoxRecord> {
        self.doc.boxes.iter().filter(|b| b.is_free()).collect()
    }

    /// Updates box attributes; `None` fields are left untouched.
    pub fn update_box(
        &mut self,
        box_id: u32,
        box_number: Option<String>,
        port_number: Option<String>,
        vlan_number: Option<String>,
    ) -> StoreResult<BoxRecord> {
        let record = self
            .doc
            .boxes
            .iter_mut()
            .find(|b| b.box_id == box_id)
            .ok_or_else(|| StoreError::box_not_found(box_id))?;
        if let Some(number) = box_number {
            record.box_number = number;
        }
        if let Some(port) = port_number {
            record.port_number = port;
        }
        if let Some(vlan) = vlan_number {
            record.vlan_number = Some(vlan);
        }
        let updated = record.clone();
        self.persist()?;
        Ok(updated)
    }

    // --- user/box assignment ---------------------------------------------

    /// Assigns a user to a specific box.
    ///
    /// Succeeds idempotently if the box is already owned by this exact
    /// user; fails if it is owned by anyone else.
    pub fn assign_user_to_box(&mut self, user: &str, box_id: u32) -> StoreResult<BoxRecord> {
        let record = self
            .doc
            .boxes
            .iter_mut()
            .find(|b| b.box_id == box_id)
            .ok_or_else(|| StoreError::box_not_found(box_id))?;

        if record.is_owned_by(user) {
            return Ok(record.clone());
        }
        if !record.is_free() {
            return Err(StoreError::BoxAlreadyAssigned { box_id });
        }

        record.user_id = Some(user.to_string());
        let assigned = record.clone();
        self.persist()?;
        info!(box_id, user, "assigned user to box");
        Ok(assigned)
    }

    /// Assigns a user to the first free box in storage order.
    pub fn assign_user_to_any_free_box(&mut self, user: &str) -> StoreResult<BoxRecord> {
        let record = self
            .doc
            .boxes
            .iter_mut()
            .find(|b| b.is_free())
            .ok_or(StoreError::NoFreeBoxes)?;
        record.user_id = Some(user.to_string());
        let assigned = record.clone();
        self.persist()?;
        info!(box_id = assigned.box_id, user, "assigned user to free box");
        Ok(assigned)
    }

    /// Releases the box owned by a user.
    ///
    /// Returns true if a box was released, false if the user owned none.
    pub fn unassign_user(&mut self, user: &str) -> StoreResult<bool> {
        let record = self
            .doc
            .boxes
            .iter_mut()
            .find(|b| b.is_owned_by(user));
        match record {
            Some(record) => {
                record.user_id = None;
                let box_id = record.box_id;
                self.persist()?;
                info!(box_id, user, "unassigned user from box");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Releases a user's box if they own one; a no-op otherwise.
    ///
    /// Used defensively before any assignment so the one-box-per-user
    /// invariant holds regardless of prior state.
    pub fn unassign_user_if_present(&mut self, user: &str) -> StoreResult<()> {
        self.unassign_user(user).map(|_| ())
    }

    /// Releases a box by id.
    ///
    /// Returns true if it was owned, false if it was already free.
    pub fn unassign_box(&mut self, box_id: u32) -> StoreResult<bool> {
        let record = self
            .doc
            .boxes
            .iter_mut()
            .find(|b| b.box_id == box_id)
            .ok_or_else(|| StoreError::box_not_found(box_id))?;
        if record.is_free() {
            return Ok(false);
        }
        record.user_id = None;
        self.persist()?;
        info!(box_id, "unassigned box");
        Ok(true)
    }

    // --- screen records --------------------------------------------------

    /// Creates a screen with the next free id.
    pub fn create_screen(
        &mut self,
        port_number: impl Into<String>,
        vlan_number: Option<String>,
        screen_number: Option<String>,
    ) -> StoreResult<ScreenRecord> {
        let screen_id = next_id(self.doc.screens.iter().map(|s| s.screen_id));
        let record = ScreenRecord {
            screen_id,
            screen_number,
            port_number: port_number.into(),
            vlan_number,
            box_id: None,
        };
        self.doc.screens.push(record.clone());
        self.persist()?;
        info!(screen_id, "created screen");
        Ok(record)
    }

    /// Deletes a screen. The pairing, if any, disappears with it.
    pub fn delete_screen(&mut self, screen_id: u32) -> StoreResult<()> {
        let before = self.doc.screens.len();
        self.doc.screens.retain(|s| s.screen_id != screen_id);
        if self.doc.screens.len() == before {
            return Err(StoreError::screen_not_found(screen_id));
        }
        self.persist()?;
        info!(screen_id, "deleted screen");
        Ok(())
    }

    /// Returns a screen by id.
    pub fn get_screen(&self, screen_id: u32) -> Option<&ScreenRecord> {
        self.doc.screens.iter().find(|s| s.screen_id == screen_id)
    }

    /// Returns the screen paired to a box, if any.
    pub fn screen_for_box(&self, box_id: u32) -> Option<&ScreenRecord> {
        self.doc.screens.iter().find(|s| s.box_id == Some(box_id))
    }

    /// Returns every screen in storage order.
    pub fn all_screens(&self) -> &[ScreenRecord] {
        &self.doc.screens
    }

    /// Returns every unpaired screen in storage order.
    pub fn free_screens(&self) -> Vec<&ScreenRecord> {
        self.doc.screens.iter().filter(|s| s.is_free()).collect()
    }

    /// Updates screen attributes; `None` fields are left untouched.
    pub fn update_screen(
        &mut self,
        screen_id: u32,
        screen_number: Option<String>,
        port_number: Option<String>,
        vlan_number: Option<String>,
    ) -> StoreResult<ScreenRecord> {
        let record = self
            .doc
            .screens
            .iter_mut()
            .find(|s| s.screen_id == screen_id)
            .ok_or_else(|| StoreError::screen_not_found(screen_id))?;
        if let Some(number) = screen_number {
            record.screen_number = Some(number);
        }
        if let Some(port) = port_number {
            record.port_number = port;
        }
        if let Some(vlan) = vlan_number {
            record.vlan_number = Some(vlan);
        }
        let updated = record.clone();
        self.persist()?;
        Ok(updated)
    }

    // --- box/screen pairing ----------------------------------------------

    /// Pairs a box to a screen (1:1 on both sides).
    ///
    /// Succeeds idempotently if they are already paired to each other;
    /// fails if either side is paired elsewhere.
    pub fn pair_box_to_screen(&mut self, box_id: u32, screen_id: u32) -> StoreResult<ScreenRecord> {
        if self.get_box(box_id).is_none() {
            return Err(StoreError::box_not_found(box_id));
        }
        let index = self
            .doc
            .screens
            .iter()
            .position(|s| s.screen_id == screen_id)
            .ok_or_else(|| StoreError::screen_not_found(screen_id))?;

        match self.doc.screens[index].box_id {
            Some(current) if current == box_id => return Ok(self.doc.screens[index].clone()),
            Some(_) => return Err(StoreError::ScreenAlreadyPaired { screen_id }),
            None => {}
        }
        if self.screen_for_box(box_id).is_some() {
            return Err(StoreError::BoxAlreadyPaired { box_id });
        }

        self.doc.screens[index].box_id = Some(box_id);
        let paired = self.doc.screens[index].clone();
        self.persist()?;
        info!(box_id, screen_id, "paired box to screen");
        Ok(paired)
    }

    /// Clears the pairing that references a box.
    ///
    /// Returns true if a pairing was cleared, false if the box had none.
    pub fn unpair_by_box(&mut self, box_id: u32) -> StoreResult<bool> {
        let record = self
            .doc
            .screens
            .iter_mut()
            .find(|s| s.box_id == Some(box_id));
        match record {
            Some(record) => {
                record.box_id = None;
                let screen_id = record.screen_id;
                self.persist()?;
                info!(box_id, screen_id, "unpaired box from screen");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Clears a screen's pairing.
    ///
    /// Returns true if a pairing was cleared, false if the screen was
    /// already free.
    pub fn unpair_by_screen(&mut self, screen_id: u32) -> StoreResult<bool> {
        let record = self
            .doc
            .screens
            .iter_mut()
            .find(|s| s.screen_id == screen_id)
            .ok_or_else(|| StoreError::screen_not_found(screen_id))?;
        if record.box_id.is_none() {
            return Ok(false);
        }
        record.box_id = None;
        self.persist()?;
        info!(screen_id, "unpaired screen");
        Ok(true)
    }

    // --- configuration ---------------------------------------------------

    /// Returns a configuration value.
    pub fn config_get(&self, key: &str) -> Option<&str> {
        self.doc.config.get(key).map(String::as_str)
    }

    /// Sets a configuration value, replacing any previous one.
    pub fn config_set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> StoreResult<()> {
        self.doc.config.insert(key.into(), value.into());
        self.persist()
    }

    /// Returns all configuration key/value pairs.
    pub fn all_config(&self) -> &BTreeMap<String, String> {
        &self.doc.config
    }

    /// Returns the configured console serial device, if set.
    pub fn serial_port(&self) -> Option<&str> {
        self.config_get(CONFIG_SERIAL_PORT_KEY)
    }

    /// Stores the console serial device.
    pub fn set_serial_port(&mut self, device: impl Into<String>) -> StoreResult<()> {
        self.config_set(CONFIG_SERIAL_PORT_KEY, device)
    }
}

/// Next record id: max existing + 1, starting at 1.
fn next_id(ids: impl Iterator<Item = u32>) -> u32 {
    ids.max().map_or(1, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_with_boxes(n: u32) -> AssignmentStore {
        let mut store = AssignmentStore::in_memory();
        for i in 1..=n {
            store
                .create_box(format!("Gi1/0/{}", i), format!("B{}", i), Some(format!("{}", 40 + i)))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_ids_are_max_plus_one() {
        let mut store = store_with_boxes(2);
        store.delete_box(1).unwrap();
        let b3 = store.create_box("Gi1/0/3", "B3", None).unwrap();
        assert_eq!(b3.box_id, 3);

        // After the highest id is deleted, its id is reused.
        store.delete_box(3).unwrap();
        let next = store.create_box("Gi1/0/4", "B4", None).unwrap();
        assert_eq!(next.box_id, 3);
    }

    #[test]
    fn test_assign_specific_box() {
        let mut store = store_with_boxes(2);

        let bx = store.assign_user_to_box("7001", 2).unwrap();
        assert_eq!(bx.box_id, 2);
        assert!(bx.is_owned_by("7001"));

        // Idempotent for the same user.
        let again = store.assign_user_to_box("7001", 2).unwrap();
        assert_eq!(again, bx);

        // Conflict for a different user.
        let err = store.assign_user_to_box("7002", 2).unwrap_err();
        assert_eq!(err, StoreError::BoxAlreadyAssigned { box_id: 2 });

        let err = store.assign_user_to_box("7001", 99).unwrap_err();
        assert_eq!(err, StoreError::box_not_found(99));
    }

    #[test]
    fn test_first_free_box_in_storage_order() {
        let mut store = store_with_boxes(2);

        let first = store.assign_user_to_any_free_box("7001").unwrap();
        assert_eq!(first.box_id, 1);

        let second = store.assign_user_to_any_free_box("7002").unwrap();
        assert_eq!(second.box_id, 2);

        let err = store.assign_user_to_any_free_box("7003").unwrap_err();
        assert_eq!(err, StoreError::NoFreeBoxes);
    }

    #[test]
    fn test_one_box_per_user_invariant() {
        let mut store = store_with_boxes(3);

        store.unassign_user_if_present("7001").unwrap();
        store.assign_user_to_any_free_box("7001").unwrap();

        // The defensive unassign keeps the invariant across re-claims.
        store.unassign_user_if_present("7001").unwrap();
        store.assign_user_to_box("7001", 3).unwrap();

        let owned: Vec<_> = store
            .all_boxes()
            .iter()
            .filter(|b| b.is_owned_by("7001"))
            .collect();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].box_id, 3);
    }

    #[test]
    fn test_unassign_distinguishes_states() {
        let mut store = store_with_boxes(1);

        assert!(!store.unassign_user("7001").unwrap());
        store.assign_user_to_box("7001", 1).unwrap();
        assert!(store.unassign_user("7001").unwrap());

        assert_eq!(store.unassign_box(1).unwrap(), false);
        store.assign_user_to_box("7001", 1).unwrap();
        assert_eq!(store.unassign_box(1).unwrap(), true);
        assert_eq!(
            store.unassign_box(42).unwrap_err(),
            StoreError::box_not_found(42)
        );
    }

    #[test]
    fn test_pairing_invariants() {
        let mut store = store_with_boxes(2);
        store.create_screen("Gi1/0/10", Some("999".into()), None).unwrap();
        store.create_screen("Gi1/0/11", Some("999".into()), None).unwrap();

        let screen = store.pair_box_to_screen(1, 1).unwrap();
        assert_eq!(screen.box_id, Some(1));

        // Re-pairing the same pair succeeds without mutating anything.
        let again = store.pair_box_to_screen(1, 1).unwrap();
        assert_eq!(again, screen);

        // Screen taken by a different box.
        assert_eq!(
            store.pair_box_to_screen(2, 1).unwrap_err(),
            StoreError::ScreenAlreadyPaired { screen_id: 1 }
        );
        // Box already paired elsewhere.
        assert_eq!(
            store.pair_box_to_screen(1, 2).unwrap_err(),
            StoreError::BoxAlreadyPaired { box_id: 1 }
        );

        assert_eq!(
            store.pair_box_to_screen(9, 1).unwrap_err(),
            StoreError::box_not_found(9)
        );
        assert_eq!(
            store.pair_box_to_screen(1, 9).unwrap_err(),
            StoreError::screen_not_found(9)
        );
    }

    #[test]
    fn test_unpair_both_directions() {
        let mut store = store_with_boxes(1);
        store.create_screen("Gi1/0/10", None, None).unwrap();

        assert!(!store.unpair_by_box(1).unwrap());
        store.pair_box_to_screen(1, 1).unwrap();
        assert!(store.unpair_by_box(1).unwrap());

        store.pair_box_to_screen(1, 1).unwrap();
        assert!(store.unpair_by_screen(1).unwrap());
        assert!(!store.unpair_by_screen(1).unwrap());
        assert_eq!(
            store.unpair_by_screen(9).unwrap_err(),
            StoreError::screen_not_found(9)
        );
    }

    #[test]
    fn test_delete_box_severs_pairing() {
        let mut store = store_with_boxes(1);
        store.create_screen("Gi1/0/10", None, None).unwrap();
        store.pair_box_to_screen(1, 1).unwrap();

        store.delete_box(1).unwrap();

        // No one-sided reference survives the delete.
        let screen = store.get_screen(1).unwrap();
        assert_eq!(screen.box_id, None);
        assert!(store.get_box(1).is_none());
    }

    #[test]
    fn test_update_preserves_unset_fields() {
        let mut store = store_with_boxes(1);

        let updated = store
            .update_box(1, None, None, Some("60".to_string()))
            .unwrap();
        assert_eq!(updated.vlan_number, Some("60".to_string()));
        assert_eq!(updated.box_number, "B1");
        assert_eq!(updated.port_number, "Gi1/0/1");
    }

    #[test]
    fn test_config_round_trip() {
        let mut store = AssignmentStore::in_memory();
        assert_eq!(store.serial_port(), None);

        store.set_serial_port("/dev/ttyUSB1").unwrap();
        assert_eq!(store.serial_port(), Some("/dev/ttyUSB1"));

        store.config_set("motd", "hello").unwrap();
        assert_eq!(store.all_config().len(), 2);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let mut store = AssignmentStore::open(&path).unwrap();
            store.create_box("Gi1/0/1", "B1", Some("50".into())).unwrap();
            store.create_screen("Gi1/0/10", Some("999".into()), None).unwrap();
            store.assign_user_to_box("7001", 1).unwrap();
            store.pair_box_to_screen(1, 1).unwrap();
        }

        let store = AssignmentStore::open(&path).unwrap();
        assert!(store.get_box(1).unwrap().is_owned_by("7001"));
        assert_eq!(store.get_screen(1).unwrap().box_id, Some(1));
        assert_eq!(store.box_for_user("7001").unwrap().box_id, 1);
        assert_eq!(store.screen_for_box(1).unwrap().screen_id, 1);
    }

    #[test]
    fn test_free_listings() {
        let mut store = store_with_boxes(2);
        store.create_screen("Gi1/0/10", None, None).unwrap();
        store.assign_user_to_box("7001", 1).unwrap();
        store.pair_box_to_screen(2, 1).unwrap();

        let free_boxes: Vec<u32> = store.free_boxes().iter().map(|b| b.box_id).collect();
        assert_eq!(free_boxes, vec![2]);
        assert!(store.free_screens().is_empty());
    }
}
