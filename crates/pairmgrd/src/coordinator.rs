//! AssignmentCoordinator - compound assignment use cases.
//!
//! Sequences datastore mutations and switch reconfiguration in a fixed,
//! auditable order. Every switch-side action is fire-and-forget
//! relative to the next datastore step: the records always transition,
//! even when the physical rewiring silently fails.

use tracing::{debug, instrument};

use kiosk_store::{AssignmentStore, BoxRecord, ScreenRecord, StoreError, StoreResult};

use crate::defaults::{DEFAULT_BOX_VLAN, DEFAULT_SCREEN_VLAN};
use crate::reconcile::{PortProgrammer, ReconcileEngine};

/// VLAN a freed box port returns to: its own, or the box default.
fn box_reset_vlan(bx: &BoxRecord) -> String {
    bx.vlan_number
        .clone()
        .unwrap_or_else(|| DEFAULT_BOX_VLAN.to_string())
}

/// VLAN a freed screen port returns to: its configured disconnected
/// VLAN, or the fixed default.
fn screen_reset_vlan(screen: &ScreenRecord) -> String {
    screen
        .vlan_number
        .clone()
        .unwrap_or_else(|| DEFAULT_SCREEN_VLAN.to_string())
}

/// Orchestrates multi-step assignment use cases over the store and the
/// reconciliation engine.
pub struct AssignmentCoordinator<P> {
    store: AssignmentStore,
    engine: ReconcileEngine<P>,
}

impl<P: PortProgrammer> AssignmentCoordinator<P> {
    /// Creates a coordinator over the given store and engine.
    pub fn new(store: AssignmentStore, engine: ReconcileEngine<P>) -> Self {
        Self { store, engine }
    }

    /// Returns the assignment store.
    pub fn store(&self) -> &AssignmentStore {
        &self.store
    }

    /// Returns the assignment store for direct record CRUD.
    pub fn store_mut(&mut self) -> &mut AssignmentStore {
        &mut self.store
    }

    /// Returns the reconciliation engine.
    pub fn engine(&self) -> &ReconcileEngine<P> {
        &self.engine
    }

    /// Replays the full assignment table against the switch.
    pub async fn sync_all(&self) -> bool {
        self.engine.sync_all(&self.store).await
    }

    /// Claims a box for a user: the given box, or the first free one.
    ///
    /// Any box the user already owns is released first, so the
    /// one-box-per-user invariant holds on every path.
    #[instrument(skip(self))]
    pub fn claim_box(&mut self, user: &str, box_id: Option<u32>) -> StoreResult<BoxRecord> {
        self.store.unassign_user_if_present(user)?;
        match box_id {
            Some(id) => self.store.assign_user_to_box(user, id),
            None => self.store.assign_user_to_any_free_box(user),
        }
    }

    /// Releases the box owned by a user.
    pub fn release_box_by_user(&mut self, user: &str) -> StoreResult<()> {
        if self.store.unassign_user(user)? {
            Ok(())
        } else {
            Err(StoreError::user_has_no_box(user))
        }
    }

    /// Releases a box by id; true if it was owned, false if already free.
    pub fn release_box(&mut self, box_id: u32) -> StoreResult<bool> {
        self.store.unassign_box(box_id)
    }

    /// Assigns the box owned by `user` to a screen, evicting prior
    /// occupants of both sides.
    ///
    /// Order of operations:
    /// 1. resolve the user's box;
    /// 2. if the screen is held by another box, unpair it and reset
    ///    that box's port to its default VLAN;
    /// 3. if the box is on another screen, unpair it and reset that
    ///    screen's port to its disconnected VLAN;
    /// 4. pair box and screen (now conflict-free);
    /// 5. rewire the screen's port onto the box's VLAN.
    #[instrument(skip(self))]
    pub async fn assign_user_to_screen(
        &mut self,
        user: &str,
        screen_id: u32,
    ) -> StoreResult<ScreenRecord> {
        let screen = self
            .store
            .get_screen(screen_id)
            .cloned()
            .ok_or_else(|| StoreError::screen_not_found(screen_id))?;
        let bx = self
            .store
            .box_for_user(user)
            .cloned()
            .ok_or_else(|| StoreError::user_has_no_box(user))?;

        if let Some(old_box_id) = screen.box_id {
            if old_box_id != bx.box_id {
                self.store.unpair_by_screen(screen_id)?;
                if let Some(old_box) = self.store.get_box(old_box_id).cloned() {
                    self.engine
                        .reset_port(&old_box.port_number, &box_reset_vlan(&old_box))
                        .await;
                }
            }
        }

        if let Some(old_screen) = self.store.screen_for_box(bx.box_id).cloned() {
            if old_screen.screen_id != screen_id {
                self.store.unpair_by_box(bx.box_id)?;
                self.engine
                    .reset_port(&old_screen.port_number, &screen_reset_vlan(&old_screen))
                    .await;
            }
        }

        let paired = self.store.pair_box_to_screen(bx.box_id, screen_id)?;

        match &bx.vlan_number {
            Some(vlan) => {
                self.engine.sync_pair(&paired.port_number, vlan).await;
            }
            None => {
                debug!(
                    box_id = bx.box_id,
                    "box has no VLAN configured, screen port left untouched"
                );
            }
        }
        Ok(paired)
    }

    /// Pairs a box directly to a screen (no eviction), rewiring the
    /// screen's port onto the box's VLAN.
    #[instrument(skip(self))]
    pub async fn pair_box_to_screen(
        &mut self,
        box_id: u32,
        screen_id: u32,
    ) -> StoreResult<ScreenRecord> {
        let bx = self
            .store
            .get_box(box_id)
            .cloned()
            .ok_or_else(|| StoreError::box_not_found(box_id))?;
        let screen = self.store.pair_box_to_screen(box_id, screen_id)?;

        if let Some(vlan) = &bx.vlan_number {
            self.engine.sync_pair(&screen.port_number, vlan).await;
        }
        Ok(screen)
    }

    /// Unpairs by box id, returning both freed ports to their defaults.
    ///
    /// True if a pairing was cleared, false if the box had none.
    #[instrument(skip(self))]
    pub async fn unpair_by_box(&mut self, box_id: u32) -> StoreResult<bool> {
        let bx = self
            .store
            .get_box(box_id)
            .cloned()
            .ok_or_else(|| StoreError::box_not_found(box_id))?;
        let screen = self.store.screen_for_box(box_id).cloned();

        let cleared = self.store.unpair_by_box(box_id)?;
        if cleared {
            self.engine
                .reset_port(&bx.port_number, &box_reset_vlan(&bx))
                .await;
            if let Some(screen) = screen {
                self.engine
                    .reset_port(&screen.port_number, &screen_reset_vlan(&screen))
                    .await;
            }
        }
        Ok(cleared)
    }

    /// Unpairs by screen id, returning both freed ports to their
    /// defaults. True if a pairing was cleared, false if already free.
    #[instrument(skip(self))]
    pub async fn unpair_by_screen(&mut self, screen_id: u32) -> StoreResult<bool> {
        let screen = self
            .store
            .get_screen(screen_id)
            .cloned()
            .ok_or_else(|| StoreError::screen_not_found(screen_id))?;

        let cleared = self.store.unpair_by_screen(screen_id)?;
        if cleared {
            if let Some(box_id) = screen.box_id {
                if let Some(bx) = self.store.get_box(box_id).cloned() {
                    self.engine
                        .reset_port(&bx.port_number, &box_reset_vlan(&bx))
                        .await;
                }
            }
            self.engine
                .reset_port(&screen.port_number, &screen_reset_vlan(&screen))
                .await;
        }
        Ok(cleared)
    }

    /// Deletes a box. Any pairing is severed in the same mutation, and
    /// both ports are reset best-effort.
    #[instrument(skip(self))]
    pub async fn remove_box(&mut self, box_id: u32) -> StoreResult<()> {
        let bx = self
            .store
            .get_box(box_id)
            .cloned()
            .ok_or_else(|| StoreError::box_not_found(box_id))?;
        let screen = self.store.screen_for_box(box_id).cloned();

        self.store.delete_box(box_id)?;

        self.engine
            .reset_port(&bx.port_number, &box_reset_vlan(&bx))
            .await;
        if let Some(screen) = screen {
            self.engine
                .reset_port(&screen.port_number, &screen_reset_vlan(&screen))
                .await;
        }
        Ok(())
    }

    /// Deletes a screen, resetting the freed box port if one was paired.
    #[instrument(skip(self))]
    pub async fn remove_screen(&mut self, screen_id: u32) -> StoreResult<()> {
        let screen = self
            .store
            .get_screen(screen_id)
            .cloned()
            .ok_or_else(|| StoreError::screen_not_found(screen_id))?;

        self.store.delete_screen(screen_id)?;

        if let Some(box_id) = screen.box_id {
            if let Some(bx) = self.store.get_box(box_id).cloned() {
                self.engine
                    .reset_port(&bx.port_number, &box_reset_vlan(&bx))
                    .await;
            }
        }
        Ok(())
    }
}
