//! Reconciliation between the assignment records and the switch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use kiosk_store::AssignmentStore;
use kiosk_switch::{SwitchCtl, SwitchResult};

use crate::defaults::DEFAULT_BOX_VLAN;

/// Device-programming face of the switch controller.
///
/// The engine and coordinator reach the switch only through this trait,
/// so the flows are testable against a recording double.
#[async_trait]
pub trait PortProgrammer: Send + Sync {
    /// True once a console session is open.
    fn is_connected(&self) -> bool;

    /// Connects (if needed) and enters privileged EXEC mode.
    async fn prepare(&self) -> SwitchResult<()>;

    /// Binds a port to a VLAN as an access port.
    async fn assign_port_to_vlan(&self, port: &str, vlan: &str) -> SwitchResult<()>;
}

#[async_trait]
impl PortProgrammer for SwitchCtl {
    fn is_connected(&self) -> bool {
        SwitchCtl::is_connected(self)
    }

    async fn prepare(&self) -> SwitchResult<()> {
        SwitchCtl::prepare(self).await
    }

    async fn assign_port_to_vlan(&self, port: &str, vlan: &str) -> SwitchResult<()> {
        SwitchCtl::assign_port_to_vlan(self, port, vlan).await
    }
}

/// Last known result of pushing a port's target VLAN to the device.
///
/// The datastore and the device are only eventually consistent; this is
/// what the operator-facing status view and the full-resync operation
/// act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No push has reached the device yet (e.g. it was disconnected).
    Pending,
    /// The last push for this port succeeded.
    InSync,
    /// The last push for this port failed; a resync will retry it.
    Failed,
}

/// Replays assignment records against the switch.
///
/// All pushes are best-effort: a per-port failure is logged, recorded,
/// and never undoes the datastore mutation that triggered it.
pub struct ReconcileEngine<P> {
    programmer: Arc<P>,
    port_states: Mutex<HashMap<String, SyncOutcome>>,
}

impl<P: PortProgrammer> ReconcileEngine<P> {
    /// Creates an engine over the given device programmer.
    pub fn new(programmer: Arc<P>) -> Self {
        Self {
            programmer,
            port_states: Mutex::new(HashMap::new()),
        }
    }

    /// Replays every assignment record against the switch.
    ///
    /// Screens go first (those with both port and VLAN set), then boxes
    /// (configured VLAN, or the default box VLAN). Per-item failures do
    /// not abort the remaining items; the overall result reflects only
    /// whether the connection and privileged mode could be established.
    #[instrument(skip_all)]
    pub async fn sync_all(&self, store: &AssignmentStore) -> bool {
        if let Err(e) = self.programmer.prepare().await {
            warn!(error = %e, "switch unavailable, skipping full sync");
            return false;
        }

        for screen in store.all_screens() {
            if let Some(vlan) = &screen.vlan_number {
                info!(port = %screen.port_number, vlan = %vlan, "syncing screen port");
                self.push(&screen.port_number, vlan).await;
            }
        }
        for bx in store.all_boxes() {
            let vlan = bx
                .vlan_number
                .clone()
                .unwrap_or_else(|| DEFAULT_BOX_VLAN.to_string());
            info!(port = %bx.port_number, vlan = %vlan, "syncing box port");
            self.push(&bx.port_number, &vlan).await;
        }
        true
    }

    /// Pushes a single pairing's target VLAN to the device.
    pub async fn sync_pair(&self, port: &str, vlan: &str) -> bool {
        self.push(port, vlan).await
    }

    /// Returns a freed port to its default VLAN.
    pub async fn reset_port(&self, port: &str, vlan: &str) -> bool {
        info!(port, vlan, "resetting freed port");
        self.push(port, vlan).await
    }

    /// Returns the last known sync outcome per port.
    pub fn port_states(&self) -> HashMap<String, SyncOutcome> {
        self.port_states.lock().expect("port state lock").clone()
    }

    async fn push(&self, port: &str, vlan: &str) -> bool {
        if !self.programmer.is_connected() {
            warn!(port, vlan, "switch not connected, port left pending");
            self.record(port, SyncOutcome::Pending);
            return false;
        }
        match self.programmer.assign_port_to_vlan(port, vlan).await {
            Ok(()) => {
                self.record(port, SyncOutcome::InSync);
                true
            }
            Err(e) => {
                warn!(port, vlan, error = %e, "port push failed");
                self.record(port, SyncOutcome::Failed);
                false
            }
        }
    }

    fn record(&self, port: &str, outcome: SyncOutcome) {
        self.port_states
            .lock()
            .expect("port state lock")
            .insert(port.to_string(), outcome);
    }
}
