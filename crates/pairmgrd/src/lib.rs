//! pairmgrd - box/screen pairing manager.
//!
//! Keeps the switch's port-to-VLAN wiring consistent with the box/
//! screen/user assignment records. The records are the source of truth;
//! the device is a mirror, updated best-effort after every mutation and
//! replayed wholesale at startup or on demand.

mod coordinator;
mod defaults;
mod reconcile;

pub use coordinator::AssignmentCoordinator;
pub use defaults::{DEFAULT_BOX_VLAN, DEFAULT_SCREEN_VLAN};
pub use reconcile::{PortProgrammer, ReconcileEngine, SyncOutcome};
