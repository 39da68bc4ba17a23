//! kiosk-store - assignment records and configuration.
//!
//! Holds the Box and Screen record collections plus a flat key/value
//! configuration collection, persisted together as one JSON document.
//! The store enforces the two relationship invariants: at most one box
//! per user, and a strictly 1:1 box/screen pairing.

mod document;
mod error;
mod records;
mod store;

pub use error::{StoreError, StoreResult};
pub use records::{BoxRecord, ScreenRecord};
pub use store::{AssignmentStore, CONFIG_SERIAL_PORT_KEY};
