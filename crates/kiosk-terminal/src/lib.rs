//! kiosk-terminal - serial console session layer.
//!
//! Drives a line-oriented CLI over a serial byte stream: write a command,
//! wait for the device to settle, accumulate whatever text comes back.
//! The remote CLI mode (user EXEC, privileged EXEC, global config) is
//! tracked but treated as advisory; callers re-probe via the prompt
//! before relying on it.

mod error;
mod link;
mod session;

pub use error::{TerminalError, TerminalResult};
pub use link::{SerialLink, SerialSettings, TtyLink};
pub use session::{CliMode, TerminalSession, CONFIG_INDICATOR};
