//! Mode-tracked command/response session over a switch console.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, trace, warn};

use crate::error::{TerminalError, TerminalResult};
use crate::link::{SerialLink, SerialSettings, TtyLink};

/// Marker substring for global configuration mode prompts, matched
/// case-insensitively. Covers both "(config)#" and "(config-if)#".
pub const CONFIG_INDICATOR: &str = "(config";

/// Prompt substring indicating privileged EXEC mode.
const PRIVILEGED_MARKER: &str = "#";

/// Prompt substring indicating user EXEC mode.
const USER_MARKER: &str = ">";

/// Password prompt marker after "enable", matched case-insensitively.
const PASSWORD_PROMPT: &str = "password:";

/// Pause between successive reads while a response is still arriving.
const READ_POLL: Duration = Duration::from_millis(100);

/// CLI privilege/configuration mode of the remote device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    /// No open transport.
    Disconnected,
    /// User EXEC mode ("Switch>").
    UserExec,
    /// Privileged EXEC mode ("Switch#").
    PrivilegedExec,
    /// Global configuration mode ("Switch(config)#").
    GlobalConfig,
}

impl CliMode {
    /// Returns the mode name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            CliMode::Disconnected => "disconnected",
            CliMode::UserExec => "user-exec",
            CliMode::PrivilegedExec => "privileged-exec",
            CliMode::GlobalConfig => "global-config",
        }
    }
}

/// Classifies a prompt into a CLI mode, if it matches a known shape.
///
/// Config is checked first: a config prompt also carries the "#" marker.
fn classify_prompt(response: &str) -> Option<CliMode> {
    let lower = response.to_lowercase();
    if lower.contains(CONFIG_INDICATOR) {
        Some(CliMode::GlobalConfig)
    } else if response.contains(PRIVILEGED_MARKER) {
        Some(CliMode::PrivilegedExec)
    } else if response.contains(USER_MARKER) {
        Some(CliMode::UserExec)
    } else {
        None
    }
}

/// Command/response session over a switch console.
///
/// The cached mode is advisory only: it is cleared on every transport
/// error and on any unrecognized prompt, and [`TerminalSession::probe`]
/// is the sole way to re-establish it. Callers that depend on a mode
/// must probe first rather than trust the cache.
pub struct TerminalSession {
    settings: SerialSettings,
    link: Option<Box<dyn SerialLink>>,
    /// Last observed mode; `None` means unknown, re-probe before use.
    mode: Option<CliMode>,
}

impl TerminalSession {
    /// Creates a disconnected session with the given settings.
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            settings,
            link: None,
            mode: Some(CliMode::Disconnected),
        }
    }

    /// Returns the session settings.
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Returns the cached mode, or `None` when it must be re-probed.
    pub fn mode(&self) -> Option<CliMode> {
        self.mode
    }

    /// True if a transport is open.
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Opens the serial transport and clears any buffered bytes.
    ///
    /// Does not establish a CLI mode; the device may be sitting at any
    /// prompt. Replaces an existing transport if one is open.
    #[instrument(skip(self), fields(device = %self.settings.device))]
    pub async fn connect(&mut self) -> TerminalResult<()> {
        let link = TtyLink::open(&self.settings)?;
        self.attach(Box::new(link)).await
    }

    /// Attaches an already-open transport (used by tests and by callers
    /// supplying a non-tty link).
    pub async fn attach(&mut self, mut link: Box<dyn SerialLink>) -> TerminalResult<()> {
        // Give the line a moment, then drop whatever banner is queued.
        sleep(self.settings.settle_delay).await;
        link.clear()
            .await
            .map_err(|e| TerminalError::io("flush", e))?;
        self.link = Some(link);
        self.mode = None;
        debug!("console transport attached");
        Ok(())
    }

    /// Releases the transport. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if self.link.take().is_some() {
            debug!("console transport released");
        }
        self.mode = Some(CliMode::Disconnected);
    }

    /// Sends a command and accumulates the textual response.
    ///
    /// Writes the command terminated by CRLF, waits `settle`, then reads
    /// repeatedly until the device goes quiet or the overall read
    /// timeout elapses. Undecodable bytes are dropped, not fatal.
    pub async fn send(&mut self, command: &str, settle: Duration) -> TerminalResult<String> {
        let result = self.send_inner(command, settle).await;
        if let Err(e) = &result {
            if e.invalidates_mode() {
                self.mode = None;
            }
        }
        result
    }

    /// Sends a command using the session's default settle delay.
    pub async fn send_default(&mut self, command: &str) -> TerminalResult<String> {
        let settle = self.settings.settle_delay;
        self.send(command, settle).await
    }

    async fn send_inner(&mut self, command: &str, settle: Duration) -> TerminalResult<String> {
        let read_timeout = self.settings.read_timeout;
        let link = self.link.as_mut().ok_or(TerminalError::NotConnected)?;

        // Stale output from a previous exchange must not leak into this
        // response.
        link.clear()
            .await
            .map_err(|e| TerminalError::io("flush", e))?;

        let framed = format!("{}\r\n", command);
        link.write_all(framed.as_bytes())
            .await
            .map_err(|e| TerminalError::io("write", e))?;

        sleep(settle).await;

        let mut raw = Vec::new();
        let deadline = Instant::now() + read_timeout;
        loop {
            if Instant::now() >= deadline {
                break;
            }
            let chunk = link
                .read_available(READ_POLL)
                .await
                .map_err(|e| TerminalError::io("read", e))?;
            if chunk.is_empty() {
                break;
            }
            raw.extend_from_slice(&chunk);
        }

        let text = String::from_utf8_lossy(&raw).into_owned();
        trace!(command = %command, bytes = raw.len(), "console exchange");
        Ok(text)
    }

    /// Re-establishes the CLI mode by sending an empty command and
    /// classifying the returned prompt.
    #[instrument(skip(self))]
    pub async fn probe(&mut self) -> TerminalResult<CliMode> {
        if !self.is_connected() {
            self.mode = Some(CliMode::Disconnected);
            return Ok(CliMode::Disconnected);
        }

        let response = self.send_default("").await?;
        match classify_prompt(&response) {
            Some(mode) => {
                self.mode = Some(mode);
                debug!(mode = mode.as_str(), "probed CLI mode");
                Ok(mode)
            }
            None => {
                self.mode = None;
                let tail: String = response.chars().rev().take(32).collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                Err(TerminalError::mode_unknown(tail))
            }
        }
    }

    /// Enters privileged EXEC mode via "enable".
    ///
    /// Fails with [`TerminalError::EnablePasswordRequired`] if the device
    /// prompts for a password and none is supplied. Success is verified
    /// by re-probing the prompt, not by trusting the command echo.
    #[instrument(skip(self, password), fields(has_password = password.is_some()))]
    pub async fn enter_privileged(&mut self, password: Option<&str>) -> TerminalResult<()> {
        let response = self.send_default("enable").await?;
        if response.to_lowercase().contains(PASSWORD_PROMPT) {
            match password {
                Some(p) => {
                    self.send_default(p).await?;
                }
                None => return Err(TerminalError::EnablePasswordRequired),
            }
        }

        match self.probe().await? {
            CliMode::PrivilegedExec | CliMode::GlobalConfig => Ok(()),
            other => {
                warn!(mode = other.as_str(), "enable did not reach privileged EXEC");
                Err(TerminalError::EnableFailed)
            }
        }
    }

    /// Enters global configuration mode via "configure terminal".
    #[instrument(skip(self))]
    pub async fn enter_config(&mut self) -> TerminalResult<()> {
        let response = self.send_default("configure terminal").await?;
        if response.to_lowercase().contains("config") {
            self.mode = Some(CliMode::GlobalConfig);
            Ok(())
        } else {
            self.mode = None;
            Err(TerminalError::ConfigModeFailed)
        }
    }

    /// Leaves configuration mode via "end". Idempotent: safe to call
    /// from any mode; the resulting mode is re-probed best-effort.
    #[instrument(skip(self))]
    pub async fn exit_config(&mut self) -> TerminalResult<()> {
        self.send_default("end").await?;
        if let Err(e) = self.probe().await {
            // Mode stays unknown; the next operation re-probes anyway.
            debug!(error = %e, "prompt not recognized after end");
        }
        Ok(())
    }
}

impl std::fmt::Debug for TerminalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("device", &self.settings.device)
            .field("connected", &self.is_connected())
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;

    /// Scripted link: each written command pops the next canned response.
    struct ScriptedLink {
        responses: VecDeque<&'static str>,
        pending: Vec<u8>,
        sent: Vec<String>,
    }

    impl ScriptedLink {
        fn new(responses: Vec<&'static str>) -> Self {
            Self {
                responses: responses.into(),
                pending: Vec::new(),
                sent: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl SerialLink for ScriptedLink {
        async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            let text = String::from_utf8_lossy(data);
            self.sent.push(text.trim_end().to_string());
            if let Some(response) = self.responses.pop_front() {
                self.pending.extend_from_slice(response.as_bytes());
            }
            Ok(())
        }

        async fn read_available(&mut self, _wait: Duration) -> io::Result<Vec<u8>> {
            Ok(std::mem::take(&mut self.pending))
        }

        async fn clear(&mut self) -> io::Result<()> {
            self.pending.clear();
            Ok(())
        }
    }

    fn fast_settings() -> SerialSettings {
        SerialSettings {
            device: "sim".to_string(),
            baud: 9600,
            read_timeout: Duration::from_millis(50),
            settle_delay: Duration::from_millis(1),
        }
    }

    async fn session_with(responses: Vec<&'static str>) -> TerminalSession {
        let mut session = TerminalSession::new(fast_settings());
        session
            .attach(Box::new(ScriptedLink::new(responses)))
            .await
            .unwrap();
        session
    }

    #[test]
    fn test_classify_prompt() {
        assert_eq!(classify_prompt("Switch>"), Some(CliMode::UserExec));
        assert_eq!(classify_prompt("Switch#"), Some(CliMode::PrivilegedExec));
        assert_eq!(
            classify_prompt("Switch(config)#"),
            Some(CliMode::GlobalConfig)
        );
        assert_eq!(
            classify_prompt("Switch(config-if)#"),
            Some(CliMode::GlobalConfig)
        );
        assert_eq!(classify_prompt("garbage"), None);
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let mut session = TerminalSession::new(fast_settings());
        let err = session.send_default("show clock").await.unwrap_err();
        assert!(matches!(err, TerminalError::NotConnected));
    }

    #[tokio::test]
    async fn test_send_accumulates_response() {
        let mut session = session_with(vec!["show clock\r\n12:00:00 UTC\r\nSwitch#"]).await;
        let response = session.send_default("show clock").await.unwrap();
        assert!(response.contains("12:00:00"));
        assert!(response.contains("Switch#"));
    }

    #[tokio::test]
    async fn test_probe_tracks_mode() {
        let mut session = session_with(vec!["\r\nSwitch#"]).await;
        assert_eq!(session.mode(), None);
        assert_eq!(session.probe().await.unwrap(), CliMode::PrivilegedExec);
        assert_eq!(session.mode(), Some(CliMode::PrivilegedExec));
    }

    #[tokio::test]
    async fn test_probe_unknown_prompt_clears_mode() {
        let mut session = session_with(vec!["% strange output"]).await;
        let err = session.probe().await.unwrap_err();
        assert!(matches!(err, TerminalError::ModeUnknown { .. }));
        assert_eq!(session.mode(), None);
    }

    #[tokio::test]
    async fn test_enter_privileged_without_password() {
        let mut session = session_with(vec!["enable\r\nSwitch#", "\r\nSwitch#"]).await;
        session.enter_privileged(None).await.unwrap();
        assert_eq!(session.mode(), Some(CliMode::PrivilegedExec));
    }

    #[tokio::test]
    async fn test_enter_privileged_password_missing() {
        let mut session = session_with(vec!["enable\r\nPassword:"]).await;
        let err = session.enter_privileged(None).await.unwrap_err();
        assert!(matches!(err, TerminalError::EnablePasswordRequired));
    }

    #[tokio::test]
    async fn test_enter_privileged_with_password() {
        let mut session =
            session_with(vec!["enable\r\nPassword:", "\r\nSwitch#", "\r\nSwitch#"]).await;
        session.enter_privileged(Some("secret")).await.unwrap();
        assert_eq!(session.mode(), Some(CliMode::PrivilegedExec));
    }

    #[tokio::test]
    async fn test_config_mode_round_trip() {
        let mut session = session_with(vec![
            "configure terminal\r\nSwitch(config)#",
            "end\r\nSwitch#",
            "\r\nSwitch#",
        ])
        .await;
        session.enter_config().await.unwrap();
        assert_eq!(session.mode(), Some(CliMode::GlobalConfig));
        session.exit_config().await.unwrap();
        assert_eq!(session.mode(), Some(CliMode::PrivilegedExec));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut session = session_with(vec![]).await;
        session.disconnect();
        session.disconnect();
        assert_eq!(session.mode(), Some(CliMode::Disconnected));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_probe_while_disconnected() {
        let mut session = TerminalSession::new(fast_settings());
        assert_eq!(session.probe().await.unwrap(), CliMode::Disconnected);
    }
}
