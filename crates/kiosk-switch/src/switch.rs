//! SwitchCtl - semantic VLAN/port operations over a console session.

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use kiosk_terminal::{CliMode, TerminalError, TerminalSession};

use crate::commands::{
    build_access_vlan_cmd, build_create_vlan_cmd, build_select_interface_cmd,
    build_show_port_status_cmd, build_show_switchport_cmd, build_show_vlan_cmd, ACCESS_MODE_CMD,
    NO_SHUTDOWN_CMD, SHOW_ALL_PORTS_CMD, SHOW_VLAN_BRIEF_CMD,
};
use crate::error::{SwitchError, SwitchResult};
use crate::patterns::{
    classify_link_state, extract_port_vlan, parse_status_line, parse_vlan_brief_line, vlan_missing,
};
use crate::types::{PortStatus, SwitchInfo, VlanEntry};

/// Settle delay for configuration commands; these only echo a prompt.
const CONFIG_SETTLE: Duration = Duration::from_millis(300);

/// Switch configurator.
///
/// Owns the console session behind a mutex: the device accepts one
/// command at a time, so every public operation holds the lock for its
/// whole command sequence. Two concurrent callers can never interleave
/// at the byte level.
pub struct SwitchCtl {
    session: Mutex<TerminalSession>,
    enable_password: Option<String>,
}

impl SwitchCtl {
    /// Wraps a session (connected or not) in a configurator.
    pub fn new(session: TerminalSession) -> Self {
        Self {
            session: Mutex::new(session),
            enable_password: None,
        }
    }

    /// Sets the enable password used when the device prompts for one.
    pub fn with_enable_password(mut self, password: impl Into<String>) -> Self {
        self.enable_password = Some(password.into());
        self
    }

    /// True if a console session is currently open.
    pub fn is_connected(&self) -> bool {
        match self.session.try_lock() {
            Ok(session) => session.is_connected(),
            // Lock held means a command sequence is in flight, which
            // requires an open session.
            Err(_) => true,
        }
    }

    /// Opens the console transport.
    pub async fn connect(&self) -> SwitchResult<()> {
        let mut session = self.session.lock().await;
        session.connect().await?;
        Ok(())
    }

    /// Releases the console transport. Safe when already disconnected.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        session.disconnect();
    }

    /// Connects (if needed) and enters privileged EXEC mode.
    ///
    /// This is the setup step required before any reconciliation run.
    #[instrument(skip(self))]
    pub async fn prepare(&self) -> SwitchResult<()> {
        let mut session = self.session.lock().await;
        if !session.is_connected() {
            session.connect().await?;
        }
        self.ensure_privileged(&mut session).await
    }

    /// Checks whether a VLAN exists on the device.
    #[instrument(skip(self))]
    pub async fn vlan_exists(&self, vlan_id: &str) -> SwitchResult<bool> {
        let mut session = self.session.lock().await;
        self.vlan_exists_locked(&mut session, vlan_id).await
    }

    /// Creates a VLAN unless it already exists.
    ///
    /// Success is re-verified through the existence query; the command
    /// echo is not trusted.
    #[instrument(skip(self))]
    pub async fn create_vlan(&self, vlan_id: &str, name: Option<&str>) -> SwitchResult<()> {
        let mut session = self.session.lock().await;
        self.create_vlan_locked(&mut session, vlan_id, name).await
    }

    /// Binds a port to a VLAN as an access port and enables it.
    ///
    /// Ensures the VLAN exists first, failing fast with
    /// [`SwitchError::VlanUnavailable`] when it cannot be created.
    #[instrument(skip(self))]
    pub async fn assign_port_to_vlan(&self, port: &str, vlan_id: &str) -> SwitchResult<()> {
        let mut session = self.session.lock().await;
        self.assign_port_locked(&mut session, port, vlan_id).await
    }

    /// Returns the access VLAN of a port, when one can be extracted.
    #[instrument(skip(self))]
    pub async fn get_port_vlan(&self, port: &str) -> SwitchResult<Option<String>> {
        let mut session = self.session.lock().await;
        self.get_port_vlan_locked(&mut session, port).await
    }

    /// Returns link state and VLAN for a single port.
    #[instrument(skip(self))]
    pub async fn get_port_status(&self, port: &str) -> SwitchResult<PortStatus> {
        let mut session = self.session.lock().await;
        let response = session
            .send_default(&build_show_port_status_cmd(port))
            .await?;
        let status = classify_link_state(&response);
        let vlan = self.get_port_vlan_locked(&mut session, port).await?;
        Ok(PortStatus {
            port: port.to_string(),
            status,
            vlan,
        })
    }

    /// Returns status rows for every port visible in the bulk query.
    #[instrument(skip(self))]
    pub async fn list_all_ports_status(&self) -> SwitchResult<Vec<PortStatus>> {
        let mut session = self.session.lock().await;
        let response = session.send_default(SHOW_ALL_PORTS_CMD).await?;

        let parsed: Vec<_> = response.lines().filter_map(parse_status_line).collect();
        let mut ports = Vec::with_capacity(parsed.len());
        for (port, status) in parsed {
            let vlan = self.get_port_vlan_locked(&mut session, &port).await?;
            ports.push(PortStatus { port, status, vlan });
        }
        Ok(ports)
    }

    /// Returns the device's VLAN table.
    #[instrument(skip(self))]
    pub async fn list_vlans(&self) -> SwitchResult<Vec<VlanEntry>> {
        let mut session = self.session.lock().await;
        let response = session.send_default(SHOW_VLAN_BRIEF_CMD).await?;
        Ok(response.lines().filter_map(parse_vlan_brief_line).collect())
    }

    /// Aggregates the northbound status surface.
    ///
    /// Best-effort: query failures are logged and leave their section
    /// empty rather than failing the whole aggregate.
    pub async fn switch_info(&self) -> SwitchInfo {
        let mut info = SwitchInfo {
            connected: self.is_connected(),
            ..SwitchInfo::default()
        };
        if !info.connected {
            return info;
        }

        match self.list_all_ports_status().await {
            Ok(ports) => info.ports = ports,
            Err(e) => warn!(error = %e, "failed to collect port status"),
        }
        match self.list_vlans().await {
            Ok(vlans) => info.vlans = vlans,
            Err(e) => warn!(error = %e, "failed to collect VLAN table"),
        }
        info
    }

    async fn vlan_exists_locked(
        &self,
        session: &mut MutexGuard<'_, TerminalSession>,
        vlan_id: &str,
    ) -> SwitchResult<bool> {
        let response = session.send_default(&build_show_vlan_cmd(vlan_id)).await?;
        Ok(!vlan_missing(&response, vlan_id))
    }

    async fn create_vlan_locked(
        &self,
        session: &mut MutexGuard<'_, TerminalSession>,
        vlan_id: &str,
        name: Option<&str>,
    ) -> SwitchResult<()> {
        if self.vlan_exists_locked(session, vlan_id).await? {
            debug!(vlan = vlan_id, "VLAN already present");
            return Ok(());
        }

        self.ensure_privileged(session).await?;
        let entered = self.ensure_config(session).await?;

        let result = session
            .send(&build_create_vlan_cmd(vlan_id, name), CONFIG_SETTLE)
            .await;

        if entered {
            // Restore the prior mode before surfacing any send error.
            let _ = session.exit_config().await;
        }
        result?;

        if self.vlan_exists_locked(session, vlan_id).await? {
            info!(vlan = vlan_id, "created VLAN");
            Ok(())
        } else {
            Err(SwitchError::vlan_unavailable(vlan_id))
        }
    }

    async fn assign_port_locked(
        &self,
        session: &mut MutexGuard<'_, TerminalSession>,
        port: &str,
        vlan_id: &str,
    ) -> SwitchResult<()> {
        if let Err(e) = self.create_vlan_locked(session, vlan_id, None).await {
            if e.is_disconnected() {
                return Err(e);
            }
            warn!(vlan = vlan_id, error = %e, "VLAN unavailable, aborting port bind");
            return Err(SwitchError::vlan_unavailable(vlan_id));
        }

        self.ensure_privileged(session).await?;
        self.ensure_config(session).await?;

        let sequence = [
            build_select_interface_cmd(port),
            ACCESS_MODE_CMD.to_string(),
            build_access_vlan_cmd(vlan_id),
            NO_SHUTDOWN_CMD.to_string(),
        ];
        for command in &sequence {
            if let Err(e) = session.send(command, CONFIG_SETTLE).await {
                let _ = session.exit_config().await;
                return Err(SwitchError::port_failed(port, e.to_string()));
            }
        }

        session.exit_config().await?;
        info!(port = port, vlan = vlan_id, "bound port to VLAN");
        Ok(())
    }

    async fn get_port_vlan_locked(
        &self,
        session: &mut MutexGuard<'_, TerminalSession>,
        port: &str,
    ) -> SwitchResult<Option<String>> {
        let response = session
            .send_default(&build_show_switchport_cmd(port))
            .await?;
        Ok(extract_port_vlan(&response))
    }

    /// Re-probes the prompt and escalates to privileged EXEC if needed.
    ///
    /// A single unrecognized prompt triggers one more probe before the
    /// failure is surfaced; the line often carries stale bytes after an
    /// error.
    async fn ensure_privileged(
        &self,
        session: &mut MutexGuard<'_, TerminalSession>,
    ) -> SwitchResult<()> {
        let mode = match session.probe().await {
            Ok(mode) => mode,
            Err(TerminalError::ModeUnknown { .. }) => session.probe().await?,
            Err(e) => return Err(e.into()),
        };

        match mode {
            CliMode::PrivilegedExec | CliMode::GlobalConfig => Ok(()),
            CliMode::UserExec => {
                session
                    .enter_privileged(self.enable_password.as_deref())
                    .await?;
                Ok(())
            }
            CliMode::Disconnected => Err(TerminalError::NotConnected.into()),
        }
    }

    /// Enters config mode unless the prompt already shows it.
    ///
    /// Returns true if this call entered config mode (the caller is then
    /// responsible for restoring the prior mode).
    async fn ensure_config(
        &self,
        session: &mut MutexGuard<'_, TerminalSession>,
    ) -> SwitchResult<bool> {
        match session.probe().await {
            Ok(CliMode::GlobalConfig) => Ok(false),
            Ok(_) | Err(TerminalError::ModeUnknown { .. }) => {
                session.enter_config().await?;
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for SwitchCtl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchCtl")
            .field("connected", &self.is_connected())
            .finish()
    }
}
