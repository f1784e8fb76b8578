//! Probe and wake capabilities of the managed machine.
//!
//! [`CommandMachine`] drives the `fping` and `wakeonlan` executables. Time
//! bounds are applied by the controller, so implementations only need to be
//! cancellable (dropping the future must abandon the work).

use crate::config::MachineConfig;
use crate::WolError;
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

/// Marker `wakeonlan` prints when the target cannot be resolved.
const UNRESOLVABLE_TARGET: &str = "is not a hardware address";

/// What the status controller needs from a machine.
pub trait Machine: Send + Sync {
    /// Whether the machine answers a reachability probe. Failures map to `false`.
    fn probe(&self) -> impl Future<Output = bool> + Send;

    /// Dispatch a wake signal.
    ///
    /// # Errors
    /// * `WakeCommand` - the signal could not be dispatched (e.g. bad hardware address)
    fn wake(&self) -> impl Future<Output = Result<(), WolError>> + Send;
}

impl<M: Machine> Machine for Arc<M> {
    fn probe(&self) -> impl Future<Output = bool> + Send {
        (**self).probe()
    }

    fn wake(&self) -> impl Future<Output = Result<(), WolError>> + Send {
        (**self).wake()
    }
}

/// Machine controlled through external commands.
#[derive(Debug, Clone)]
pub struct CommandMachine {
    host: String,
    mac_address: String,
    ping_program: String,
    wake_program: String,
}

impl CommandMachine {
    /// Use `fping` and `wakeonlan` from `PATH`.
    pub fn new(host: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            mac_address: mac_address.into(),
            ping_program: "fping".to_string(),
            wake_program: "wakeonlan".to_string(),
        }
    }

    /// Build from the `machine` section of the configuration.
    pub fn from_config(config: &MachineConfig) -> Self {
        Self::new(config.host.clone(), config.mac_address.clone())
    }

    /// Override the executables (absolute paths, wrappers).
    pub fn with_programs(
        mut self,
        ping_program: impl Into<String>,
        wake_program: impl Into<String>,
    ) -> Self {
        self.ping_program = ping_program.into();
        self.wake_program = wake_program.into();
        self
    }

    /// Host being probed.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Hardware address being woken.
    pub fn mac_address(&self) -> &str {
        &self.mac_address
    }

    fn command(program: &str) -> Command {
        let mut command = Command::new(program);
        command
            .current_dir(std::env::temp_dir())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl Machine for CommandMachine {
    async fn probe(&self) -> bool {
        let status = Self::command(&self.ping_program)
            .args(["--count=1", "--period=100", "--reachable=1"])
            .arg(&self.host)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => {
                debug!(host = %self.host, code = ?status.code(), "probe finished");
                status.success()
            }
            Err(e) => {
                warn!(program = %self.ping_program, error = %e, "failed to run probe");
                false
            }
        }
    }

    async fn wake(&self) -> Result<(), WolError> {
        let output = Self::command(&self.wake_program)
            .arg(&self.mac_address)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                WolError::WakeCommand(format!("failed to run {}: {}", self.wake_program, e))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() || stderr.contains(UNRESOLVABLE_TARGET) {
            return Err(WolError::WakeCommand(format!(
                "{} encountered an error (exit={:?}, err='{}')",
                self.wake_program,
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Scripted machine for deterministic tests.
///
/// Counts invocations and returns whatever it was told to.
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug, Default)]
pub struct ScriptedMachine {
    reachable: std::sync::atomic::AtomicBool,
    wake_fails: std::sync::atomic::AtomicBool,
    probes: std::sync::atomic::AtomicUsize,
    wakes: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-seams"))]
impl ScriptedMachine {
    /// An unreachable machine whose wake succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result of subsequent probes.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable
            .store(reachable, std::sync::atomic::Ordering::SeqCst);
    }

    /// Make subsequent wakes fail.
    pub fn set_wake_fails(&self, fails: bool) {
        self.wake_fails
            .store(fails, std::sync::atomic::Ordering::SeqCst);
    }

    /// Number of probes performed.
    pub fn probe_count(&self) -> usize {
        self.probes.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Number of wakes attempted.
    pub fn wake_count(&self) -> usize {
        self.wakes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl Machine for ScriptedMachine {
    async fn probe(&self) -> bool {
        self.probes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.reachable.load(std::sync::atomic::Ordering::SeqCst)
    }

    async fn wake(&self) -> Result<(), WolError> {
        let attempt = self.wakes.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        if self.wake_fails.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(WolError::WakeCommand(format!(
                "scripted failure on attempt {}",
                attempt
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let machine = CommandMachine::from_config(&MachineConfig {
            host: "192.0.2.10".to_string(),
            mac_address: "00:11:22:33:44:55".to_string(),
        });
        assert_eq!(machine.host(), "192.0.2.10");
        assert_eq!(machine.mac_address(), "00:11:22:33:44:55");
    }

    #[tokio::test]
    async fn test_missing_probe_program_is_unreachable() {
        let machine = CommandMachine::new("192.0.2.10", "00:11:22:33:44:55")
            .with_programs("/nonexistent/wolgate-fping", "/nonexistent/wolgate-wakeonlan");
        assert!(!machine.probe().await);
    }

    #[tokio::test]
    async fn test_missing_wake_program_is_error() {
        let machine = CommandMachine::new("192.0.2.10", "00:11:22:33:44:55")
            .with_programs("/nonexistent/wolgate-fping", "/nonexistent/wolgate-wakeonlan");
        assert!(matches!(
            machine.wake().await,
            Err(WolError::WakeCommand(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_codes() {
        let ok = CommandMachine::new("ignored", "ignored").with_programs("true", "true");
        assert!(ok.probe().await);
        assert!(ok.wake().await.is_ok());

        let failing = CommandMachine::new("ignored", "ignored").with_programs("false", "false");
        assert!(!failing.probe().await);
        assert!(matches!(
            failing.wake().await,
            Err(WolError::WakeCommand(_))
        ));
    }

    #[tokio::test]
    async fn test_scripted_machine_counts() {
        let machine = ScriptedMachine::new();
        assert!(!machine.probe().await);
        machine.set_reachable(true);
        assert!(machine.probe().await);
        assert_eq!(machine.probe_count(), 2);

        machine.set_wake_fails(true);
        assert!(machine.wake().await.is_err());
        assert_eq!(machine.wake_count(), 1);
    }
}
