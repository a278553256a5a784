// ── Process supervisor gateway ──
//
// Restart, stop and query named service units. Every call carries its own
// timeout; running out of time is an error, never a hang.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use strum::Display;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::model::HealthState;

/// State of a unit as reported by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnitStatus {
    Active,
    Activating,
    Deactivating,
    Inactive,
    Failed,
    NotFound,
    Unknown,
}

impl UnitStatus {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    pub fn health(self) -> HealthState {
        match self {
            Self::Active => HealthState::Healthy,
            Self::Activating | Self::Deactivating => HealthState::Degraded,
            Self::Inactive | Self::Failed | Self::NotFound | Self::Unknown => HealthState::Down,
        }
    }
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("{action} {unit} timed out after {}", humantime::format_duration(*.timeout))]
    Timeout {
        unit: String,
        action: &'static str,
        timeout: Duration,
    },

    #[error("could not run supervisor for {action} {unit}: {source}")]
    Spawn {
        unit: String,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{action} {unit} failed ({}): {stderr}", exit_text(*.code))]
    CommandFailed {
        unit: String,
        action: &'static str,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_text(code: Option<i32>) -> String {
    code.map_or_else(|| "killed by signal".to_owned(), |c| format!("exit {c}"))
}

/// The three operations the daemon needs from a process supervisor.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    async fn restart(&self, unit: &str, timeout: Duration) -> Result<(), SupervisorError>;

    async fn stop(&self, unit: &str, timeout: Duration) -> Result<(), SupervisorError>;

    async fn status(&self, unit: &str, timeout: Duration) -> Result<UnitStatus, SupervisorError>;

    async fn is_active(&self, unit: &str, timeout: Duration) -> Result<bool, SupervisorError> {
        Ok(self.status(unit, timeout).await?.is_active())
    }
}

// ── systemctl ───────────────────────────────────────────────────────

/// Supervisor backed by the `systemctl` command line.
#[derive(Debug, Clone)]
pub struct SystemctlSupervisor {
    binary: PathBuf,
}

impl Default for SystemctlSupervisor {
    fn default() -> Self {
        Self::new("systemctl")
    }
}

impl SystemctlSupervisor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(
        &self,
        action: &'static str,
        unit: &str,
        timeout: Duration,
    ) -> Result<std::process::Output, SupervisorError> {
        debug!(action, unit, "invoking supervisor");
        let child = Command::new(&self.binary)
            .arg(action)
            .arg(unit)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                unit: unit.to_owned(),
                action,
                source,
            })?;

        tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| SupervisorError::Timeout {
                unit: unit.to_owned(),
                action,
                timeout,
            })?
            .map_err(|source| SupervisorError::Spawn {
                unit: unit.to_owned(),
                action,
                source,
            })
    }

    async fn run_checked(
        &self,
        action: &'static str,
        unit: &str,
        timeout: Duration,
    ) -> Result<(), SupervisorError> {
        let output = self.run(action, unit, timeout).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(SupervisorError::CommandFailed {
                unit: unit.to_owned(),
                action,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

#[async_trait]
impl ProcessSupervisor for SystemctlSupervisor {
    async fn restart(&self, unit: &str, timeout: Duration) -> Result<(), SupervisorError> {
        self.run_checked("restart", unit, timeout).await
    }

    async fn stop(&self, unit: &str, timeout: Duration) -> Result<(), SupervisorError> {
        self.run_checked("stop", unit, timeout).await
    }

    async fn status(&self, unit: &str, timeout: Duration) -> Result<UnitStatus, SupervisorError> {
        // `is-active` exits non-zero for anything but active; the answer is
        // on stdout either way.
        let output = self.run("is-active", unit, timeout).await?;
        Ok(parse_is_active(
            &String::from_utf8_lossy(&output.stdout),
            output.status.code(),
        ))
    }
}

/// Interpret `systemctl is-active` output.
pub fn parse_is_active(stdout: &str, code: Option<i32>) -> UnitStatus {
    match stdout.trim() {
        "active" | "reloading" => UnitStatus::Active,
        "activating" => UnitStatus::Activating,
        "deactivating" => UnitStatus::Deactivating,
        "inactive" if code == Some(4) => UnitStatus::NotFound,
        "inactive" => UnitStatus::Inactive,
        "failed" => UnitStatus::Failed,
        "unknown" => UnitStatus::NotFound,
        _ if code == Some(4) => UnitStatus::NotFound,
        _ => UnitStatus::Unknown,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn is_active_output() {
        assert_eq!(parse_is_active("active\n", Some(0)), UnitStatus::Active);
        assert_eq!(parse_is_active("activating\n", Some(3)), UnitStatus::Activating);
        assert_eq!(parse_is_active("inactive\n", Some(3)), UnitStatus::Inactive);
        assert_eq!(parse_is_active("failed\n", Some(3)), UnitStatus::Failed);
    }

    #[test]
    fn missing_units() {
        assert_eq!(parse_is_active("inactive\n", Some(4)), UnitStatus::NotFound);
        assert_eq!(parse_is_active("unknown\n", Some(3)), UnitStatus::NotFound);
        assert_eq!(parse_is_active("", Some(4)), UnitStatus::NotFound);
        assert_eq!(parse_is_active("", None), UnitStatus::Unknown);
    }

    #[test]
    fn health_mapping() {
        assert_eq!(UnitStatus::Active.health(), HealthState::Healthy);
        assert_eq!(UnitStatus::Activating.health(), HealthState::Degraded);
        assert_eq!(UnitStatus::Failed.health(), HealthState::Down);
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let sup = SystemctlSupervisor::new("/nonexistent/surfcontrol-systemctl");
        let err = sup
            .restart("open5gs-mmed", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn { action: "restart", .. }));
    }
}
