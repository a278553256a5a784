// ── Runtime daemon configuration ──
//
// Resolved settings for the orchestrator and the observation engine.
// Nothing here reads files or the environment: the binary builds a
// `DaemonConfig` (usually through `surfcontrol-config`) and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use crate::generate::GeneratorOptions;
use crate::model::{Generation, UnitNaming};

/// Per-call limits for supervisor operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTimeouts {
    pub restart: Duration,
    pub stop: Duration,
    pub status: Duration,
}

impl Default for SupervisorTimeouts {
    fn default() -> Self {
        Self {
            restart: Duration::from_secs(30),
            stop: Duration::from_secs(30),
            status: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    /// Directory the core reads its configuration files from.
    pub artifact_dir: PathBuf,
    pub backup_dir: PathBuf,
    /// Snapshots (and history records) kept after a successful deployment.
    pub backup_retention: usize,
    /// How long a unit may take to report active after a restart.
    pub unit_timeout: Duration,
    /// Gap between status polls while waiting for a unit.
    pub poll_interval: Duration,
    /// Replaces every unit's settle delay when set.
    pub settle_override: Option<Duration>,
    pub naming: UnitNaming,
    pub timeouts: SupervisorTimeouts,
    pub generator: GeneratorOptions,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("/etc/open5gs"),
            backup_dir: PathBuf::from("/var/lib/surfcontrol/backups"),
            backup_retention: 10,
            unit_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            settle_override: None,
            naming: UnitNaming::default(),
            timeouts: SupervisorTimeouts::default(),
            generator: GeneratorOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationConfig {
    pub interval: Duration,
    /// A cycle running longer than this is discarded.
    pub soft_deadline: Duration,
    /// Most lines read from one log source per cycle.
    pub tail_lines: usize,
    pub log_dir: PathBuf,
    /// YAML subscriber directory; `None` means no display names or groups.
    pub subscriber_file: Option<PathBuf>,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            soft_deadline: Duration::from_secs(4),
            tail_lines: 1000,
            log_dir: PathBuf::from("/var/log/open5gs"),
            subscriber_file: None,
        }
    }
}

/// Everything the [`Controller`](crate::Controller) needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Generation assumed active until the first successful deployment.
    pub generation: Generation,
    pub supervisor_binary: PathBuf,
    pub deploy: DeployConfig,
    pub observation: ObservationConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            generation: Generation::FourG,
            supervisor_binary: PathBuf::from("systemctl"),
            deploy: DeployConfig::default(),
            observation: ObservationConfig::default(),
        }
    }
}
