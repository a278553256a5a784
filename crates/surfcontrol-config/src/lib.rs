//! Configuration for the surfcontrol daemon and CLI.
//!
//! Layered with figment: built-in defaults, then the TOML file, then
//! `SURFCONTROL_`-prefixed environment variables (`__` separates nested
//! keys, e.g. `SURFCONTROL_DEPLOY__BACKUP_RETENTION=5`). The result is
//! validated and translated into `surfcontrol_core::DaemonConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use surfcontrol_core::model::UnitNaming;
use surfcontrol_core::{
    DaemonConfig, DeployConfig, Generation, GeneratorOptions, ObservationConfig,
    SupervisorTimeouts,
};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SURFCONTROL_CONFIG";

/// Prefix for per-key environment overrides.
pub const ENV_PREFIX: &str = "SURFCONTROL_";

const SYSTEM_CONFIG: &str = "/etc/surfcontrol/config.toml";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,

    #[serde(default)]
    pub deploy: Deploy,

    #[serde(default)]
    pub supervisor: Supervisor,

    #[serde(default)]
    pub observation: Observation,

    #[serde(default)]
    pub subscribers: Subscribers,

    #[serde(default)]
    pub logging: Logging,
}

/// Host locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Paths {
    /// Directory the core reads its configuration from.
    pub artifact_dir: PathBuf,
    pub backup_dir: PathBuf,
    /// Directory the core writes its logs to.
    pub log_dir: PathBuf,
    pub diameter_dir: PathBuf,
    pub subscriber_db_uri: String,
}

impl Default for Paths {
    fn default() -> Self {
        let deploy = DeployConfig::default();
        Self {
            artifact_dir: deploy.artifact_dir,
            backup_dir: deploy.backup_dir,
            log_dir: deploy.generator.log_dir,
            diameter_dir: deploy.generator.diameter_dir,
            subscriber_db_uri: deploy.generator.subscriber_db_uri,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Deploy {
    /// Generation assumed running before the first deployment.
    pub generation: Generation,
    pub backup_retention: usize,
    pub unit_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Overrides every unit's settle delay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_ms: Option<u64>,
}

impl Default for Deploy {
    fn default() -> Self {
        Self {
            generation: Generation::FourG,
            backup_retention: 10,
            unit_timeout_secs: 30,
            poll_interval_ms: 500,
            settle_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Supervisor {
    pub binary: PathBuf,
    pub unit_prefix: String,
    pub unit_suffix: String,
    pub restart_timeout_secs: u64,
    pub stop_timeout_secs: u64,
    pub status_timeout_secs: u64,
}

impl Default for Supervisor {
    fn default() -> Self {
        let naming = UnitNaming::default();
        Self {
            binary: "systemctl".into(),
            unit_prefix: naming.prefix,
            unit_suffix: naming.suffix,
            restart_timeout_secs: 30,
            stop_timeout_secs: 30,
            status_timeout_secs: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Observation {
    pub interval_secs: u64,
    pub soft_deadline_secs: u64,
    pub tail_lines: usize,
}

impl Default for Observation {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            soft_deadline_secs: 4,
            tail_lines: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Subscribers {
    /// YAML file with display names and groups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    pub json: bool,
    /// Append logs to this file instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            file: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve which config file to read.
///
/// An explicit path wins, then `SURFCONTROL_CONFIG`, then an existing file
/// in the platform config directory, then `/etc/surfcontrol/config.toml`.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(path);
    }
    user_config_path()
        .filter(|p| p.exists())
        .unwrap_or_else(|| PathBuf::from(SYSTEM_CONFIG))
}

/// Per-user config location, if the platform has one.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("io", "waveriders", "surfcontrol")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

// ── Config loading ──────────────────────────────────────────────────

/// Load defaults, the TOML file at `path` (if present) and environment
/// overrides, then validate.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Reject values the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("deploy.unit_timeout_secs", self.deploy.unit_timeout_secs),
            ("deploy.poll_interval_ms", self.deploy.poll_interval_ms),
            (
                "supervisor.restart_timeout_secs",
                self.supervisor.restart_timeout_secs,
            ),
            (
                "supervisor.stop_timeout_secs",
                self.supervisor.stop_timeout_secs,
            ),
            (
                "supervisor.status_timeout_secs",
                self.supervisor.status_timeout_secs,
            ),
            ("observation.interval_secs", self.observation.interval_secs),
            (
                "observation.soft_deadline_secs",
                self.observation.soft_deadline_secs,
            ),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }
        if self.deploy.backup_retention == 0 {
            return Err(invalid("deploy.backup_retention", "must keep at least one backup"));
        }
        if self.observation.tail_lines == 0 {
            return Err(invalid("observation.tail_lines", "must be greater than zero"));
        }
        if self.observation.soft_deadline_secs > self.observation.interval_secs {
            return Err(invalid(
                "observation.soft_deadline_secs",
                format!(
                    "must not exceed observation.interval_secs ({})",
                    self.observation.interval_secs
                ),
            ));
        }
        if self.supervisor.binary.as_os_str().is_empty() {
            return Err(invalid("supervisor.binary", "must not be empty"));
        }
        Ok(())
    }

    /// Validate and translate into the daemon's runtime configuration.
    pub fn to_daemon_config(&self) -> Result<DaemonConfig, ConfigError> {
        self.validate()?;
        let deploy = DeployConfig {
            artifact_dir: self.paths.artifact_dir.clone(),
            backup_dir: self.paths.backup_dir.clone(),
            backup_retention: self.deploy.backup_retention,
            unit_timeout: Duration::from_secs(self.deploy.unit_timeout_secs),
            poll_interval: Duration::from_millis(self.deploy.poll_interval_ms),
            settle_override: self.deploy.settle_ms.map(Duration::from_millis),
            naming: UnitNaming {
                prefix: self.supervisor.unit_prefix.clone(),
                suffix: self.supervisor.unit_suffix.clone(),
            },
            timeouts: SupervisorTimeouts {
                restart: Duration::from_secs(self.supervisor.restart_timeout_secs),
                stop: Duration::from_secs(self.supervisor.stop_timeout_secs),
                status: Duration::from_secs(self.supervisor.status_timeout_secs),
            },
            generator: GeneratorOptions {
                log_dir: self.paths.log_dir.clone(),
                diameter_dir: self.paths.diameter_dir.clone(),
                subscriber_db_uri: self.paths.subscriber_db_uri.clone(),
            },
        };
        let observation = ObservationConfig {
            interval: Duration::from_secs(self.observation.interval_secs),
            soft_deadline: Duration::from_secs(self.observation.soft_deadline_secs),
            tail_lines: self.observation.tail_lines,
            log_dir: self.paths.log_dir.clone(),
            subscriber_file: self.subscribers.file.clone(),
        };
        Ok(DaemonConfig {
            generation: self.deploy.generation,
            supervisor_binary: self.supervisor.binary.clone(),
            deploy,
            observation,
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config saving ───────────────────────────────────────────────────

/// Write `cfg` as TOML to `path`, creating parent directories. Refuses to
/// overwrite an existing file unless `force` is set.
pub fn write_config(path: &Path, cfg: &Config, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, cfg.to_toml()?)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_runtime_defaults() {
        let daemon = Config::default().to_daemon_config().unwrap();
        assert_eq!(daemon, DaemonConfig::default());
    }

    #[test]
    fn explicit_path_wins() {
        let p = config_path(Some(Path::new("/tmp/custom.toml")));
        assert_eq!(p, PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut cfg = Config::default();
        cfg.observation.interval_secs = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("observation.interval_secs"), "{err}");
    }

    #[test]
    fn deadline_longer_than_interval_is_rejected() {
        let mut cfg = Config::default();
        cfg.observation.soft_deadline_secs = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn settle_and_naming_carry_over() {
        let mut cfg = Config::default();
        cfg.deploy.settle_ms = Some(0);
        cfg.supervisor.unit_prefix = "core-".into();
        cfg.supervisor.unit_suffix = String::new();
        let daemon = cfg.to_daemon_config().unwrap();
        assert_eq!(daemon.deploy.settle_override, Some(Duration::ZERO));
        assert_eq!(daemon.deploy.naming.unit_name(surfcontrol_core::Component::Mme), "core-mme");
    }
}
