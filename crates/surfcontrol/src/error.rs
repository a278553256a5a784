//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use surfcontrol_config::ConfigError;
use surfcontrol_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const VALIDATION: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Intent ───────────────────────────────────────────────────────

    #[error("Cannot read intent {path}")]
    #[diagnostic(
        code(surfcontrol::intent_unreadable),
        help("Check the path and that the file is valid YAML or JSON.")
    )]
    IntentUnreadable {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Intent rejected:\n  - {}", .reasons.join("\n  - "))]
    #[diagnostic(
        code(surfcontrol::intent_rejected),
        help("Fix the listed fields and run: surfcontrol validate <INTENT>")
    )]
    IntentRejected { reasons: Vec<String> },

    #[error("Artifact generation failed: {message}")]
    #[diagnostic(code(surfcontrol::generation))]
    Generation { message: String },

    // ── Deployment ───────────────────────────────────────────────────

    #[error("A deployment is already in progress")]
    #[diagnostic(
        code(surfcontrol::deploy_in_progress),
        help("Wait for the running deployment to finish, then retry.")
    )]
    DeployInProgress,

    #[error("Deployment {outcome}: {reason}")]
    #[diagnostic(
        code(surfcontrol::deploy_failed),
        help("Run: surfcontrol status health\nBackups: surfcontrol backups list")
    )]
    DeployFailed { outcome: String, reason: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(surfcontrol::not_found),
        help("Run: surfcontrol {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(surfcontrol::conflict), help("Pass --force to overwrite it."))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(surfcontrol::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(
        code(surfcontrol::config),
        help("Check the file shown by: surfcontrol config path")
    )]
    Config(Box<ConfigError>),

    // ── Core ─────────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(surfcontrol::core))]
    Core { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(surfcontrol::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::IntentUnreadable { .. } | Self::IntentRejected { .. } => exit_code::VALIDATION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::DeployInProgress | Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::AlreadyExists(path) => CliError::Conflict {
                resource_type: "config file".into(),
                identifier: path.display().to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeployInProgress => CliError::DeployInProgress,
            CoreError::BackupNotFound { id } => CliError::NotFound {
                resource_type: "backup".into(),
                identifier: id.to_string(),
                list_command: "backups list".into(),
            },
            other => CliError::Core {
                message: other.to_string(),
            },
        }
    }
}
