// ── Core error types ──
//
// Facade-level failures surfaced by `Controller`. Deployment failures
// past the lock are not errors: they come back as records with an
// outcome and a `DeployFailure`.

use thiserror::Error;

use crate::backup::BackupError;
use crate::deploy::{DeployError, RestoreError};
use crate::model::BackupId;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Concurrency ──────────────────────────────────────────────────
    #[error("a deployment is already in progress")]
    DeployInProgress,

    // ── Backups ──────────────────────────────────────────────────────
    #[error("backup not found: {id}")]
    BackupNotFound { id: BackupId },

    #[error("backup error: {0}")]
    Backup(#[source] BackupError),

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("controller already started")]
    AlreadyStarted,

    #[error("startup recovery failed: {0}")]
    Recovery(#[source] std::io::Error),

    // ── Internal ─────────────────────────────────────────────────────
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BackupError> for CoreError {
    fn from(err: BackupError) -> Self {
        match err {
            BackupError::NotFound(id) => CoreError::BackupNotFound { id },
            other => CoreError::Backup(other),
        }
    }
}

impl From<DeployError> for CoreError {
    fn from(err: DeployError) -> Self {
        match err {
            DeployError::InProgress => CoreError::DeployInProgress,
            DeployError::Aborted(msg) => CoreError::Internal(msg),
        }
    }
}

impl From<RestoreError> for CoreError {
    fn from(err: RestoreError) -> Self {
        match err {
            RestoreError::InProgress => CoreError::DeployInProgress,
            RestoreError::Backup(e) => e.into(),
        }
    }
}
