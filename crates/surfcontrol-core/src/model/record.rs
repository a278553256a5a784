// ── Deployment records ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;
use uuid::Uuid;

use super::intent::Generation;

/// Identifier of a backup snapshot. Derived from the UTC time the snapshot
/// was taken, so lexical order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupId(String);

impl BackupId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    RolledBack,
    Failed,
}

/// Why a deployment did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum DeployFailure {
    #[error("intent rejected: {}", .reasons.join("; "))]
    Validation { reasons: Vec<String> },

    #[error("artifact generation failed: {message}")]
    Generation { message: String },

    #[error("backup failed: {message}")]
    Backup { message: String },

    #[error("writing artifacts failed: {message}")]
    Write { message: String },

    #[error("unit {unit} did not become active (last status: {status})")]
    ServiceRestart { unit: String, status: String },

    #[error("restoring backup {backup} failed after '{cause}': {message}")]
    Restore {
        backup: String,
        cause: String,
        message: String,
    },
}

/// One deployment attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: Uuid,
    pub generation: Generation,
    pub backup: Option<BackupId>,
    /// Artifact file names the deployment wrote (or would have written).
    pub artifacts: Vec<String>,
    pub outcome: Outcome,
    pub failure: Option<DeployFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DeploymentRecord {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }

    /// Unit named by a restart failure, if that is how the deployment ended.
    pub fn failed_unit(&self) -> Option<&str> {
        match &self.failure {
            Some(DeployFailure::ServiceRestart { unit, .. }) => Some(unit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failure_lists_every_reason() {
        let f = DeployFailure::Validation {
            reasons: vec!["a".into(), "b".into()],
        };
        assert_eq!(f.to_string(), "intent rejected: a; b");
    }

    #[test]
    fn backup_ids_order_chronologically() {
        let older = BackupId::new("20260101T000000.000001Z");
        let newer = BackupId::new("20260101T000000.000002Z");
        assert!(older < newer);
    }
}
