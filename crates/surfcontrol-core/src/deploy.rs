// ── Deployment orchestrator ──
//
// Validate → generate → back up → swap artifacts in → restart units in
// dependency order. Any failure after the backup rolls the directory back;
// a restart failure also stops every unit this deployment brought up.
//
// One deployment at a time: a second caller is turned away, not queued.
// The pipeline runs on its own task, so dropping the caller's future does
// not interrupt a deployment halfway through its restarts.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backup::{BackupError, BackupInfo, BackupStore};
use crate::config::DeployConfig;
use crate::fsutil;
use crate::generate::generate_with;
use crate::model::{
    BackupId, Component, ComponentArtifact, DeployFailure, DeploymentRecord, Generation,
    NetworkIntent, Outcome, ServiceUnit, restart_order, service_units,
};
use crate::supervisor::ProcessSupervisor;
use crate::validate::validate;

/// Written next to the artifacts; names the generation they configure.
/// It is backed up and restored with them.
pub const GENERATION_MARKER: &str = ".surfcontrol-generation";

/// Where a deployment currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeployPhase {
    Idle,
    Validating,
    Generating,
    BackingUp,
    Writing,
    Restarting,
    RollingBack,
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("a deployment is already in progress")]
    InProgress,

    #[error("deployment task aborted: {0}")]
    Aborted(String),
}

// ── Orchestrator ────────────────────────────────────────────────────

/// Cheaply cloneable handle; clones share the same lock, phase and history.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    config: DeployConfig,
    supervisor: Arc<dyn ProcessSupervisor>,
    backups: BackupStore,
    guard: Arc<Mutex<()>>,
    phase: watch::Sender<DeployPhase>,
    active_generation: watch::Sender<Generation>,
    history: Mutex<VecDeque<DeploymentRecord>>,
}

impl Orchestrator {
    pub fn new(
        config: DeployConfig,
        supervisor: Arc<dyn ProcessSupervisor>,
        initial_generation: Generation,
    ) -> Self {
        let backups = BackupStore::new(&config.backup_dir, &config.artifact_dir);
        let generation = match installed_generation(&config.artifact_dir) {
            Some(found) => {
                debug!(generation = %found, "found installed artifacts");
                found
            }
            None => initial_generation,
        };
        let (phase, _) = watch::channel(DeployPhase::Idle);
        let (active_generation, _) = watch::channel(generation);
        Self {
            inner: Arc::new(OrchestratorInner {
                config,
                supervisor,
                backups,
                guard: Arc::new(Mutex::new(())),
                phase,
                active_generation,
                history: Mutex::new(VecDeque::new()),
            }),
        }
    }

    pub fn config(&self) -> &DeployConfig {
        &self.inner.config
    }

    pub fn backups(&self) -> &BackupStore {
        &self.inner.backups
    }

    pub fn phase(&self) -> watch::Receiver<DeployPhase> {
        self.inner.phase.subscribe()
    }

    /// Generation of the installed artifacts: the last successful
    /// deployment or restore, else what the artifact directory holds at
    /// construction, else the configured initial generation.
    pub fn active_generation(&self) -> watch::Receiver<Generation> {
        self.inner.active_generation.subscribe()
    }

    /// Finish or undo a directory swap interrupted by a crash.
    pub async fn recover(&self) -> io::Result<bool> {
        let dir = self.inner.config.artifact_dir.clone();
        let recovered = blocking(move || fsutil::recover(&dir)).await?;
        if recovered {
            self.inner.reload_generation().await;
        }
        Ok(recovered)
    }

    /// Run one deployment to completion.
    ///
    /// Every attempt that gets past the lock produces a record, including
    /// failed and rolled-back ones; `Err` means the attempt never started.
    pub async fn deploy(&self, intent: NetworkIntent) -> Result<DeploymentRecord, DeployError> {
        let Ok(guard) = Arc::clone(&self.inner.guard).try_lock_owned() else {
            warn!("deployment rejected: another deployment is in progress");
            return Err(DeployError::InProgress);
        };

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let _guard = guard;
            let record = inner.run(&intent).await;
            inner.set_phase(DeployPhase::Idle);
            inner.remember(record.clone()).await;
            record
        });

        task.await.map_err(|e| {
            self.inner.set_phase(DeployPhase::Idle);
            DeployError::Aborted(e.to_string())
        })
    }

    /// Records of recent deployments, newest first.
    pub async fn history(&self) -> Vec<DeploymentRecord> {
        self.inner.history.lock().await.iter().rev().cloned().collect()
    }

    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>, BackupError> {
        let store = self.inner.backups.clone();
        blocking(move || store.list()).await
    }

    /// Restore a snapshot outside of a deployment. Shares the deployment
    /// lock, so it cannot interleave with one.
    pub async fn restore_backup(&self, id: BackupId) -> Result<(), RestoreError> {
        let Ok(_guard) = self.inner.guard.try_lock() else {
            return Err(RestoreError::InProgress);
        };
        let store = self.inner.backups.clone();
        blocking(move || store.restore(&id)).await?;
        self.inner.reload_generation().await;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("a deployment is in progress")]
    InProgress,

    #[error(transparent)]
    Backup(#[from] BackupError),
}

// ── Pipeline ────────────────────────────────────────────────────────

/// State carried through one run, turned into a record at the end.
struct Attempt {
    started_at: DateTime<Utc>,
    generation: Generation,
    backup: Option<BackupId>,
    artifacts: Vec<String>,
}

impl Attempt {
    fn finish(self, outcome: Outcome, failure: Option<DeployFailure>) -> DeploymentRecord {
        DeploymentRecord {
            id: Uuid::new_v4(),
            generation: self.generation,
            backup: self.backup,
            artifacts: self.artifacts,
            outcome,
            failure,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

impl OrchestratorInner {
    fn set_phase(&self, phase: DeployPhase) {
        debug!(%phase, "deploy phase");
        self.phase.send_replace(phase);
    }

    /// Re-read the installed generation after the artifact directory was
    /// replaced behind the pipeline's back.
    async fn reload_generation(&self) {
        let dir = self.config.artifact_dir.clone();
        let found = tokio::task::spawn_blocking(move || installed_generation(&dir))
            .await
            .ok()
            .flatten();
        if let Some(generation) = found {
            info!(%generation, "active generation now follows the artifact directory");
            self.active_generation.send_replace(generation);
        }
    }

    async fn remember(&self, record: DeploymentRecord) {
        let cap = self.config.backup_retention.max(1);
        let mut history = self.history.lock().await;
        history.push_back(record);
        while history.len() > cap {
            history.pop_front();
        }
    }

    async fn run(&self, intent: &NetworkIntent) -> DeploymentRecord {
        let mut attempt = Attempt {
            started_at: Utc::now(),
            generation: intent.generation,
            backup: None,
            artifacts: Vec::new(),
        };
        info!(generation = %intent.generation, "deployment started");

        // 1. Validate
        self.set_phase(DeployPhase::Validating);
        let validation = validate(intent);
        if !validation.ok() {
            warn!(reasons = ?validation.reasons, "intent rejected");
            return attempt.finish(
                Outcome::Failed,
                Some(DeployFailure::Validation {
                    reasons: validation.reasons,
                }),
            );
        }

        // 2. Generate, and resolve the restart order while nothing has
        // been touched yet.
        self.set_phase(DeployPhase::Generating);
        let artifacts = match generate_with(intent, &self.config.generator) {
            Ok(a) => a,
            Err(e) => return generation_failed(attempt, &e),
        };
        attempt.artifacts = artifacts.values().map(|a| a.file_name.clone()).collect();

        let units = service_units(
            intent.generation,
            &self.config.naming,
            self.config.settle_override,
        );
        let order: Vec<ServiceUnit> = match restart_order(&units) {
            Ok(order) => order.into_iter().cloned().collect(),
            Err(e) => return generation_failed(attempt, &e),
        };

        // 3. Back up
        self.set_phase(DeployPhase::BackingUp);
        let store = self.backups.clone();
        let backup = match blocking(move || store.snapshot()).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "backup failed");
                return attempt.finish(
                    Outcome::Failed,
                    Some(DeployFailure::Backup {
                        message: e.to_string(),
                    }),
                );
            }
        };
        attempt.backup = Some(backup.clone());

        // 4. Write
        self.set_phase(DeployPhase::Writing);
        let dir = self.config.artifact_dir.clone();
        let generation = intent.generation;
        if let Err(e) = blocking(move || write_artifacts(&dir, generation, &artifacts)).await {
            error!(error = %e, "writing artifacts failed");
            let failure = DeployFailure::Write {
                message: e.to_string(),
            };
            return self.roll_back(attempt, &backup, &[], failure).await;
        }

        // 5. Restart
        self.set_phase(DeployPhase::Restarting);
        let mut started: Vec<&ServiceUnit> = Vec::with_capacity(order.len());
        for unit in &order {
            if let Err(failure) = self.bring_up(unit, &order).await {
                return self.roll_back(attempt, &backup, &started, failure).await;
            }
            started.push(unit);
            if !unit.settle.is_zero() {
                tokio::time::sleep(unit.settle).await;
            }
        }

        // 6. Commit
        self.active_generation.send_replace(intent.generation);
        let store = self.backups.clone();
        let keep = self.config.backup_retention;
        match blocking(move || store.prune(keep)).await {
            Ok(removed) if !removed.is_empty() => {
                debug!(count = removed.len(), "pruned old backups");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "backup pruning failed"),
        }
        info!(backup = %backup, "deployment succeeded");
        attempt.finish(Outcome::Succeeded, None)
    }

    /// Wait for the unit's dependencies, restart it, wait for it.
    async fn bring_up(&self, unit: &ServiceUnit, all: &[ServiceUnit]) -> Result<(), DeployFailure> {
        for dep in &unit.depends_on {
            let Some(dep_unit) = all.iter().find(|u| u.component == *dep) else {
                continue;
            };
            self.wait_active(&dep_unit.name)
                .await
                .map_err(|status| DeployFailure::ServiceRestart {
                    unit: dep_unit.name.clone(),
                    status,
                })?;
        }

        info!(unit = %unit.name, "restarting unit");
        self.supervisor
            .restart(&unit.name, self.config.timeouts.restart)
            .await
            .map_err(|e| DeployFailure::ServiceRestart {
                unit: unit.name.clone(),
                status: e.to_string(),
            })?;

        self.wait_active(&unit.name)
            .await
            .map_err(|status| DeployFailure::ServiceRestart {
                unit: unit.name.clone(),
                status,
            })
    }

    /// Poll until the unit reports active. On timeout, returns the last
    /// status seen.
    async fn wait_active(&self, name: &str) -> Result<(), String> {
        let deadline = Instant::now() + self.config.unit_timeout;
        loop {
            let last = match self.supervisor.status(name, self.config.timeouts.status).await {
                Ok(status) if status.is_active() => return Ok(()),
                Ok(status) => status.to_string(),
                Err(e) => e.to_string(),
            };
            if Instant::now() + self.config.poll_interval > deadline {
                warn!(unit = name, status = %last, "unit did not become active in time");
                return Err(last);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn roll_back(
        &self,
        attempt: Attempt,
        backup: &BackupId,
        started: &[&ServiceUnit],
        cause: DeployFailure,
    ) -> DeploymentRecord {
        self.set_phase(DeployPhase::RollingBack);
        warn!(error = %cause, started = started.len(), "rolling back deployment");

        for unit in started.iter().rev() {
            info!(unit = %unit.name, "stopping unit");
            if let Err(e) = self.supervisor.stop(&unit.name, self.config.timeouts.stop).await {
                warn!(unit = %unit.name, error = %e, "stop during rollback failed");
            }
        }

        let store = self.backups.clone();
        let id = backup.clone();
        match blocking(move || store.restore(&id)).await {
            Ok(()) => attempt.finish(Outcome::RolledBack, Some(cause)),
            Err(e) => {
                error!(backup = %backup, error = %e, "restoring backup failed");
                attempt.finish(
                    Outcome::Failed,
                    Some(DeployFailure::Restore {
                        backup: backup.to_string(),
                        cause: cause.to_string(),
                        message: e.to_string(),
                    }),
                )
            }
        }
    }
}

fn generation_failed(attempt: Attempt, err: &dyn std::error::Error) -> DeploymentRecord {
    error!(error = %err, "artifact generation failed");
    attempt.finish(
        Outcome::Failed,
        Some(DeployFailure::Generation {
            message: err.to_string(),
        }),
    )
}

/// Stage a copy of `dir` with the artifacts written over it, then swap it
/// into place. On error `dir` is untouched.
fn write_artifacts(
    dir: &Path,
    generation: Generation,
    artifacts: &BTreeMap<Component, ComponentArtifact>,
) -> io::Result<()> {
    let staging = fsutil::staging_path(dir);
    let staged = stage_artifacts(dir, &staging, generation, artifacts)
        .and_then(|()| fsutil::swap_dir(dir, &staging));
    if staged.is_err() {
        let _ = fs::remove_dir_all(&staging);
    }
    staged
}

fn stage_artifacts(
    dir: &Path,
    staging: &Path,
    generation: Generation,
    artifacts: &BTreeMap<Component, ComponentArtifact>,
) -> io::Result<()> {
    if dir.exists() {
        fsutil::copy_tree(dir, staging)?;
    } else {
        fs::create_dir_all(staging)?;
    }
    for artifact in artifacts.values() {
        fs::write(staging.join(&artifact.file_name), &artifact.content)?;
    }
    fs::write(staging.join(GENERATION_MARKER), format!("{generation}\n"))
}

/// Generation configured by the artifacts in `dir`.
///
/// The marker decides when present. Directories written before it existed
/// are judged by which mobility function has a configuration file.
pub fn installed_generation(dir: &Path) -> Option<Generation> {
    if let Ok(text) = fs::read_to_string(dir.join(GENERATION_MARKER)) {
        match text.trim().parse() {
            Ok(generation) => return Some(generation),
            Err(_) => warn!(marker = %text.trim(), "ignoring unreadable generation marker"),
        }
    }
    let has = |c: Component| dir.join(c.artifact_file_name()).is_file();
    match (has(Component::Mme), has(Component::Amf)) {
        (true, false) => Some(Generation::FourG),
        (false, true) => Some(Generation::FiveG),
        _ => None,
    }
}

/// Run blocking filesystem work off the async workers.
async fn blocking<T, E, F>(f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<JoinError> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
