// ── Controller facade ──
//
// Owns the orchestrator and the observation engine and exposes them
// through the `MobileCore` capability trait. The engine runs as a
// background task once `start()` is called; a one-shot CLI invocation can
// instead drive a single cycle with `observe_once()`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backup::BackupInfo;
use crate::config::DaemonConfig;
use crate::deploy::{DeployPhase, Orchestrator};
use crate::error::CoreError;
use crate::model::{
    BackupId, CoreHealth, DeploymentRecord, DeviceSnapshot, Generation, NetworkIntent,
    ObservationSnapshot, RadioSnapshot,
};
use crate::observe::ObservationEngine;
use crate::subscriber::{StaticDirectory, SubscriberDirectory, YamlFileDirectory};
use crate::supervisor::{ProcessSupervisor, SystemctlSupervisor};

// ── Capability interface ────────────────────────────────────────────

/// What a management layer can ask of a managed mobile core.
#[async_trait]
pub trait MobileCore: Send + Sync {
    async fn deploy(&self, intent: NetworkIntent) -> Result<DeploymentRecord, CoreError>;

    fn core_health(&self) -> CoreHealth;

    fn connected_radios(&self) -> Vec<RadioSnapshot>;

    fn connected_devices(&self) -> Vec<DeviceSnapshot>;

    async fn list_backups(&self) -> Result<Vec<BackupInfo>, CoreError>;

    async fn restore_backup(&self, id: &BackupId) -> Result<(), CoreError>;

    async fn deployment_history(&self) -> Vec<DeploymentRecord>;
}

// ── Controller ──────────────────────────────────────────────────────

/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: DaemonConfig,
    orchestrator: Orchestrator,
    snapshot: watch::Receiver<Arc<ObservationSnapshot>>,
    /// Present until `start()` moves it onto its task.
    engine: Mutex<Option<ObservationEngine>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Controller driving the host's `systemctl`.
    pub fn new(config: DaemonConfig) -> Self {
        let supervisor = Arc::new(SystemctlSupervisor::new(&config.supervisor_binary));
        Self::with_supervisor(config, supervisor)
    }

    pub fn with_supervisor(config: DaemonConfig, supervisor: Arc<dyn ProcessSupervisor>) -> Self {
        let orchestrator = Orchestrator::new(
            config.deploy.clone(),
            Arc::clone(&supervisor),
            config.generation,
        );
        let directory: Arc<dyn SubscriberDirectory> = match &config.observation.subscriber_file {
            Some(path) => Arc::new(YamlFileDirectory::new(path)),
            None => Arc::new(StaticDirectory::default()),
        };
        let engine = ObservationEngine::new(
            config.observation.clone(),
            config.deploy.naming.clone(),
            config.deploy.timeouts.status,
            supervisor,
            orchestrator.active_generation(),
        )
        .with_directory(directory);
        Self::from_parts(config, orchestrator, engine)
    }

    /// Assemble from pre-built parts. The engine should watch the
    /// orchestrator's active-generation signal.
    pub fn from_parts(
        config: DaemonConfig,
        orchestrator: Orchestrator,
        engine: ObservationEngine,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                config,
                orchestrator,
                snapshot: engine.subscribe(),
                engine: Mutex::new(Some(engine)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.inner.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Recover any interrupted artifact swap, then start the observation
    /// task.
    pub async fn start(&self) -> Result<(), CoreError> {
        let engine = self
            .inner
            .engine
            .lock()
            .await
            .take()
            .ok_or(CoreError::AlreadyStarted)?;

        if self
            .inner
            .orchestrator
            .recover()
            .await
            .map_err(CoreError::Recovery)?
        {
            info!("reinstated artifact directory after interrupted deployment");
        }

        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(engine.run(cancel));
        self.inner.task_handles.lock().await.push(handle);
        info!("controller started");
        Ok(())
    }

    /// Cancel background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                debug!(error = %e, "background task ended abnormally");
            }
        }
        info!("controller stopped");
    }

    /// Run one observation cycle in place when the engine is not running
    /// in the background; otherwise return the latest snapshot.
    pub async fn observe_once(&self) -> Arc<ObservationSnapshot> {
        let mut engine = self.inner.engine.lock().await;
        if let Some(engine) = engine.as_mut() {
            engine.run_cycle().await;
        }
        self.snapshot()
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<ObservationSnapshot> {
        Arc::clone(&self.inner.snapshot.borrow())
    }

    pub fn snapshots(&self) -> watch::Receiver<Arc<ObservationSnapshot>> {
        self.inner.snapshot.clone()
    }

    pub fn deploy_phase(&self) -> DeployPhase {
        *self.inner.orchestrator.phase().borrow()
    }

    pub fn active_generation(&self) -> Generation {
        *self.inner.orchestrator.active_generation().borrow()
    }
}

#[async_trait]
impl MobileCore for Controller {
    async fn deploy(&self, intent: NetworkIntent) -> Result<DeploymentRecord, CoreError> {
        Ok(self.inner.orchestrator.deploy(intent).await?)
    }

    fn core_health(&self) -> CoreHealth {
        self.snapshot().health.clone()
    }

    fn connected_radios(&self) -> Vec<RadioSnapshot> {
        self.snapshot().radios.clone()
    }

    fn connected_devices(&self) -> Vec<DeviceSnapshot> {
        self.snapshot().devices.clone()
    }

    async fn list_backups(&self) -> Result<Vec<BackupInfo>, CoreError> {
        Ok(self.inner.orchestrator.list_backups().await?)
    }

    async fn restore_backup(&self, id: &BackupId) -> Result<(), CoreError> {
        Ok(self.inner.orchestrator.restore_backup(id.clone()).await?)
    }

    async fn deployment_history(&self) -> Vec<DeploymentRecord> {
        self.inner.orchestrator.history().await
    }
}
