// Shared fakes for the integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use surfcontrol_core::model::Component;
use surfcontrol_core::{
    DeployConfig, LogSource, LogSourceError, NetworkIntent, ProcessSupervisor, SupervisorError,
    UnitStatus,
};

// ── Supervisor ──────────────────────────────────────────────────────

/// In-memory supervisor. Restarted units report active unless listed in
/// `failing`, in which case they report failed.
#[derive(Default)]
pub struct FakeSupervisor {
    units: Mutex<HashMap<String, UnitStatus>>,
    calls: Mutex<Vec<(&'static str, String)>>,
    failing: Mutex<Vec<String>>,
    restart_delay: Mutex<Duration>,
    status_delay: Mutex<Duration>,
}

impl FakeSupervisor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_unit(&self, unit: &str) {
        self.failing.lock().unwrap().push(unit.to_owned());
    }

    pub fn set_status(&self, unit: &str, status: UnitStatus) {
        self.units.lock().unwrap().insert(unit.to_owned(), status);
    }

    pub fn set_restart_delay(&self, delay: Duration) {
        *self.restart_delay.lock().unwrap() = delay;
    }

    pub fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self, action: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| *a == action)
            .map(|(_, u)| u.clone())
            .collect()
    }

    fn record(&self, action: &'static str, unit: &str) {
        self.calls.lock().unwrap().push((action, unit.to_owned()));
    }
}

#[async_trait]
impl ProcessSupervisor for FakeSupervisor {
    async fn restart(&self, unit: &str, _timeout: Duration) -> Result<(), SupervisorError> {
        self.record("restart", unit);
        let delay = *self.restart_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let status = if self.failing.lock().unwrap().iter().any(|f| f == unit) {
            UnitStatus::Failed
        } else {
            UnitStatus::Active
        };
        self.set_status(unit, status);
        Ok(())
    }

    async fn stop(&self, unit: &str, _timeout: Duration) -> Result<(), SupervisorError> {
        self.record("stop", unit);
        self.set_status(unit, UnitStatus::Inactive);
        Ok(())
    }

    async fn status(&self, unit: &str, timeout: Duration) -> Result<UnitStatus, SupervisorError> {
        let delay = *self.status_delay.lock().unwrap();
        if !delay.is_zero() {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(SupervisorError::Timeout {
                    unit: unit.to_owned(),
                    action: "is-active",
                    timeout,
                });
            }
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .units
            .lock()
            .unwrap()
            .get(unit)
            .copied()
            .unwrap_or(UnitStatus::Inactive))
    }
}

// ── Log sources ─────────────────────────────────────────────────────

/// Log source fed by the test through a shared queue.
#[derive(Clone)]
pub struct ScriptedSource {
    component: Component,
    queue: Arc<Mutex<VecDeque<String>>>,
    broken: Arc<Mutex<bool>>,
}

impl ScriptedSource {
    pub fn new(component: Component) -> Self {
        Self {
            component,
            queue: Arc::default(),
            broken: Arc::default(),
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        self.queue.lock().unwrap().push_back(line.into());
    }

    pub fn set_broken(&self, broken: bool) {
        *self.broken.lock().unwrap() = broken;
    }

    pub fn boxed(&self) -> Box<dyn LogSource> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl LogSource for ScriptedSource {
    fn component(&self) -> Component {
        self.component
    }

    async fn read_new(&mut self) -> Result<Vec<String>, LogSourceError> {
        if *self.broken.lock().unwrap() {
            return Err(LogSourceError {
                path: format!("{}.log", self.component).into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        Ok(self.queue.lock().unwrap().drain(..).collect())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub const INTENT_4G: &str = r#"
generation: 4G
identity:
  country_code: "315"
  network_code: "010"
  area_code: 1
  network_name: Test Network
addressing:
  core_address: 10.48.0.5
  device_pool: 10.48.99.0/24
  device_gateway: 10.48.99.1
  dns_servers: ["8.8.8.8", "8.8.4.4"]
radio:
  apn: internet
  frequency_band: CBRS_Band48
service_quality: standard
"#;

pub const INTENT_5G: &str = r#"
generation: 5G
identity:
  country_code: "315"
  network_code: "010"
  area_code: 1
  network_name: Test Network
addressing:
  core_address: 10.48.0.5
  device_pool: 10.48.99.0/24
  device_gateway: 10.48.99.1
radio:
  apn: internet
  frequency_band: n78
  network_slice:
    service_type: 1
    slice_id: "000001"
"#;

pub fn intent_4g() -> NetworkIntent {
    NetworkIntent::from_yaml(INTENT_4G).unwrap()
}

pub fn intent_5g() -> NetworkIntent {
    NetworkIntent::from_yaml(INTENT_5G).unwrap()
}

/// Deploy settings rooted in `root`, with short waits and no settle delay.
pub fn deploy_config(root: &Path) -> DeployConfig {
    DeployConfig {
        artifact_dir: root.join("etc"),
        backup_dir: root.join("backups"),
        backup_retention: 3,
        unit_timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(10),
        settle_override: Some(Duration::ZERO),
        ..DeployConfig::default()
    }
}

pub fn unit(component: Component) -> String {
    format!("open5gs-{component}d")
}
