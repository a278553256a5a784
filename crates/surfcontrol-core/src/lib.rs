//! Control plane for a containerised mobile core (4G EPC or 5G SA).
//!
//! This crate turns a declarative network intent into running core
//! functions and watches what those functions report:
//!
//! - **[`Controller`]**: facade owning the lifecycle.
//!   [`start()`](Controller::start) reinstates an interrupted artifact swap
//!   and spawns the background observation task;
//!   [`observe_once()`](Controller::observe_once) runs a single cycle for
//!   one-shot CLI invocations. Exposes everything through [`MobileCore`].
//!
//! - **[`Orchestrator`]**: validate, generate, back up, swap artifacts in
//!   and restart units in dependency order, rolling back on any failure.
//!   One deployment at a time.
//!
//! - **[`ObservationEngine`]**: tails component logs, folds parsed
//!   [`LogEvent`]s into attached devices and connected radios, queries unit
//!   health and publishes an immutable [`ObservationSnapshot`] per cycle.
//!
//! - **Domain model** ([`model`]): intent documents, per-component artifact
//!   schemas, service tables, log events and snapshots.

pub mod backup;
pub mod config;
pub mod controller;
pub mod deploy;
pub mod error;
pub mod fsutil;
pub mod generate;
pub mod logsource;
pub mod model;
pub mod observe;
pub mod parse;
pub mod subscriber;
pub mod supervisor;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backup::{BackupError, BackupInfo, BackupStore};
pub use config::{DaemonConfig, DeployConfig, ObservationConfig, SupervisorTimeouts};
pub use controller::{Controller, MobileCore};
pub use deploy::{DeployError, DeployPhase, Orchestrator, RestoreError};
pub use error::CoreError;
pub use generate::{GenerationError, GeneratorOptions, generate, generate_with, recover_identity};
pub use logsource::{FileLogSource, LogSource, LogSourceError};
pub use observe::{ByteCounters, NoTrafficCounters, ObservationEngine, TrafficCounters};
pub use parse::parse_line;
pub use subscriber::{
    DirectoryError, StaticDirectory, SubscriberDirectory, SubscriberProfile, YamlFileDirectory,
};
pub use supervisor::{ProcessSupervisor, SupervisorError, SystemctlSupervisor, UnitStatus};
pub use validate::{Validation, validate};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    BackupId, Cidr, Component, ComponentArtifact, ComponentConfig, CoreCounter, CoreCounters,
    CoreHealth, DeployFailure, DeploymentRecord, DeviceSnapshot, DeviceState, EventKind,
    Generation, HealthState, Imsi, IntentError, LogEvent, LogTimestamp, NetworkIntent,
    ObservationSnapshot, Outcome, ParseStats, RadioSnapshot, RadioState, ServiceUnit, UnitNaming,
};
