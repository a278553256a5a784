// ── Domain model ──
//
// Intent documents, generated artifacts, the per-generation service
// tables, log events and the snapshots derived from them.

pub mod artifact;
pub mod event;
pub mod identity;
pub mod intent;
pub mod net;
pub mod record;
pub mod service;
pub mod snapshot;

// ── Re-exports ──────────────────────────────────────────────────────

pub use artifact::{ComponentArtifact, ComponentConfig, RecoveredIdentity};
pub use event::{CoreCounter, EventKind, LogEvent, LogTimestamp};
pub use identity::{
    AreaCode, CountryCode, Imsi, IntentError, NetworkCode, SliceId, SliceServiceType,
};
pub use intent::{
    Addressing, Generation, NetworkIdentity, NetworkIntent, NetworkSlice, RadioParameters,
};
pub use net::{Cidr, CidrError};
pub use record::{BackupId, DeployFailure, DeploymentRecord, Outcome};
pub use service::{
    Component, DependencyError, ServiceUnit, UnitNaming, UnitSpec, restart_order, service_table,
    service_units,
};
pub use snapshot::{
    CoreCounters, CoreHealth, DeviceSnapshot, DeviceState, HealthState, ObservationSnapshot, ParseStats,
    RadioSnapshot, RadioState,
};
