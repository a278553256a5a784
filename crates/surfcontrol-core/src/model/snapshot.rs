// ── Observation snapshots ──
//
// Immutable views published by the observation engine. A new snapshot
// always replaces the previous one wholesale.

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::event::{CoreCounter, LogTimestamp};
use super::identity::Imsi;
use super::intent::Generation;
use super::service::Component;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceState {
    Connected,
    Idle,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub imsi: Imsi,
    pub name: String,
    /// Session address, when a session has been observed.
    pub address: Option<IpAddr>,
    pub state: DeviceState,
    pub group: Option<String>,
    /// Log time of the most recent attach.
    pub attached_at: Option<LogTimestamp>,
    /// Bits per second.
    pub uplink_bps: u64,
    pub downlink_bps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RadioState {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioSnapshot {
    pub address: IpAddr,
    /// SCTP source port of the association.
    pub port: Option<u16>,
    pub kind: Generation,
    pub state: RadioState,
    /// Log time the association was accepted.
    pub connected_at: Option<LogTimestamp>,
}

/// Tri-state health used for the core as a whole and per component.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreHealth {
    pub overall: HealthState,
    pub components: BTreeMap<Component, HealthState>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl Default for CoreHealth {
    fn default() -> Self {
        Self {
            overall: HealthState::Down,
            components: BTreeMap::new(),
            checked_at: None,
        }
    }
}

impl CoreHealth {
    /// Fold per-component states into the overall state: nothing known is
    /// down, all healthy is healthy, any component still up is degraded.
    pub fn from_components(components: BTreeMap<Component, HealthState>) -> Self {
        let overall = if components.is_empty() {
            HealthState::Down
        } else if components.values().all(|s| *s == HealthState::Healthy) {
            HealthState::Healthy
        } else if components.values().any(|s| *s != HealthState::Down) {
            HealthState::Degraded
        } else {
            HealthState::Down
        };
        Self {
            overall,
            components,
            checked_at: Some(Utc::now()),
        }
    }
}

/// Line counters accumulated across observation cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub lines: u64,
    pub matched: u64,
    pub unmatched: u64,
}

/// Last totals the core itself reported. `None` until a line carrying
/// that counter has been seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreCounters {
    pub radios: Option<u32>,
    pub radio_devices: Option<u32>,
    pub sessions: Option<u32>,
}

impl CoreCounters {
    pub fn record(&mut self, counter: CoreCounter, value: u32) {
        let slot = match counter {
            CoreCounter::Radios => &mut self.radios,
            CoreCounter::RadioDevices => &mut self.radio_devices,
            CoreCounter::Sessions => &mut self.sessions,
        };
        *slot = Some(value);
    }
}

/// Everything one observation cycle produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSnapshot {
    pub health: CoreHealth,
    pub radios: Vec<RadioSnapshot>,
    pub devices: Vec<DeviceSnapshot>,
    pub counters: CoreCounters,
    pub stats: ParseStats,
    pub taken_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_fold() {
        use HealthState::{Degraded, Down, Healthy};

        let fold = |states: &[HealthState]| {
            let map = [Component::Hss, Component::Mme, Component::Sgwc]
                .into_iter()
                .zip(states.iter().copied())
                .collect();
            CoreHealth::from_components(map).overall
        };

        assert_eq!(fold(&[]), Down);
        assert_eq!(fold(&[Healthy, Healthy, Healthy]), Healthy);
        assert_eq!(fold(&[Healthy, Down, Down]), Degraded);
        assert_eq!(fold(&[Degraded, Down]), Degraded);
        assert_eq!(fold(&[Down, Down, Down]), Down);
    }
}
