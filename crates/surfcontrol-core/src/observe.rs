// ── Observation engine ──
//
// Periodically folds new log lines into the set of attached subscribers
// and connected radios, enriches subscribers from the directory and
// traffic counters, queries the supervisor for unit health, and publishes
// the result as one immutable snapshot.
//
// Every cycle runs under the soft deadline. Log lines folded before the
// deadline always stay folded, since their sources have moved past them;
// a cycle that runs out of time only forfeits its snapshot, and the
// previous one stands until the next cycle completes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ObservationConfig;
use crate::logsource::{FileLogSource, LogSource};
use crate::model::{
    Component, CoreCounters, CoreHealth, DeviceSnapshot, DeviceState, EventKind, Generation,
    HealthState, Imsi, LogEvent, LogTimestamp, ObservationSnapshot, ParseStats, RadioSnapshot,
    RadioState, UnitNaming, service_table, service_units,
};
use crate::parse::parse_line;
use crate::subscriber::{StaticDirectory, SubscriberDirectory};
use crate::supervisor::ProcessSupervisor;

// ── Traffic counters ────────────────────────────────────────────────

/// Cumulative byte counters for one subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteCounters {
    pub uplink_bytes: u64,
    pub downlink_bytes: u64,
}

/// Source of per-subscriber byte counters. Rates are derived from the
/// difference between consecutive readings.
#[async_trait]
pub trait TrafficCounters: Send + Sync {
    async fn counters(&self, imsi: &Imsi, address: Option<IpAddr>) -> Option<ByteCounters>;
}

/// No counters available: every rate reads zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrafficCounters;

#[async_trait]
impl TrafficCounters for NoTrafficCounters {
    async fn counters(&self, _imsi: &Imsi, _address: Option<IpAddr>) -> Option<ByteCounters> {
        None
    }
}

// ── Fold state ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct RadioEntry {
    generation: Generation,
    port: Option<u16>,
    connected_at: LogTimestamp,
}

#[derive(Debug, Clone, Default)]
struct FoldState {
    /// Attached subscribers and the log time of their latest attach.
    attached: BTreeMap<Imsi, LogTimestamp>,
    sessions: HashMap<Imsi, IpAddr>,
    radios: BTreeMap<IpAddr, RadioEntry>,
    counters: CoreCounters,
    traffic: HashMap<Imsi, (ByteCounters, Instant)>,
    stats: ParseStats,
}

impl FoldState {
    fn apply(&mut self, event: &LogEvent) {
        match &event.kind {
            EventKind::DeviceAttached { imsi } => {
                self.attached.insert(imsi.clone(), event.timestamp);
            }
            EventKind::DeviceDetached { imsi } => {
                // Detach without a prior attach changes nothing.
                self.attached.remove(imsi);
                self.sessions.remove(imsi);
                self.traffic.remove(imsi);
            }
            EventKind::RadioConnected {
                address,
                port,
                generation,
            } => {
                self.radios.insert(
                    *address,
                    RadioEntry {
                        generation: *generation,
                        port: *port,
                        connected_at: event.timestamp,
                    },
                );
            }
            EventKind::RadioDisconnected { address, .. } => {
                self.radios.remove(address);
            }
            EventKind::SessionCreated { imsi, address, .. } => {
                self.sessions.insert(imsi.clone(), *address);
            }
            EventKind::CounterReported { counter, value } => {
                self.counters.record(*counter, *value);
            }
            EventKind::ServiceStarted { .. } => match event.component.as_str() {
                // A restarted mobility function has forgotten every
                // attachment and radio association.
                "mme" | "amf" => {
                    self.attached.clear();
                    self.radios.clear();
                    self.counters = CoreCounters::default();
                }
                "smf" => self.sessions.clear(),
                _ => {}
            },
        }
    }

    fn ingest(&mut self, line: &str) {
        self.stats.lines += 1;
        match parse_line(line) {
            Some(event) => {
                self.stats.matched += 1;
                self.apply(&event);
            }
            None => self.stats.unmatched += 1,
        }
    }
}

// ── Engine ──────────────────────────────────────────────────────────

pub struct ObservationEngine {
    config: ObservationConfig,
    naming: UnitNaming,
    status_timeout: Duration,
    supervisor: Arc<dyn ProcessSupervisor>,
    directory: Arc<dyn SubscriberDirectory>,
    traffic: Arc<dyn TrafficCounters>,
    generation: watch::Receiver<Generation>,
    sources: HashMap<Generation, Vec<Box<dyn LogSource>>>,
    state: FoldState,
    state_generation: Option<Generation>,
    snapshot: watch::Sender<Arc<ObservationSnapshot>>,
}

impl ObservationEngine {
    /// Engine reading each component's log from `config.log_dir`, with an
    /// empty subscriber directory and no traffic counters.
    pub fn new(
        config: ObservationConfig,
        naming: UnitNaming,
        status_timeout: Duration,
        supervisor: Arc<dyn ProcessSupervisor>,
        generation: watch::Receiver<Generation>,
    ) -> Self {
        let sources = [Generation::FourG, Generation::FiveG]
            .into_iter()
            .map(|g| (g, default_sources(g, &config)))
            .collect();
        let (snapshot, _) = watch::channel(Arc::new(ObservationSnapshot::default()));
        Self {
            config,
            naming,
            status_timeout,
            supervisor,
            directory: Arc::new(StaticDirectory::default()),
            traffic: Arc::new(NoTrafficCounters),
            generation,
            sources,
            state: FoldState::default(),
            state_generation: None,
            snapshot,
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn SubscriberDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_traffic(mut self, traffic: Arc<dyn TrafficCounters>) -> Self {
        self.traffic = traffic;
        self
    }

    /// Replace the log sources read while `generation` is active.
    pub fn with_sources(mut self, generation: Generation, sources: Vec<Box<dyn LogSource>>) -> Self {
        self.sources.insert(generation, sources);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ObservationSnapshot>> {
        self.snapshot.subscribe()
    }

    pub fn latest(&self) -> Arc<ObservationSnapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Poll on the configured interval until cancelled.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval = ?self.config.interval, "observation engine started");
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
        info!("observation engine stopped");
    }

    /// Run one cycle. Returns `true` if its snapshot was published.
    pub async fn run_cycle(&mut self) -> bool {
        let generation = *self.generation.borrow_and_update();

        // A different core is running: nothing from the old one applies.
        if self.state_generation != Some(generation) {
            debug!(%generation, "resetting observation state");
            self.state = FoldState::default();
            self.state_generation = Some(generation);
        }

        let lookups = Lookups {
            supervisor: self.supervisor.as_ref(),
            directory: self.directory.as_ref(),
            traffic: self.traffic.as_ref(),
            naming: &self.naming,
            status_timeout: self.status_timeout,
        };
        let sources = self.sources.get_mut(&generation);
        let state = &mut self.state;
        let work = async {
            let unreadable = read_logs(sources, state).await;
            let devices = lookups.devices(state).await;
            let health = lookups.health(generation, &unreadable).await;
            (devices, health)
        };

        let Ok((devices, health)) = tokio::time::timeout(self.config.soft_deadline, work).await
        else {
            warn!(
                deadline = ?self.config.soft_deadline,
                "observation cycle overran, discarding snapshot"
            );
            return false;
        };

        let radios = self
            .state
            .radios
            .iter()
            .map(|(address, radio)| RadioSnapshot {
                address: *address,
                port: radio.port,
                kind: radio.generation,
                state: RadioState::Connected,
                connected_at: Some(radio.connected_at),
            })
            .collect();
        let snapshot = ObservationSnapshot {
            health,
            radios,
            devices,
            counters: self.state.counters,
            stats: self.state.stats,
            taken_at: Some(Utc::now()),
        };
        self.snapshot.send_replace(Arc::new(snapshot));
        true
    }
}

/// Fold new lines from every source. Returns components whose log could
/// not be read.
async fn read_logs(
    sources: Option<&mut Vec<Box<dyn LogSource>>>,
    state: &mut FoldState,
) -> BTreeSet<Component> {
    let mut unreadable = BTreeSet::new();
    let Some(sources) = sources else {
        return unreadable;
    };
    for source in sources.iter_mut() {
        match source.read_new().await {
            Ok(lines) => {
                for line in &lines {
                    state.ingest(line);
                }
            }
            Err(e) => {
                debug!(component = %source.component(), error = %e, "log source unreadable");
                unreadable.insert(source.component());
            }
        }
    }
    unreadable
}

/// The engine's outside collaborators, borrowed for one cycle.
struct Lookups<'a> {
    supervisor: &'a dyn ProcessSupervisor,
    directory: &'a dyn SubscriberDirectory,
    traffic: &'a dyn TrafficCounters,
    naming: &'a UnitNaming,
    status_timeout: Duration,
}

impl Lookups<'_> {
    async fn devices(&self, state: &mut FoldState) -> Vec<DeviceSnapshot> {
        let now = Instant::now();
        let mut out = Vec::with_capacity(state.attached.len());
        for (imsi, attached_at) in &state.attached {
            let profile = match self.directory.find_by_identity(imsi).await {
                Ok(p) => p.unwrap_or_default(),
                Err(e) => {
                    warn!(imsi = %imsi, error = %e, "subscriber lookup failed");
                    Default::default()
                }
            };
            let address = state.sessions.get(imsi).copied();

            let (uplink_bps, downlink_bps) = match self.traffic.counters(imsi, address).await {
                Some(current) => {
                    let rates = state
                        .traffic
                        .get(imsi)
                        .map_or((0, 0), |(prev, at)| rates(*prev, current, now - *at));
                    state.traffic.insert(imsi.clone(), (current, now));
                    rates
                }
                None => (0, 0),
            };

            out.push(DeviceSnapshot {
                imsi: imsi.clone(),
                name: profile
                    .name
                    .unwrap_or_else(|| format!("Device-{}", imsi.suffix())),
                address,
                state: if address.is_some() {
                    DeviceState::Connected
                } else {
                    DeviceState::Idle
                },
                group: profile.group,
                attached_at: Some(*attached_at),
                uplink_bps,
                downlink_bps,
            });
        }
        out
    }

    async fn health(&self, generation: Generation, unreadable: &BTreeSet<Component>) -> CoreHealth {
        let mut components = BTreeMap::new();
        for unit in service_units(generation, self.naming, None) {
            let state = if unreadable.contains(&unit.component) {
                HealthState::Down
            } else {
                match self.supervisor.status(&unit.name, self.status_timeout).await {
                    Ok(status) => status.health(),
                    Err(e) => {
                        debug!(unit = %unit.name, error = %e, "status query failed");
                        HealthState::Down
                    }
                }
            };
            components.insert(unit.component, state);
        }
        CoreHealth::from_components(components)
    }
}

fn default_sources(generation: Generation, config: &ObservationConfig) -> Vec<Box<dyn LogSource>> {
    service_table(generation)
        .iter()
        .map(|spec| {
            let source: Box<dyn LogSource> = Box::new(FileLogSource::in_dir(
                spec.component,
                &config.log_dir,
                config.tail_lines,
            ));
            source
        })
        .collect()
}

/// Bits per second between two readings. Counter resets read as zero.
fn rates(prev: ByteCounters, current: ByteCounters, elapsed: Duration) -> (u64, u64) {
    let millis = elapsed.as_millis();
    if millis == 0 {
        return (0, 0);
    }
    let rate = |before: u64, after: u64| {
        let delta = u128::from(after.saturating_sub(before));
        u64::try_from(delta * 8 * 1000 / millis).unwrap_or(u64::MAX)
    };
    (
        rate(prev.uplink_bytes, current.uplink_bytes),
        rate(prev.downlink_bytes, current.downlink_bytes),
    )
}
