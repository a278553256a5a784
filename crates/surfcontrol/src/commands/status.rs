//! Status command handlers: one observation cycle, then render.

use std::net::IpAddr;

use serde::Serialize;
use tabled::Tabled;

use surfcontrol_core::{
    Component, Controller, CoreCounters, DeviceSnapshot, HealthState, ObservationSnapshot,
    RadioSnapshot,
};

use crate::cli::{GlobalOpts, StatusArgs, StatusView};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct ComponentHealth {
    component: Component,
    role: &'static str,
    health: HealthState,
}

#[derive(Tabled)]
struct HealthRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Health")]
    health: String,
}

#[derive(Tabled)]
struct RadioRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Connected")]
    connected: String,
}

impl From<&RadioSnapshot> for RadioRow {
    fn from(r: &RadioSnapshot) -> Self {
        Self {
            address: r.address.to_string(),
            port: r.port.map(|p| p.to_string()).unwrap_or_default(),
            kind: match r.kind {
                surfcontrol_core::Generation::FourG => "eNodeB (4G)".into(),
                surfcontrol_core::Generation::FiveG => "gNodeB (5G)".into(),
            },
            state: r.state.to_string(),
            connected: r.connected_at.map(|t| t.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "IMSI")]
    imsi: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Attached")]
    attached: String,
    #[tabled(rename = "Up")]
    up: String,
    #[tabled(rename = "Down")]
    down: String,
}

impl From<&DeviceSnapshot> for DeviceRow {
    fn from(d: &DeviceSnapshot) -> Self {
        Self {
            imsi: d.imsi.to_string(),
            name: d.name.clone(),
            address: d.address.as_ref().map(IpAddr::to_string).unwrap_or_default(),
            state: d.state.to_string(),
            group: d.group.clone().unwrap_or_default(),
            attached: d.attached_at.map(|t| t.to_string()).unwrap_or_default(),
            up: format_rate(d.uplink_bps),
            down: format_rate(d.downlink_bps),
        }
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn format_rate(bps: u64) -> String {
    match bps {
        0 => "-".into(),
        b if b < 1_000 => format!("{b} bps"),
        b if b < 1_000_000 => format!("{:.1} kbps", b as f64 / 1e3),
        b => format!("{:.1} Mbps", b as f64 / 1e6),
    }
}

fn summary(s: &ObservationSnapshot, color: bool) -> String {
    let mut lines = vec![
        format!("Health:  {}", output::health_label(s.health.overall, color)),
        format!("Radios:  {}", s.radios.len()),
        format!("Devices: {}", s.devices.len()),
        format!(
            "Lines:   {} read, {} recognised, {} ignored",
            s.stats.lines, s.stats.matched, s.stats.unmatched
        ),
    ];
    let c = &s.counters;
    if c != &CoreCounters::default() {
        let show = |v: Option<u32>| v.map_or_else(|| "?".to_owned(), |n| n.to_string());
        lines.push(format!(
            "Core:    {} radios, {} radio devices, {} sessions",
            show(c.radios),
            show(c.radio_devices),
            show(c.sessions)
        ));
    }
    for (component, state) in &s.health.components {
        if *state != HealthState::Healthy {
            lines.push(format!(
                "  {component:<5} {}",
                output::health_label(*state, color)
            ));
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: &StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = controller.observe_once().await;
    let color = output::should_color(&global.color);

    let out = match args.view {
        None => output::render_single(
            &global.output,
            snapshot.as_ref(),
            |s| summary(s, color),
            |s| s.health.overall.to_string(),
        )?,
        Some(StatusView::Health) => {
            let data: Vec<ComponentHealth> = snapshot
                .health
                .components
                .iter()
                .map(|(component, health)| ComponentHealth {
                    component: *component,
                    role: component.role(),
                    health: *health,
                })
                .collect();
            output::render_list(
                &global.output,
                &data,
                |c| HealthRow {
                    component: c.component.to_string(),
                    role: c.role.to_owned(),
                    health: output::health_label(c.health, color),
                },
                |c| format!("{} {}", c.component, c.health),
            )?
        }
        Some(StatusView::Radios) => output::render_list(
            &global.output,
            &snapshot.radios,
            |r| RadioRow::from(r),
            |r| r.address.to_string(),
        )?,
        Some(StatusView::Devices) => output::render_list(
            &global.output,
            &snapshot.devices,
            |d| DeviceRow::from(d),
            |d| d.imsi.to_string(),
        )?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
