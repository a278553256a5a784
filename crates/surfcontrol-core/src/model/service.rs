// ── Managed components and service units ──
//
// The set of processes the daemon configures and restarts is fixed per
// generation and declared as data. Restart order is derived from the
// declared edges, never hand-listed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;

use super::intent::Generation;

/// A managed mobile-core component.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Component {
    // 4G only
    Hss,
    Mme,
    Sgwc,
    Sgwu,
    // shared session / user plane
    Smf,
    Upf,
    // 5G only
    Nrf,
    Ausf,
    Nssf,
    Amf,
}

impl Component {
    /// Human-readable role, for status output.
    pub fn role(self) -> &'static str {
        match self {
            Self::Hss => "HSS (Home Subscriber Server)",
            Self::Mme => "MME (Mobility Management Entity)",
            Self::Sgwc => "SGW-C (Serving Gateway, control)",
            Self::Sgwu => "SGW-U (Serving Gateway, user plane)",
            Self::Smf => "SMF (Session Management Function)",
            Self::Upf => "UPF (User Plane Function)",
            Self::Nrf => "NRF (Network Repository Function)",
            Self::Ausf => "AUSF (Authentication Server Function)",
            Self::Nssf => "NSSF (Network Slice Selection Function)",
            Self::Amf => "AMF (Access and Mobility Management Function)",
        }
    }

    /// Configuration file name the external core reads for this component.
    pub fn artifact_file_name(self) -> String {
        format!("{self}.yaml")
    }

    /// Default log file name written by this component.
    pub fn log_file_name(self) -> String {
        format!("{self}.log")
    }
}

// ── Static service tables ───────────────────────────────────────────

/// One row of a generation's service table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpec {
    pub component: Component,
    pub depends_on: &'static [Component],
    /// Time to wait after the unit reports active before moving on.
    pub settle: Duration,
}

const fn unit(component: Component, depends_on: &'static [Component], settle_ms: u64) -> UnitSpec {
    UnitSpec {
        component,
        depends_on,
        settle: Duration::from_millis(settle_ms),
    }
}

const EPC_4G: &[UnitSpec] = &[
    unit(Component::Hss, &[], 2_000),
    unit(Component::Mme, &[Component::Hss], 1_000),
    unit(Component::Sgwc, &[Component::Mme], 1_000),
    unit(Component::Sgwu, &[Component::Sgwc], 500),
    unit(Component::Smf, &[Component::Sgwc], 1_000),
    unit(Component::Upf, &[Component::Smf], 500),
];

const SA_5G: &[UnitSpec] = &[
    unit(Component::Nrf, &[], 2_000),
    unit(Component::Ausf, &[Component::Nrf], 500),
    unit(Component::Nssf, &[Component::Nrf], 500),
    unit(Component::Amf, &[Component::Ausf, Component::Nssf], 1_000),
    unit(Component::Smf, &[Component::Amf], 1_000),
    unit(Component::Upf, &[Component::Smf], 500),
];

/// The fixed service table for a generation, in declaration order.
pub fn service_table(generation: Generation) -> &'static [UnitSpec] {
    match generation {
        Generation::FourG => EPC_4G,
        Generation::FiveG => SA_5G,
    }
}

// ── Runtime service units ───────────────────────────────────────────

/// How component names map onto supervisor unit names,
/// e.g. `open5gs-` + `mme` + `d` = `open5gs-mmed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitNaming {
    pub prefix: String,
    pub suffix: String,
}

impl Default for UnitNaming {
    fn default() -> Self {
        Self {
            prefix: "open5gs-".into(),
            suffix: "d".into(),
        }
    }
}

impl UnitNaming {
    pub fn unit_name(&self, component: Component) -> String {
        format!("{}{component}{}", self.prefix, self.suffix)
    }
}

/// A supervisor unit resolved from a [`UnitSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    pub component: Component,
    /// Supervisor unit name.
    pub name: String,
    pub depends_on: Vec<Component>,
    pub settle: Duration,
}

/// Resolve a generation's table into named units. A `settle_override`
/// replaces every unit's settle delay (tests use zero).
pub fn service_units(
    generation: Generation,
    naming: &UnitNaming,
    settle_override: Option<Duration>,
) -> Vec<ServiceUnit> {
    service_table(generation)
        .iter()
        .map(|spec| ServiceUnit {
            component: spec.component,
            name: naming.unit_name(spec.component),
            depends_on: spec.depends_on.to_vec(),
            settle: settle_override.unwrap_or(spec.settle),
        })
        .collect()
}

// ── Dependency ordering ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("unit '{unit}' depends on '{missing}', which is not in the table")]
    UnknownDependency { unit: Component, missing: Component },

    #[error("dependency cycle among units: {}", format_components(.remaining))]
    Cycle { remaining: Vec<Component> },
}

fn format_components(list: &[Component]) -> String {
    list.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Order units so every unit comes after all of its dependencies.
///
/// Deterministic: among units that are ready at the same time, declaration
/// order wins.
pub fn restart_order(units: &[ServiceUnit]) -> Result<Vec<&ServiceUnit>, DependencyError> {
    for u in units {
        if let Some(missing) = u
            .depends_on
            .iter()
            .find(|dep| !units.iter().any(|other| other.component == **dep))
        {
            return Err(DependencyError::UnknownDependency {
                unit: u.component,
                missing: *missing,
            });
        }
    }

    let mut ordered: Vec<&ServiceUnit> = Vec::with_capacity(units.len());
    let mut pending: Vec<&ServiceUnit> = units.iter().collect();

    while !pending.is_empty() {
        let ready = pending.iter().position(|u| {
            u.depends_on
                .iter()
                .all(|dep| ordered.iter().any(|done| done.component == *dep))
        });
        match ready {
            Some(idx) => ordered.push(pending.remove(idx)),
            None => {
                return Err(DependencyError::Cycle {
                    remaining: pending.iter().map(|u| u.component).collect(),
                });
            }
        }
    }

    Ok(ordered)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn position(order: &[&ServiceUnit], c: Component) -> usize {
        order.iter().position(|u| u.component == c).unwrap()
    }

    #[test]
    fn four_g_order_respects_edges() {
        let units = service_units(Generation::FourG, &UnitNaming::default(), None);
        let order = restart_order(&units).unwrap();
        assert_eq!(order.len(), 6);
        assert!(position(&order, Component::Hss) < position(&order, Component::Mme));
        assert!(position(&order, Component::Mme) < position(&order, Component::Sgwc));
        assert!(position(&order, Component::Sgwc) < position(&order, Component::Sgwu));
        assert!(position(&order, Component::Sgwc) < position(&order, Component::Smf));
        assert!(position(&order, Component::Smf) < position(&order, Component::Upf));
    }

    #[test]
    fn both_tables_are_acyclic() {
        for generation in [Generation::FourG, Generation::FiveG] {
            let units = service_units(generation, &UnitNaming::default(), None);
            assert_eq!(restart_order(&units).unwrap().len(), units.len());
        }
    }

    #[test]
    fn cycle_is_reported() {
        let units = vec![
            ServiceUnit {
                component: Component::Smf,
                name: "smf".into(),
                depends_on: vec![Component::Upf],
                settle: Duration::ZERO,
            },
            ServiceUnit {
                component: Component::Upf,
                name: "upf".into(),
                depends_on: vec![Component::Smf],
                settle: Duration::ZERO,
            },
        ];
        assert!(matches!(
            restart_order(&units),
            Err(DependencyError::Cycle { .. })
        ));
    }

    #[test]
    fn unknown_dependency_is_reported() {
        let units = vec![ServiceUnit {
            component: Component::Mme,
            name: "mme".into(),
            depends_on: vec![Component::Hss],
            settle: Duration::ZERO,
        }];
        assert_eq!(
            restart_order(&units).unwrap_err(),
            DependencyError::UnknownDependency {
                unit: Component::Mme,
                missing: Component::Hss,
            }
        );
    }

    #[test]
    fn generations_share_only_session_components() {
        let four: Vec<_> = service_table(Generation::FourG).iter().map(|u| u.component).collect();
        let five: Vec<_> = service_table(Generation::FiveG).iter().map(|u| u.component).collect();
        let shared: Vec<_> = four.iter().filter(|c| five.contains(c)).copied().collect();
        assert_eq!(shared, vec![Component::Smf, Component::Upf]);
    }

    #[test]
    fn unit_naming_matches_packaged_units() {
        assert_eq!(UnitNaming::default().unit_name(Component::Mme), "open5gs-mmed");
        assert_eq!(Component::Sgwc.artifact_file_name(), "sgwc.yaml");
    }
}
