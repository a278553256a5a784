// ── Artifact generation ──
//
// Pure translation of a validated intent into one configuration artifact
// per managed component. Same intent in, same bytes out.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::artifact::{
    Ambr, AmfConfig, AmfId, AmfSection, AusfConfig, Endpoint, GatewayControlSection,
    GatewayUserSection, Guami, Gummei, HssConfig, HssSection, Logger, MmeConfig, MmeSection,
    NetworkName, NetworkSliceInstance, NrfConfig, NrfSection, NssfConfig, NssfSection, PlmnId,
    PlmnSupport, SNssai, SbiOnlySection, Security, ServingPlmn, SessionQos, SgwcConfig,
    SgwuConfig, SmfConfig, SmfSection, Subnet, TrackingArea, UpfConfig, UpfSection,
};
use crate::model::{
    Component, ComponentArtifact, ComponentConfig, Generation, NetworkIntent, RecoveredIdentity,
    service_table,
};

// ── Well-known ports and internal addresses ─────────────────────────

const PORT_S1AP: u16 = 36412;
const PORT_NGAP: u16 = 38412;
const PORT_GTPC: u16 = 2123;
const PORT_GTPU: u16 = 2152;
const PORT_PFCP: u16 = 8805;
const PORT_SBI: u16 = 7777;

const ADDR_SGWC: &str = "127.0.0.3";
const ADDR_SMF: &str = "127.0.0.4";
const ADDR_AMF: &str = "127.0.0.5";
const ADDR_SGWU: &str = "127.0.0.6";
const ADDR_UPF: &str = "127.0.0.7";
const ADDR_NRF: &str = "127.0.0.10";
const ADDR_AUSF: &str = "127.0.0.11";
const ADDR_NSSF: &str = "127.0.0.14";

const SESSION_MTU: u16 = 1400;

// ── QoS tiers ───────────────────────────────────────────────────────

/// Fixed parameters behind a service-quality tier name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosTier {
    pub name: &'static str,
    /// QCI (4G) / 5QI (5G).
    pub index: u8,
    pub arp_priority: u8,
    pub guaranteed: bool,
    pub uplink_kbps: u64,
    pub downlink_kbps: u64,
}

pub const QOS_TIERS: &[QosTier] = &[
    QosTier {
        name: "standard",
        index: 9,
        arp_priority: 8,
        guaranteed: false,
        uplink_kbps: 50_000,
        downlink_kbps: 100_000,
    },
    QosTier {
        name: "high_priority",
        index: 1,
        arp_priority: 1,
        guaranteed: true,
        uplink_kbps: 50_000,
        downlink_kbps: 10_000,
    },
    QosTier {
        name: "best_effort",
        index: 9,
        arp_priority: 15,
        guaranteed: false,
        uplink_kbps: 10_000,
        downlink_kbps: 20_000,
    },
];

pub fn qos_tier(name: &str) -> Option<&'static QosTier> {
    QOS_TIERS.iter().find(|t| t.name == name)
}

// ── Errors and options ──────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("unknown service quality tier '{0}'")]
    UnknownTier(String),

    #[error("{0} deployment requires a network slice")]
    MissingSlice(Generation),

    #[error("failed to render {component} configuration: {source}")]
    Render {
        component: Component,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Host paths baked into generated artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Directory the core writes its logs into.
    pub log_dir: PathBuf,
    pub diameter_dir: PathBuf,
    pub subscriber_db_uri: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("/var/log/open5gs"),
            diameter_dir: PathBuf::from("/etc/freeDiameter"),
            subscriber_db_uri: "mongodb://localhost/open5gs".into(),
        }
    }
}

// ── Entry points ────────────────────────────────────────────────────

/// Generate artifacts with default host paths.
pub fn generate(
    intent: &NetworkIntent,
) -> Result<BTreeMap<Component, ComponentArtifact>, GenerationError> {
    generate_with(intent, &GeneratorOptions::default())
}

pub fn generate_with(
    intent: &NetworkIntent,
    options: &GeneratorOptions,
) -> Result<BTreeMap<Component, ComponentArtifact>, GenerationError> {
    plan(intent, options)?
        .into_iter()
        .map(|(component, config)| {
            let text = config
                .to_yaml()
                .map_err(|source| GenerationError::Render { component, source })?;
            Ok((
                component,
                ComponentArtifact {
                    component,
                    file_name: component.artifact_file_name(),
                    content: text.into_bytes(),
                },
            ))
        })
        .collect()
}

/// Build the typed configuration for every component of the intent's
/// generation, without serializing.
pub fn plan(
    intent: &NetworkIntent,
    options: &GeneratorOptions,
) -> Result<BTreeMap<Component, ComponentConfig>, GenerationError> {
    let tier = qos_tier(&intent.service_quality)
        .ok_or_else(|| GenerationError::UnknownTier(intent.service_quality.clone()))?;
    let ctx = Context {
        intent,
        options,
        tier,
    };

    service_table(intent.generation)
        .iter()
        .map(|spec| ctx.build(spec.component).map(|c| (spec.component, c)))
        .collect()
}

/// Parse an artifact and pull the PLMN / tracking area back out of it.
/// `Ok(None)` for components that carry no tracking area.
pub fn recover_identity(
    artifact: &ComponentArtifact,
) -> Result<Option<RecoveredIdentity>, serde_yaml::Error> {
    Ok(ComponentConfig::from_yaml(artifact.component, &artifact.content)?.identity())
}

// ── Builders ────────────────────────────────────────────────────────

struct Context<'a> {
    intent: &'a NetworkIntent,
    options: &'a GeneratorOptions,
    tier: &'static QosTier,
}

impl Context<'_> {
    fn build(&self, component: Component) -> Result<ComponentConfig, GenerationError> {
        Ok(match component {
            Component::Hss => ComponentConfig::Hss(self.hss()),
            Component::Mme => ComponentConfig::Mme(self.mme()),
            Component::Sgwc => ComponentConfig::Sgwc(self.sgwc()),
            Component::Sgwu => ComponentConfig::Sgwu(self.sgwu()),
            Component::Smf => ComponentConfig::Smf(self.smf()),
            Component::Upf => ComponentConfig::Upf(self.upf()),
            Component::Nrf => ComponentConfig::Nrf(self.nrf()),
            Component::Ausf => ComponentConfig::Ausf(self.ausf()),
            Component::Nssf => ComponentConfig::Nssf(self.nssf()?),
            Component::Amf => ComponentConfig::Amf(self.amf()?),
        })
    }

    fn logger(&self, component: Component) -> Logger {
        Logger {
            file: path_text(&self.options.log_dir.join(component.log_file_name())),
        }
    }

    fn diameter(&self, component: Component) -> String {
        path_text(&self.options.diameter_dir.join(format!("{component}.conf")))
    }

    fn core(&self) -> &str {
        &self.intent.addressing.core_address
    }

    fn plmn(&self) -> PlmnId {
        PlmnId {
            mcc: self.intent.identity.country_code.to_string(),
            mnc: self.intent.identity.network_code.to_string(),
        }
    }

    fn tai(&self) -> TrackingArea {
        TrackingArea {
            plmn_id: self.plmn(),
            tac: self.intent.identity.area_code.get(),
        }
    }

    fn network_name(&self) -> NetworkName {
        NetworkName {
            full: self.intent.identity.network_name.clone(),
        }
    }

    fn subnet(&self) -> Vec<Subnet> {
        vec![Subnet {
            addr: self.intent.addressing.device_pool.clone(),
            gateway: self.intent.addressing.device_gateway.clone(),
            dnn: self.intent.radio.apn.clone(),
        }]
    }

    fn s_nssai(&self) -> Result<SNssai, GenerationError> {
        let slice = self
            .intent
            .radio
            .network_slice
            .as_ref()
            .ok_or(GenerationError::MissingSlice(self.intent.generation))?;
        Ok(SNssai {
            sst: slice.service_type.get(),
            sd: slice.slice_id.to_string(),
        })
    }

    fn hss(&self) -> HssConfig {
        HssConfig {
            logger: self.logger(Component::Hss),
            hss: HssSection {
                free_diameter: self.diameter(Component::Hss),
                db_uri: self.options.subscriber_db_uri.clone(),
            },
        }
    }

    fn mme(&self) -> MmeConfig {
        MmeConfig {
            logger: self.logger(Component::Mme),
            mme: MmeSection {
                free_diameter: self.diameter(Component::Mme),
                s1ap: vec![Endpoint::new(self.core(), PORT_S1AP)],
                gtpc: vec![Endpoint::new(self.core(), PORT_GTPC)],
                gummei: Gummei {
                    plmn_id: self.plmn(),
                    mme_gid: 2,
                    mme_code: 1,
                },
                tai: self.tai(),
                security: eps_security(),
                network_name: self.network_name(),
                mme_name: "surfcontrol-mme".into(),
            },
        }
    }

    fn sgwc(&self) -> SgwcConfig {
        SgwcConfig {
            logger: self.logger(Component::Sgwc),
            sgwc: GatewayControlSection {
                gtpc: vec![Endpoint::new(ADDR_SGWC, PORT_GTPC)],
                pfcp: vec![Endpoint::new(ADDR_SGWC, PORT_PFCP)],
                user_plane: vec![Endpoint::new(ADDR_SGWU, PORT_PFCP)],
            },
        }
    }

    fn sgwu(&self) -> SgwuConfig {
        SgwuConfig {
            logger: self.logger(Component::Sgwu),
            sgwu: GatewayUserSection {
                pfcp: vec![Endpoint::new(ADDR_SGWU, PORT_PFCP)],
                gtpu: vec![Endpoint::new(self.core(), PORT_GTPU)],
            },
        }
    }

    fn smf(&self) -> SmfConfig {
        let sbi = match self.intent.generation {
            Generation::FourG => Vec::new(),
            Generation::FiveG => vec![Endpoint::new(ADDR_SMF, PORT_SBI)],
        };
        SmfConfig {
            logger: self.logger(Component::Smf),
            smf: SmfSection {
                sbi,
                pfcp: vec![Endpoint::new(ADDR_SMF, PORT_PFCP)],
                gtpc: vec![Endpoint::new(ADDR_SMF, PORT_GTPC)],
                gtpu: vec![Endpoint::new(ADDR_SMF, PORT_GTPU)],
                subnet: self.subnet(),
                dns: self.intent.addressing.dns_servers.clone(),
                mtu: SESSION_MTU,
                session: SessionQos {
                    tier: self.tier.name.into(),
                    index: self.tier.index,
                    arp_priority: self.tier.arp_priority,
                    guaranteed: self.tier.guaranteed,
                    ambr: Ambr {
                        uplink_kbps: self.tier.uplink_kbps,
                        downlink_kbps: self.tier.downlink_kbps,
                    },
                },
                user_plane: vec![Endpoint::new(ADDR_UPF, PORT_PFCP)],
            },
        }
    }

    fn upf(&self) -> UpfConfig {
        // In 5G the UPF terminates the radio-facing user plane itself; in 4G
        // the SGW-U does and the UPF only faces it.
        let gtpu = match self.intent.generation {
            Generation::FourG => Endpoint::new(ADDR_UPF, PORT_GTPU),
            Generation::FiveG => Endpoint::new(self.core(), PORT_GTPU),
        };
        UpfConfig {
            logger: self.logger(Component::Upf),
            upf: UpfSection {
                pfcp: vec![Endpoint::new(ADDR_UPF, PORT_PFCP)],
                gtpu: vec![gtpu],
                subnet: self.subnet(),
            },
        }
    }

    fn nrf(&self) -> NrfConfig {
        NrfConfig {
            logger: self.logger(Component::Nrf),
            nrf: NrfSection {
                serving: vec![ServingPlmn {
                    plmn_id: self.plmn(),
                }],
                sbi: vec![Endpoint::new(ADDR_NRF, PORT_SBI)],
            },
        }
    }

    fn ausf(&self) -> AusfConfig {
        AusfConfig {
            logger: self.logger(Component::Ausf),
            ausf: SbiOnlySection {
                sbi: vec![Endpoint::new(ADDR_AUSF, PORT_SBI)],
                nrf: vec![Endpoint::new(ADDR_NRF, PORT_SBI)],
            },
        }
    }

    fn nssf(&self) -> Result<NssfConfig, GenerationError> {
        Ok(NssfConfig {
            logger: self.logger(Component::Nssf),
            nssf: NssfSection {
                sbi: vec![Endpoint::new(ADDR_NSSF, PORT_SBI)],
                nsi: vec![NetworkSliceInstance {
                    nrf: Endpoint::new(ADDR_NRF, PORT_SBI),
                    s_nssai: self.s_nssai()?,
                }],
            },
        })
    }

    fn amf(&self) -> Result<AmfConfig, GenerationError> {
        Ok(AmfConfig {
            logger: self.logger(Component::Amf),
            amf: AmfSection {
                sbi: vec![Endpoint::new(ADDR_AMF, PORT_SBI)],
                ngap: vec![Endpoint::new(self.core(), PORT_NGAP)],
                guami: vec![Guami {
                    plmn_id: self.plmn(),
                    amf_id: AmfId { region: 2, set: 1 },
                }],
                tai: vec![self.tai()],
                plmn_support: vec![PlmnSupport {
                    plmn_id: self.plmn(),
                    s_nssai: vec![self.s_nssai()?],
                }],
                security: Security {
                    integrity_order: vec!["NIA2".into(), "NIA1".into(), "NIA0".into()],
                    ciphering_order: vec!["NEA0".into(), "NEA1".into(), "NEA2".into()],
                },
                network_name: self.network_name(),
                amf_name: "surfcontrol-amf".into(),
            },
        })
    }
}

fn eps_security() -> Security {
    Security {
        integrity_order: vec!["EIA2".into(), "EIA1".into(), "EIA0".into()],
        ciphering_order: vec!["EEA0".into(), "EEA1".into(), "EEA2".into()],
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{NetworkSlice, SliceId, SliceServiceType};

    fn four_g() -> NetworkIntent {
        NetworkIntent::from_yaml(
            r#"
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
radio:
  apn: internet
  frequency_band: CBRS_Band48
"#,
        )
        .unwrap()
    }

    fn five_g() -> NetworkIntent {
        let mut intent = four_g();
        intent.generation = Generation::FiveG;
        intent.radio.network_slice = Some(NetworkSlice {
            service_type: SliceServiceType::new(1).unwrap(),
            slice_id: SliceId::new("000001").unwrap(),
        });
        intent
    }

    #[test]
    fn four_g_component_set() {
        let artifacts = generate(&four_g()).unwrap();
        let names: Vec<_> = artifacts.values().map(|a| a.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["hss.yaml", "mme.yaml", "sgwc.yaml", "sgwu.yaml", "smf.yaml", "upf.yaml"]
        );
    }

    #[test]
    fn five_g_component_set() {
        let artifacts = generate(&five_g()).unwrap();
        let mut components: Vec<_> = artifacts.keys().copied().collect();
        components.sort_by_key(ToString::to_string);
        assert_eq!(
            components,
            vec![
                Component::Amf,
                Component::Ausf,
                Component::Nrf,
                Component::Nssf,
                Component::Smf,
                Component::Upf
            ]
        );
    }

    #[test]
    fn output_is_byte_identical_across_calls() {
        assert_eq!(generate(&four_g()).unwrap(), generate(&four_g()).unwrap());
        assert_eq!(generate(&five_g()).unwrap(), generate(&five_g()).unwrap());
    }

    #[test]
    fn identity_round_trips_through_mme() {
        let artifacts = generate(&four_g()).unwrap();
        let recovered = recover_identity(&artifacts[&Component::Mme]).unwrap().unwrap();
        assert_eq!(
            recovered,
            RecoveredIdentity {
                mcc: "315".into(),
                mnc: "010".into(),
                tac: 1,
            }
        );
    }

    #[test]
    fn identity_round_trips_through_amf() {
        let artifacts = generate(&five_g()).unwrap();
        let recovered = recover_identity(&artifacts[&Component::Amf]).unwrap().unwrap();
        assert_eq!(recovered.mnc, "010");
    }

    #[test]
    fn session_subnet_comes_from_pool() {
        let plan = plan(&four_g(), &GeneratorOptions::default()).unwrap();
        let ComponentConfig::Smf(smf) = &plan[&Component::Smf] else {
            panic!("smf entry has wrong type");
        };
        assert_eq!(smf.smf.subnet[0].addr, "10.48.99.0/24");
        assert_eq!(smf.smf.subnet[0].gateway, "10.48.99.1");
        assert_eq!(smf.smf.subnet[0].dnn, "internet");
        assert_eq!(smf.smf.session.tier, "standard");
        assert_eq!(smf.smf.session.index, 9);
    }

    #[test]
    fn unknown_tier_fails() {
        let mut intent = four_g();
        intent.service_quality = "platinum".into();
        assert!(matches!(
            generate(&intent),
            Err(GenerationError::UnknownTier(t)) if t == "platinum"
        ));
    }

    #[test]
    fn five_g_without_slice_fails() {
        let mut intent = five_g();
        intent.radio.network_slice = None;
        assert!(matches!(
            generate(&intent),
            Err(GenerationError::MissingSlice(Generation::FiveG))
        ));
    }

    #[test]
    fn log_paths_follow_options() {
        let options = GeneratorOptions {
            log_dir: PathBuf::from("/tmp/core-logs"),
            ..GeneratorOptions::default()
        };
        let plan = plan(&four_g(), &options).unwrap();
        let ComponentConfig::Mme(mme) = &plan[&Component::Mme] else {
            panic!("mme entry has wrong type");
        };
        assert_eq!(mme.logger.file, "/tmp/core-logs/mme.log");
    }
}
