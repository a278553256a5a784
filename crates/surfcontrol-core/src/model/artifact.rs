// ── Typed component configuration ──
//
// One struct tree per managed component, shaped after the configuration
// files the external core reads. Built by `generate::plan`, serialized to
// YAML only when an artifact is produced.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::service::Component;

// ── Artifact ────────────────────────────────────────────────────────

/// Rendered configuration file for one component.
#[derive(Clone, PartialEq, Eq)]
pub struct ComponentArtifact {
    pub component: Component,
    pub file_name: String,
    pub content: Vec<u8>,
}

impl ComponentArtifact {
    /// Hex SHA-256 of the content.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.content))
    }
}

impl fmt::Debug for ComponentArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentArtifact")
            .field("component", &self.component)
            .field("file_name", &self.file_name)
            .field("bytes", &self.content.len())
            .finish()
    }
}

// ── Shared building blocks ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logger {
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Endpoint {
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port: Some(port),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlmnId {
    pub mcc: String,
    pub mnc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingArea {
    pub plmn_id: PlmnId,
    pub tac: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    pub integrity_order: Vec<String>,
    pub ciphering_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkName {
    pub full: String,
}

/// Session-plane subnet handed to devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub addr: String,
    pub gateway: String,
    pub dnn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ambr {
    pub uplink_kbps: u64,
    pub downlink_kbps: u64,
}

/// Default bearer / QoS flow parameters derived from the service tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionQos {
    pub tier: String,
    /// QCI (4G) or 5QI (5G).
    pub index: u8,
    pub arp_priority: u8,
    pub guaranteed: bool,
    pub ambr: Ambr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SNssai {
    pub sst: u8,
    pub sd: String,
}

// ── 4G components ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HssConfig {
    pub logger: Logger,
    pub hss: HssSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HssSection {
    #[serde(rename = "freeDiameter")]
    pub free_diameter: String,
    pub db_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmeConfig {
    pub logger: Logger,
    pub mme: MmeSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmeSection {
    #[serde(rename = "freeDiameter")]
    pub free_diameter: String,
    pub s1ap: Vec<Endpoint>,
    pub gtpc: Vec<Endpoint>,
    pub gummei: Gummei,
    pub tai: TrackingArea,
    pub security: Security,
    pub network_name: NetworkName,
    pub mme_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gummei {
    pub plmn_id: PlmnId,
    pub mme_gid: u16,
    pub mme_code: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SgwcConfig {
    pub logger: Logger,
    pub sgwc: GatewayControlSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayControlSection {
    pub gtpc: Vec<Endpoint>,
    pub pfcp: Vec<Endpoint>,
    /// User-plane peer this control function drives over PFCP.
    pub user_plane: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SgwuConfig {
    pub logger: Logger,
    pub sgwu: GatewayUserSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayUserSection {
    pub pfcp: Vec<Endpoint>,
    pub gtpu: Vec<Endpoint>,
}

// ── Shared session components ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmfConfig {
    pub logger: Logger,
    pub smf: SmfSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmfSection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sbi: Vec<Endpoint>,
    pub pfcp: Vec<Endpoint>,
    pub gtpc: Vec<Endpoint>,
    pub gtpu: Vec<Endpoint>,
    pub subnet: Vec<Subnet>,
    pub dns: Vec<String>,
    pub mtu: u16,
    pub session: SessionQos,
    pub user_plane: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpfConfig {
    pub logger: Logger,
    pub upf: UpfSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpfSection {
    pub pfcp: Vec<Endpoint>,
    pub gtpu: Vec<Endpoint>,
    pub subnet: Vec<Subnet>,
}

// ── 5G components ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NrfConfig {
    pub logger: Logger,
    pub nrf: NrfSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NrfSection {
    pub serving: Vec<ServingPlmn>,
    pub sbi: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServingPlmn {
    pub plmn_id: PlmnId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AusfConfig {
    pub logger: Logger,
    pub ausf: SbiOnlySection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbiOnlySection {
    pub sbi: Vec<Endpoint>,
    pub nrf: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NssfConfig {
    pub logger: Logger,
    pub nssf: NssfSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NssfSection {
    pub sbi: Vec<Endpoint>,
    pub nsi: Vec<NetworkSliceInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSliceInstance {
    pub nrf: Endpoint,
    pub s_nssai: SNssai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmfConfig {
    pub logger: Logger,
    pub amf: AmfSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmfSection {
    pub sbi: Vec<Endpoint>,
    pub ngap: Vec<Endpoint>,
    pub guami: Vec<Guami>,
    pub tai: Vec<TrackingArea>,
    pub plmn_support: Vec<PlmnSupport>,
    pub security: Security,
    pub network_name: NetworkName,
    pub amf_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guami {
    pub plmn_id: PlmnId,
    pub amf_id: AmfId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmfId {
    pub region: u8,
    pub set: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlmnSupport {
    pub plmn_id: PlmnId,
    pub s_nssai: Vec<SNssai>,
}

// ── Component union ─────────────────────────────────────────────────

/// Typed configuration for any managed component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentConfig {
    Hss(HssConfig),
    Mme(MmeConfig),
    Sgwc(SgwcConfig),
    Sgwu(SgwuConfig),
    Smf(SmfConfig),
    Upf(UpfConfig),
    Nrf(NrfConfig),
    Ausf(AusfConfig),
    Nssf(NssfConfig),
    Amf(AmfConfig),
}

/// PLMN and tracking area recovered from a rendered artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredIdentity {
    pub mcc: String,
    pub mnc: String,
    pub tac: u16,
}

impl ComponentConfig {
    pub fn component(&self) -> Component {
        match self {
            Self::Hss(_) => Component::Hss,
            Self::Mme(_) => Component::Mme,
            Self::Sgwc(_) => Component::Sgwc,
            Self::Sgwu(_) => Component::Sgwu,
            Self::Smf(_) => Component::Smf,
            Self::Upf(_) => Component::Upf,
            Self::Nrf(_) => Component::Nrf,
            Self::Ausf(_) => Component::Ausf,
            Self::Nssf(_) => Component::Nssf,
            Self::Amf(_) => Component::Amf,
        }
    }

    /// Serialize to the YAML text the component reads.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        match self {
            Self::Hss(c) => serde_yaml::to_string(c),
            Self::Mme(c) => serde_yaml::to_string(c),
            Self::Sgwc(c) => serde_yaml::to_string(c),
            Self::Sgwu(c) => serde_yaml::to_string(c),
            Self::Smf(c) => serde_yaml::to_string(c),
            Self::Upf(c) => serde_yaml::to_string(c),
            Self::Nrf(c) => serde_yaml::to_string(c),
            Self::Ausf(c) => serde_yaml::to_string(c),
            Self::Nssf(c) => serde_yaml::to_string(c),
            Self::Amf(c) => serde_yaml::to_string(c),
        }
    }

    /// Parse a rendered artifact back into its typed form.
    pub fn from_yaml(component: Component, bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        Ok(match component {
            Component::Hss => Self::Hss(serde_yaml::from_slice(bytes)?),
            Component::Mme => Self::Mme(serde_yaml::from_slice(bytes)?),
            Component::Sgwc => Self::Sgwc(serde_yaml::from_slice(bytes)?),
            Component::Sgwu => Self::Sgwu(serde_yaml::from_slice(bytes)?),
            Component::Smf => Self::Smf(serde_yaml::from_slice(bytes)?),
            Component::Upf => Self::Upf(serde_yaml::from_slice(bytes)?),
            Component::Nrf => Self::Nrf(serde_yaml::from_slice(bytes)?),
            Component::Ausf => Self::Ausf(serde_yaml::from_slice(bytes)?),
            Component::Nssf => Self::Nssf(serde_yaml::from_slice(bytes)?),
            Component::Amf => Self::Amf(serde_yaml::from_slice(bytes)?),
        })
    }

    /// Identity fields, for the components that carry a tracking area.
    pub fn identity(&self) -> Option<RecoveredIdentity> {
        let tai = match self {
            Self::Mme(c) => &c.mme.tai,
            Self::Amf(c) => c.amf.tai.first()?,
            _ => return None,
        };
        Some(RecoveredIdentity {
            mcc: tai.plmn_id.mcc.clone(),
            mnc: tai.plmn_id.mnc.clone(),
            tac: tai.tac,
        })
    }
}
