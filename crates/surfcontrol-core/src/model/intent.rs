// ── Network intent ──
//
// The operator-facing, vendor-neutral description of a network. Identity
// fields are checked at construction; addresses stay as text so the
// validator can report every problem at once instead of failing on the
// first unparseable field.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::identity::{AreaCode, CountryCode, NetworkCode, SliceId, SliceServiceType};

/// Radio generation of the managed core.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
pub enum Generation {
    #[serde(rename = "4G")]
    #[strum(to_string = "4G", serialize = "4g")]
    FourG,
    #[serde(rename = "5G")]
    #[strum(to_string = "5G", serialize = "5g")]
    FiveG,
}

/// PLMN identity, tracking area and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkIdentity {
    pub country_code: CountryCode,
    pub network_code: NetworkCode,
    pub area_code: AreaCode,
    pub network_name: String,
}

impl NetworkIdentity {
    /// Concatenated MCC+MNC, as used in subscriber records.
    pub fn plmn(&self) -> String {
        format!("{}{}", self.country_code, self.network_code)
    }
}

/// Control-plane and device addressing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Addressing {
    /// Address the core binds its control-plane interfaces to.
    pub core_address: String,
    /// CIDR pool devices are assigned from, e.g. `10.48.99.0/24`.
    pub device_pool: String,
    /// Gateway address handed to devices; must sit inside `device_pool`.
    pub device_gateway: String,
    #[serde(default = "default_dns_servers")]
    pub dns_servers: Vec<String>,
}

fn default_dns_servers() -> Vec<String> {
    vec!["8.8.8.8".into(), "8.8.4.4".into()]
}

/// 5G network slice (S-NSSAI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSlice {
    pub service_type: SliceServiceType,
    pub slice_id: SliceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadioParameters {
    /// APN (4G) or DNN (5G) devices attach to.
    pub apn: String,
    pub frequency_band: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_slice: Option<NetworkSlice>,
}

/// A complete network intent document.
///
/// Values are never mutated in place by the daemon: a change of intent is a
/// new `NetworkIntent` submitted to [`Orchestrator::deploy`](crate::Orchestrator::deploy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkIntent {
    pub generation: Generation,
    pub identity: NetworkIdentity,
    pub addressing: Addressing,
    pub radio: RadioParameters,
    /// Name of the QoS tier applied to the default session.
    #[serde(default = "default_service_quality")]
    pub service_quality: String,
}

fn default_service_quality() -> String {
    "standard".into()
}

impl NetworkIntent {
    /// Parse an intent document. YAML is a superset of JSON, so both work.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DOC: &str = r#"
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
"#;

    #[test]
    fn parses_minimal_document_with_defaults() {
        let intent = NetworkIntent::from_yaml(DOC).unwrap();
        assert_eq!(intent.generation, Generation::FourG);
        assert_eq!(intent.identity.plmn(), "315010");
        assert_eq!(intent.addressing.dns_servers, vec!["8.8.8.8", "8.8.4.4"]);
        assert_eq!(intent.service_quality, "standard");
        assert!(intent.radio.network_slice.is_none());
    }

    #[test]
    fn rejects_non_numeric_country_code_at_construction() {
        let doc = DOC.replace("\"315\"", "\"3x5\"");
        let err = NetworkIntent::from_yaml(&doc).unwrap_err();
        assert!(err.to_string().contains("country_code"), "{err}");
    }

    #[test]
    fn rejects_unknown_fields() {
        let doc = format!("{DOC}template_source: legacy\n");
        assert!(NetworkIntent::from_yaml(&doc).is_err());
    }

    #[test]
    fn generation_round_trips_through_strings() {
        assert_eq!(Generation::FiveG.to_string(), "5G");
        assert_eq!(Generation::FourG.to_string(), "4G");
        assert_eq!("4g".parse::<Generation>().unwrap(), Generation::FourG);
        assert_eq!("5G".parse::<Generation>().unwrap(), Generation::FiveG);
    }

    #[test]
    fn yaml_round_trip_preserves_value() {
        let intent = NetworkIntent::from_yaml(DOC).unwrap();
        let again = NetworkIntent::from_yaml(&intent.to_yaml().unwrap()).unwrap();
        assert_eq!(intent, again);
    }
}
