// ── Intent validation ──
//
// Semantic checks that a well-formed intent can still fail: address
// relationships and generation-specific fields. Every check runs, so the
// caller gets the full list of problems in one pass.

use std::net::IpAddr;

use serde::Serialize;

use crate::model::{Cidr, Generation, NetworkIntent};

const NETWORK_NAME_MAX: usize = 64;
/// Longest IPv4 prefix that still leaves host addresses for devices.
const MAX_IPV4_POOL_PREFIX: u8 = 30;

/// Result of [`validate`]. Reasons are in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub reasons: Vec<String>,
}

impl Validation {
    pub fn ok(&self) -> bool {
        self.reasons.is_empty()
    }
}

pub fn validate(intent: &NetworkIntent) -> Validation {
    let mut reasons = Vec::new();

    // Generation-specific fields
    match (intent.generation, &intent.radio.network_slice) {
        (Generation::FiveG, None) => {
            reasons.push("5G deployment requires a network slice".to_owned());
        }
        (Generation::FourG, Some(_)) => {
            reasons.push("4G deployment must not carry a network slice".to_owned());
        }
        _ => {}
    }

    let name_len = intent.identity.network_name.chars().count();
    if name_len == 0 || name_len > NETWORK_NAME_MAX {
        reasons.push(format!(
            "network name must be 1-{NETWORK_NAME_MAX} characters, got {name_len}"
        ));
    }
    if intent.radio.apn.trim().is_empty() {
        reasons.push("APN must not be empty".to_owned());
    }

    // Address syntax
    let addressing = &intent.addressing;
    let core = parse_ip("core address", &addressing.core_address, &mut reasons);
    let gateway = parse_ip("device gateway", &addressing.device_gateway, &mut reasons);
    let pool = match addressing.device_pool.parse::<Cidr>() {
        Ok(pool) => Some(pool),
        Err(e) => {
            reasons.push(format!(
                "device pool '{}' is not a valid CIDR: {e}",
                addressing.device_pool
            ));
            None
        }
    };

    // Address relationships
    if let Some(pool) = pool {
        if pool.is_ipv4() && pool.prefix() > MAX_IPV4_POOL_PREFIX {
            reasons.push(format!(
                "device pool {pool} leaves no room for devices (prefix must be <= {MAX_IPV4_POOL_PREFIX})"
            ));
        }
        if let Some(gateway) = gateway {
            let edge = gateway == pool.network()
                || pool.broadcast().map(IpAddr::V4) == Some(gateway);
            if !pool.contains(gateway) {
                reasons.push(format!(
                    "device gateway {gateway} is not in device pool {pool}"
                ));
            } else if edge {
                reasons.push(format!(
                    "device gateway {gateway} is the network or broadcast address of {pool}"
                ));
            }
        }
        if let Some(core) = core {
            if pool.contains(core) {
                reasons.push(format!(
                    "core address {core} must not be inside device pool {pool}"
                ));
            }
        }
    }

    // DNS
    if addressing.dns_servers.is_empty() {
        reasons.push("at least one DNS server is required".to_owned());
    }
    for server in &addressing.dns_servers {
        if server.parse::<IpAddr>().is_err() {
            reasons.push(format!("DNS server '{server}' is not a valid IP address"));
        }
    }

    Validation { reasons }
}

fn parse_ip(field: &str, raw: &str, reasons: &mut Vec<String>) -> Option<IpAddr> {
    match raw.parse::<IpAddr>() {
        Ok(ip) => Some(ip),
        Err(_) => {
            reasons.push(format!("{field} '{raw}' is not a valid IP address"));
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{NetworkSlice, SliceId, SliceServiceType};

    fn intent() -> NetworkIntent {
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

    #[test]
    fn valid_four_g_intent_passes() {
        let v = validate(&intent());
        assert!(v.ok(), "{:?}", v.reasons);
    }

    #[test]
    fn five_g_without_slice_is_rejected() {
        let mut i = intent();
        i.generation = Generation::FiveG;
        let v = validate(&i);
        assert!(!v.ok());
        assert!(v.reasons[0].contains("requires a network slice"));
    }

    #[test]
    fn four_g_with_slice_is_rejected() {
        let mut i = intent();
        i.radio.network_slice = Some(NetworkSlice {
            service_type: SliceServiceType::new(1).unwrap(),
            slice_id: SliceId::new("000001").unwrap(),
        });
        assert!(validate(&i).reasons[0].contains("must not carry"));
    }

    #[test]
    fn gateway_outside_pool() {
        let mut i = intent();
        i.addressing.device_gateway = "10.48.100.1".into();
        let v = validate(&i);
        assert_eq!(v.reasons.len(), 1);
        assert!(v.reasons[0].contains("not in device pool"));
    }

    #[test]
    fn gateway_on_network_address() {
        let mut i = intent();
        i.addressing.device_gateway = "10.48.99.0".into();
        assert!(validate(&i).reasons[0].contains("network or broadcast"));
    }

    #[test]
    fn core_inside_pool() {
        let mut i = intent();
        i.addressing.core_address = "10.48.99.20".into();
        assert!(validate(&i).reasons[0].contains("must not be inside"));
    }

    #[test]
    fn accumulates_every_problem() {
        let mut i = intent();
        i.addressing.core_address = "not-an-ip".into();
        i.addressing.device_pool = "10.48.99.0".into();
        i.addressing.dns_servers = vec!["8.8.8.8".into(), "dns.example".into()];
        let v = validate(&i);
        assert_eq!(v.reasons.len(), 3, "{:?}", v.reasons);
        assert!(v.reasons[0].starts_with("core address"));
        assert!(v.reasons[1].starts_with("device pool"));
        assert!(v.reasons[2].contains("dns.example"));
    }

    #[test]
    fn empty_dns_list_is_rejected() {
        let mut i = intent();
        i.addressing.dns_servers.clear();
        assert!(validate(&i).reasons[0].contains("at least one DNS"));
    }

    #[test]
    fn tiny_pool_is_rejected() {
        let mut i = intent();
        i.addressing.device_pool = "10.48.99.0/31".into();
        i.addressing.device_gateway = "10.48.99.1".into();
        let v = validate(&i);
        assert!(v.reasons[0].contains("leaves no room"));
    }

    #[test]
    fn validation_is_deterministic() {
        let mut i = intent();
        i.addressing.device_gateway = "bogus".into();
        assert_eq!(validate(&i), validate(&i));
    }
}
