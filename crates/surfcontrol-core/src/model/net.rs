// ── Address helpers ──

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CidrError {
    #[error("'{0}' is missing a '/prefix' suffix")]
    MissingPrefix(String),
    #[error("invalid address '{0}'")]
    Address(String),
    #[error("invalid prefix length '{0}'")]
    Prefix(String),
    #[error("prefix length must be <= {max}, got {got}")]
    PrefixTooLong { max: u8, got: u8 },
}

/// An IPv4 or IPv6 network in `addr/prefix` form.
///
/// The address part is kept as written (`10.0.0.7/24` stays distinct from
/// `10.0.0.0/24`); [`network`](Self::network) gives the masked address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    addr: IpAddr,
    prefix: u8,
}

impl Cidr {
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn is_ipv4(&self) -> bool {
        self.addr.is_ipv4()
    }

    pub fn network(&self) -> IpAddr {
        match self.addr {
            IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4) & v4_mask(self.prefix))),
            IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6) & v6_mask(self.prefix))),
        }
    }

    /// Highest address of an IPv4 network. IPv6 has no broadcast address.
    pub fn broadcast(&self) -> Option<Ipv4Addr> {
        match self.addr {
            IpAddr::V4(v4) => Some(Ipv4Addr::from(u32::from(v4) | !v4_mask(self.prefix))),
            IpAddr::V6(_) => None,
        }
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = v4_mask(self.prefix);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = v6_mask(self.prefix);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

fn v4_mask(prefix: u8) -> u32 {
    u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0)
}

fn v6_mask(prefix: u8) -> u128 {
    u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0)
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, prefix) = s
            .split_once('/')
            .ok_or_else(|| CidrError::MissingPrefix(s.to_owned()))?;
        let addr = host
            .parse::<IpAddr>()
            .map_err(|_| CidrError::Address(host.to_owned()))?;
        let prefix = prefix
            .parse::<u8>()
            .map_err(|_| CidrError::Prefix(prefix.to_owned()))?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(CidrError::PrefixTooLong { max, got: prefix });
        }
        Ok(Self { addr, prefix })
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_masks() {
        let cidr: Cidr = "10.48.99.7/24".parse().unwrap();
        assert_eq!(cidr.prefix(), 24);
        assert_eq!(cidr.network(), ip("10.48.99.0"));
        assert_eq!(cidr.broadcast(), Some("10.48.99.255".parse().unwrap()));
    }

    #[test]
    fn containment() {
        let cidr: Cidr = "10.48.99.0/24".parse().unwrap();
        assert!(cidr.contains(ip("10.48.99.1")));
        assert!(!cidr.contains(ip("10.48.100.1")));
        assert!(!cidr.contains(ip("::1")));
    }

    #[test]
    fn zero_prefix_contains_everything() {
        let cidr: Cidr = "0.0.0.0/0".parse().unwrap();
        assert!(cidr.contains(ip("203.0.113.9")));
    }

    #[test]
    fn ipv6_networks() {
        let cidr: Cidr = "2001:db8::/32".parse().unwrap();
        assert!(cidr.contains(ip("2001:db8:1::1")));
        assert_eq!(cidr.broadcast(), None);
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!("10.0.0.0".parse::<Cidr>(), Err(CidrError::MissingPrefix(_))));
        assert!(matches!("10.0.0/8".parse::<Cidr>(), Err(CidrError::Address(_))));
        assert!(matches!(
            "10.0.0.0/33".parse::<Cidr>(),
            Err(CidrError::PrefixTooLong { max: 32, got: 33 })
        ));
    }
}
