// ── Identity newtypes ──
//
// Constrained string and integer types for PLMN identity, subscriber
// identity and network slices. Each one rejects malformed input at
// construction (and therefore at deserialization), so the rest of the
// crate never sees a non-numeric country code or a 14-digit IMSI.

use std::fmt;
use std::num::NonZeroU16;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A field of a network intent that could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct IntentError {
    pub field: &'static str,
    pub reason: String,
}

impl IntentError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Implements `Display`, `FromStr`, `AsRef<str>` and the serde
/// `try_from`/`into` plumbing for a validated `String` newtype.
macro_rules! string_newtype {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IntentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IntentError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(&s)
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.0
            }
        }
    };
}

// ── CountryCode ─────────────────────────────────────────────────────

/// Mobile country code: exactly three decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(raw: &str) -> Result<Self, IntentError> {
        if raw.len() == 3 && all_digits(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(IntentError::new(
                "country_code",
                format!("must be 3 digits, got '{raw}'"),
            ))
        }
    }
}

string_newtype!(CountryCode);

// ── NetworkCode ─────────────────────────────────────────────────────

/// Mobile network code: two or three decimal digits. Leading zeros are
/// significant (`"010"` and `"10"` are different networks).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkCode(String);

impl NetworkCode {
    pub fn new(raw: &str) -> Result<Self, IntentError> {
        if (2..=3).contains(&raw.len()) && all_digits(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(IntentError::new(
                "network_code",
                format!("must be 2-3 digits, got '{raw}'"),
            ))
        }
    }
}

string_newtype!(NetworkCode);

// ── AreaCode ────────────────────────────────────────────────────────

/// Tracking area code, 1..=65535.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct AreaCode(NonZeroU16);

impl AreaCode {
    pub fn new(value: u32) -> Result<Self, IntentError> {
        u16::try_from(value)
            .ok()
            .and_then(NonZeroU16::new)
            .map(Self)
            .ok_or_else(|| {
                IntentError::new("area_code", format!("must be in 1..=65535, got {value}"))
            })
    }

    pub fn get(self) -> u16 {
        self.0.get()
    }
}

impl TryFrom<u32> for AreaCode {
    type Error = IntentError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AreaCode> for u32 {
    fn from(v: AreaCode) -> Self {
        u32::from(v.get())
    }
}

impl fmt::Display for AreaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Imsi ────────────────────────────────────────────────────────────

/// Subscriber identity: exactly fifteen decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Imsi(String);

impl Imsi {
    pub const LEN: usize = 15;

    pub fn new(raw: &str) -> Result<Self, IntentError> {
        if raw.len() == Self::LEN && all_digits(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(IntentError::new(
                "imsi",
                format!("must be {} digits, got '{raw}'", Self::LEN),
            ))
        }
    }

    /// Last four digits, used for default device names.
    pub fn suffix(&self) -> &str {
        &self.0[Self::LEN - 4..]
    }
}

string_newtype!(Imsi);

// ── Network slice ───────────────────────────────────────────────────

/// Slice/service type (SST). Only the three standardised values are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SliceServiceType(u8);

impl SliceServiceType {
    pub fn new(value: u8) -> Result<Self, IntentError> {
        if (1..=3).contains(&value) {
            Ok(Self(value))
        } else {
            Err(IntentError::new(
                "service_type",
                format!("must be 1, 2 or 3, got {value}"),
            ))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SliceServiceType {
    type Error = IntentError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SliceServiceType> for u8 {
    fn from(v: SliceServiceType) -> Self {
        v.0
    }
}

/// Slice differentiator (SD): six hexadecimal digits, normalised to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SliceId(String);

impl SliceId {
    pub fn new(raw: &str) -> Result<Self, IntentError> {
        if raw.len() == 6 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(IntentError::new(
                "slice_id",
                format!("must be 6 hex digits, got '{raw}'"),
            ))
        }
    }
}

string_newtype!(SliceId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn country_code_requires_three_digits() {
        assert!(CountryCode::new("315").is_ok());
        assert!(CountryCode::new("99").is_err());
        assert!(CountryCode::new("31a").is_err());
        assert!(CountryCode::new("3150").is_err());
    }

    #[test]
    fn network_code_keeps_leading_zero() {
        let mnc = NetworkCode::new("010").unwrap();
        assert_eq!(mnc.as_str(), "010");
        assert!(NetworkCode::new("01").is_ok());
        assert!(NetworkCode::new("1").is_err());
        assert!(NetworkCode::new("0100").is_err());
    }

    #[test]
    fn area_code_bounds() {
        assert!(AreaCode::new(0).is_err());
        assert_eq!(AreaCode::new(1).unwrap().get(), 1);
        assert_eq!(AreaCode::new(65535).unwrap().get(), 65535);
        assert!(AreaCode::new(65536).is_err());
    }

    #[test]
    fn imsi_suffix() {
        let imsi = Imsi::new("315010000000042").unwrap();
        assert_eq!(imsi.suffix(), "0042");
        assert!(Imsi::new("31501000000004").is_err());
    }

    #[test]
    fn slice_id_normalises_case() {
        assert_eq!(SliceId::new("00ABcd").unwrap().as_str(), "00abcd");
        assert!(SliceId::new("00001").is_err());
        assert!(SliceId::new("00000g").is_err());
    }

    #[test]
    fn deserialization_rejects_bad_country_code() {
        let err = serde_json::from_str::<CountryCode>("\"abc\"").unwrap_err();
        assert!(err.to_string().contains("country_code"));
    }
}
