// ── Log events ──
//
// Typed facts extracted from a single line of core log text.

use std::fmt;
use std::net::IpAddr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::identity::Imsi;
use super::intent::Generation;

/// Log line timestamp. The core does not log the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogTimestamp {
    pub month: u8,
    pub day: u8,
    pub time: NaiveTime,
}

impl fmt::Display for LogTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02} {}",
            self.month,
            self.day,
            self.time.format("%H:%M:%S%.3f")
        )
    }
}

/// Running totals the mobility function logs whenever they change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreCounter {
    /// Connected eNodeBs / gNodeBs.
    Radios,
    /// Device contexts held by the radios.
    RadioDevices,
    /// Active PDN / PDU sessions.
    Sessions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    DeviceAttached {
        imsi: Imsi,
    },
    DeviceDetached {
        imsi: Imsi,
    },
    RadioConnected {
        address: IpAddr,
        /// SCTP source port, when logged.
        port: Option<u16>,
        generation: Generation,
    },
    RadioDisconnected {
        address: IpAddr,
        generation: Generation,
    },
    ServiceStarted {
        service: String,
    },
    SessionCreated {
        imsi: Imsi,
        /// APN (4G) or DNN (5G).
        apn: String,
        address: IpAddr,
    },
    CounterReported {
        counter: CoreCounter,
        value: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: LogTimestamp,
    /// Component tag from the line, e.g. `mme` or `amf`.
    pub component: String,
    #[serde(flatten)]
    pub kind: EventKind,
}
