// ── Log line parser ──
//
// Classifies one line of core log text. Lines look like
//
//   10/28 13:45:01.123: [mme] INFO: eNB-S1 accepted[10.0.1.14]:3223 in s1_path module
//
// Anything that does not carry a timestamp, a component tag and one of the
// known messages yields `None`.

use std::net::IpAddr;
use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;

use crate::model::{CoreCounter, EventKind, Generation, Imsi, LogEvent, LogTimestamp};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("log pattern is a valid regex")
}

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    re(r"^(\d{2})/(\d{2}) (\d{2}):(\d{2}):(\d{2})\.(\d{3}): \[([A-Za-z0-9_-]+)\]\s+(?:[A-Z]+:\s+)?(.*)$")
});

static ATTACHED: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\[(?:imsi-)?(\d{15})\] (?:Attach complete|Registration complete)")
});

static DETACHED: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\[(?:imsi-)?(\d{15})\] (?:Detach request|Deregistration request)")
});

static SESSION_REMOVED: LazyLock<Regex> =
    LazyLock::new(|| re(r"Removed Session: UE IMSI:\[(\d{15})\]"));

static RADIO_ACCEPTED: LazyLock<Regex> =
    LazyLock::new(|| re(r"(eNB-S1|gNB-N2) accepted\[([0-9A-Fa-f:.]+)\](?::(\d+))?"));

static RADIO_REFUSED: LazyLock<Regex> =
    LazyLock::new(|| re(r"(eNB-S1|gNB-N2)\[([0-9A-Fa-f:.]+)\] connection refused"));

static COUNTER: LazyLock<Regex> = LazyLock::new(|| {
    re(r"Number of (eNBs|gNBs|eNB-UEs|gNB-UEs|MME-Sessions|AMF-Sessions) is now (\d+)")
});

static STARTED: LazyLock<Regex> = LazyLock::new(|| re(r"^(\S.*?) initialize\.\.\.done"));

static SESSION: LazyLock<Regex> = LazyLock::new(|| {
    re(r"UE (?:IMSI|SUPI)\[(?:imsi-)?(\d{15})\] (?:APN|DNN)\[([^\]]*)\] IPv4\[([0-9.]+)\]")
});

/// Parse one line. Never panics; unknown or malformed lines are `None`.
pub fn parse_line(line: &str) -> Option<LogEvent> {
    let caps = HEADER.captures(line.trim_end())?;
    let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();

    let month = u8::try_from(num(1)?).ok().filter(|m| (1..=12).contains(m))?;
    let day = u8::try_from(num(2)?).ok().filter(|d| (1..=31).contains(d))?;
    let time = NaiveTime::from_hms_milli_opt(num(3)?, num(4)?, num(5)?, num(6)?)?;
    let component = caps.get(7)?.as_str().to_owned();
    let body = caps.get(8)?.as_str();

    Some(LogEvent {
        timestamp: LogTimestamp { month, day, time },
        component,
        kind: classify(body)?,
    })
}

fn classify(body: &str) -> Option<EventKind> {
    if let Some(c) = SESSION.captures(body) {
        return Some(EventKind::SessionCreated {
            imsi: Imsi::new(c.get(1)?.as_str()).ok()?,
            apn: c.get(2)?.as_str().to_owned(),
            address: c.get(3)?.as_str().parse().ok()?,
        });
    }
    if let Some(c) = ATTACHED.captures(body) {
        return Some(EventKind::DeviceAttached {
            imsi: Imsi::new(c.get(1)?.as_str()).ok()?,
        });
    }
    if let Some(c) = DETACHED
        .captures(body)
        .or_else(|| SESSION_REMOVED.captures(body))
    {
        return Some(EventKind::DeviceDetached {
            imsi: Imsi::new(c.get(1)?.as_str()).ok()?,
        });
    }
    if let Some(c) = RADIO_ACCEPTED.captures(body) {
        let (address, generation) = radio(c.get(1)?.as_str(), c.get(2)?.as_str())?;
        let port = match c.get(3) {
            Some(p) => Some(p.as_str().parse().ok()?),
            None => None,
        };
        return Some(EventKind::RadioConnected {
            address,
            port,
            generation,
        });
    }
    if let Some(c) = RADIO_REFUSED.captures(body) {
        let (address, generation) = radio(c.get(1)?.as_str(), c.get(2)?.as_str())?;
        return Some(EventKind::RadioDisconnected {
            address,
            generation,
        });
    }
    if let Some(c) = COUNTER.captures(body) {
        let counter = match c.get(1)?.as_str() {
            "eNBs" | "gNBs" => CoreCounter::Radios,
            "eNB-UEs" | "gNB-UEs" => CoreCounter::RadioDevices,
            _ => CoreCounter::Sessions,
        };
        return Some(EventKind::CounterReported {
            counter,
            value: c.get(2)?.as_str().parse().ok()?,
        });
    }
    if let Some(c) = STARTED.captures(body) {
        return Some(EventKind::ServiceStarted {
            service: c.get(1)?.as_str().to_owned(),
        });
    }
    None
}

fn radio(interface: &str, address: &str) -> Option<(IpAddr, Generation)> {
    let generation = if interface.starts_with("gNB") {
        Generation::FiveG
    } else {
        Generation::FourG
    };
    Some((address.parse().ok()?, generation))
}
