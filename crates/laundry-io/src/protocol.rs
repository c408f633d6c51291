//! JSON bodies exchanged over the HTTP API.

use laundry_core::{MachineKind, MachineSnapshot, Occupancy, SerialNumber};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct StartWashRequest {
    pub minutes: i64,
}

impl StartWashRequest {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Cycle length, or `None` if `minutes` is not a positive count.
    pub fn duration(&self) -> Option<Duration> {
        u64::try_from(self.minutes)
            .ok()
            .filter(|&m| m > 0)
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn wash_started(name: &str, minutes: i64) -> Self {
        Self {
            message: format!("{name} has started washing for {minutes} minute(s)."),
        }
    }

    pub fn machine_reset(name: &str) -> Self {
        Self {
            message: format!("{name} has been reset."),
        }
    }

    pub fn all_reset() -> Self {
        Self {
            message: "All machines have been reset.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// `"MM:SS"` while a cycle runs, the integer `0` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TimeRemaining {
    Clock(String),
    Idle(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusMsg {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MachineKind,
    pub serial_number: SerialNumber,
    pub status: Occupancy,
    pub time_remaining: TimeRemaining,
}

impl From<&MachineSnapshot> for StatusMsg {
    fn from(snapshot: &MachineSnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            kind: snapshot.kind,
            serial_number: snapshot.serial_number,
            status: snapshot.occupancy,
            time_remaining: match snapshot.time_remaining() {
                Some(clock) => TimeRemaining::Clock(clock),
                None => TimeRemaining::Idle(0),
            },
        }
    }
}
