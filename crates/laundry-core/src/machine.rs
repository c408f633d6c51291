use crate::error::LaundryError;
use crate::timer::CycleTimer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

pub type SerialNumber = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineKind {
    Washer,
    Dryer,
}

impl MachineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Washer => "washer",
            Self::Dryer => "dryer",
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MachineKind {
    type Err = LaundryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "washer" => Ok(Self::Washer),
            "dryer" => Ok(Self::Dryer),
            other => Err(LaundryError::InvalidKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupancy {
    Available,
    InUse,
}

impl Occupancy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in_use",
        }
    }
}

/// A running cycle. Remaining time is always derived from `started_at`
/// and `duration`, never stored.
#[derive(Debug)]
struct ActiveCycle {
    id: u64,
    started_at: Instant,
    duration: Duration,
    timer: Option<CycleTimer>,
}

impl ActiveCycle {
    fn remaining_at(&self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.started_at);
        self.duration.saturating_sub(elapsed)
    }
}

#[derive(Debug)]
pub struct Machine {
    kind: MachineKind,
    name: String,
    serial_number: SerialNumber,
    cycle: Option<ActiveCycle>,
}

/// Point-in-time view of a machine, detached from its lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSnapshot {
    pub serial_number: SerialNumber,
    pub name: String,
    pub kind: MachineKind,
    pub occupancy: Occupancy,
    /// `Some` while a cycle is running, clamped at zero.
    pub remaining: Option<Duration>,
}

impl MachineSnapshot {
    pub fn is_occupied(&self) -> bool {
        self.occupancy == Occupancy::InUse
    }

    /// Remaining time as `MM:SS`, or `None` when the machine is available.
    pub fn time_remaining(&self) -> Option<String> {
        self.remaining.map(format_remaining)
    }
}

impl Machine {
    pub fn new(kind: MachineKind, name: impl Into<String>, serial_number: SerialNumber) -> Self {
        Self {
            kind,
            name: name.into(),
            serial_number,
            cycle: None,
        }
    }

    pub fn kind(&self) -> MachineKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn serial_number(&self) -> SerialNumber {
        self.serial_number
    }

    pub fn is_occupied(&self) -> bool {
        self.cycle.is_some()
    }

    pub fn cycle_id(&self) -> Option<u64> {
        self.cycle.as_ref().map(|c| c.id)
    }

    /// Mark the machine occupied for `duration` starting at `started_at`.
    pub fn begin_cycle(
        &mut self,
        cycle_id: u64,
        started_at: Instant,
        duration: Duration,
    ) -> Result<(), LaundryError> {
        if self.cycle.is_some() {
            return Err(LaundryError::AlreadyOccupied(self.serial_number));
        }
        self.cycle = Some(ActiveCycle {
            id: cycle_id,
            started_at,
            duration,
            timer: None,
        });
        Ok(())
    }

    /// Bind the countdown that will end the current cycle. A timer that
    /// arrives with no cycle to own it is cancelled immediately.
    pub fn attach_timer(&mut self, timer: CycleTimer) {
        match self.cycle.as_mut() {
            Some(cycle) => cycle.timer = Some(timer),
            None => timer.cancel(),
        }
    }

    /// End cycle `cycle_id`. Returns false if that cycle is no longer the
    /// current one (already finished, reset, or superseded).
    pub fn finish_cycle(&mut self, cycle_id: u64) -> bool {
        if self.cycle_id() != Some(cycle_id) {
            return false;
        }
        self.cycle = None;
        true
    }

    /// Reset an idle machine. Running machines are rejected.
    pub fn reset(&mut self) -> Result<(), LaundryError> {
        if self.cycle.is_some() {
            return Err(LaundryError::InUse(self.serial_number));
        }
        Ok(())
    }

    /// Clear any running cycle and cancel its timer. Returns true if a
    /// cycle was cancelled.
    pub fn force_reset(&mut self) -> bool {
        match self.cycle.take() {
            Some(cycle) => {
                if let Some(timer) = cycle.timer {
                    timer.cancel();
                }
                true
            }
            None => false,
        }
    }

    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.cycle.as_ref().map(|c| c.remaining_at(now))
    }

    pub fn snapshot_at(&self, now: Instant) -> MachineSnapshot {
        let remaining = self.remaining_at(now);
        MachineSnapshot {
            serial_number: self.serial_number,
            name: self.name.clone(),
            kind: self.kind,
            occupancy: if remaining.is_some() {
                Occupancy::InUse
            } else {
                Occupancy::Available
            },
            remaining,
        }
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        self.snapshot_at(Instant::now())
    }
}

/// Format whole remaining seconds as `MM:SS`. Minutes are not wrapped into
/// hours, so a 90 minute cycle starts at `90:00`.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
