use crate::machine::SerialNumber;
use std::time::Duration;

/// State transitions reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineEvent {
    CycleStarted {
        serial_number: SerialNumber,
        cycle_id: u64,
        duration: Duration,
    },
    CycleFinished {
        serial_number: SerialNumber,
        cycle_id: u64,
    },
    StartRejected {
        serial_number: SerialNumber,
    },
    MachineReset {
        serial_number: SerialNumber,
    },
    ResetRejected {
        serial_number: SerialNumber,
    },
    AllReset {
        machines: usize,
        cycles_cancelled: usize,
    },
}

/// Receives registry events. Called outside of any machine lock, possibly
/// from a timer task.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &MachineEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _event: &MachineEvent) {}
}
