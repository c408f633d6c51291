use crate::infra::audit::{describe, AuditLogger};
use laundry_core::{EventSink, MachineEvent, TimeBase};
use laundry_io::metrics::{
    init_metrics, serve_metrics, CYCLES_CANCELLED, CYCLES_FINISHED, CYCLES_STARTED,
    MACHINES_IN_USE, MACHINES_REGISTERED, RESET_CONFLICTS, START_CONFLICTS,
};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

pub fn record_registered(machines: usize) {
    MACHINES_REGISTERED.set(machines as i64);
}

/// Feeds registry events into Prometheus and, when enabled, the audit log.
pub struct TelemetrySink {
    timebase: TimeBase,
    audit: Option<Arc<AuditLogger>>,
}

impl TelemetrySink {
    pub fn new(timebase: TimeBase, audit: Option<Arc<AuditLogger>>) -> Self {
        Self { timebase, audit }
    }

    fn update_metrics(event: &MachineEvent) {
        match event {
            MachineEvent::CycleStarted { .. } => {
                CYCLES_STARTED.inc();
                MACHINES_IN_USE.inc();
            }
            MachineEvent::CycleFinished { .. } => {
                CYCLES_FINISHED.inc();
                MACHINES_IN_USE.dec();
            }
            MachineEvent::StartRejected { .. } => START_CONFLICTS.inc(),
            MachineEvent::ResetRejected { .. } => RESET_CONFLICTS.inc(),
            MachineEvent::MachineReset { .. } => {}
            MachineEvent::AllReset {
                cycles_cancelled, ..
            } => {
                CYCLES_CANCELLED.inc_by(*cycles_cancelled as u64);
                MACHINES_IN_USE.sub(*cycles_cancelled as i64);
            }
        }
    }
}

impl EventSink for TelemetrySink {
    fn record(&self, event: &MachineEvent) {
        Self::update_metrics(event);

        if let Some(ref logger) = self.audit {
            let (event_type, details) = describe(event);
            if let Err(e) = logger.log_event(
                self.timebase.now_us(),
                self.timebase.unix_us(),
                event_type,
                details,
            ) {
                warn!(error = %e, "Failed to write audit entry");
            }
        }
    }
}
