//! Machine registry.
//!
//! The set of machines is fixed at construction; each entry is guarded by
//! its own mutex so operations on one machine serialize without blocking
//! the others. Cycle timers run on the supplied tokio runtime and take the
//! same per-entry lock when they fire.

use crate::error::LaundryError;
use crate::events::{EventSink, MachineEvent, NoopSink};
use crate::machine::{Machine, MachineSnapshot, SerialNumber};
use crate::timer::CycleTimer;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

type Entry = Arc<Mutex<Machine>>;

pub struct MachineRegistry {
    entries: Vec<Entry>,
    index: HashMap<SerialNumber, usize>,
    runtime: Handle,
    sink: Arc<dyn EventSink>,
    next_cycle: AtomicU64,
}

fn lock(entry: &Mutex<Machine>) -> MutexGuard<'_, Machine> {
    entry.lock().unwrap_or_else(|e| e.into_inner())
}

impl MachineRegistry {
    /// Build the registry in load order. Duplicate serial numbers are rejected.
    pub fn new<I>(machines: I, runtime: Handle) -> Result<Self, LaundryError>
    where
        I: IntoIterator<Item = Machine>,
    {
        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for machine in machines {
            let serial = machine.serial_number();
            if index.insert(serial, entries.len()).is_some() {
                return Err(LaundryError::DuplicateSerial(serial));
            }
            entries.push(Arc::new(Mutex::new(machine)));
        }
        info!("Machine registry built with {} machine(s)", entries.len());
        Ok(Self {
            entries,
            index,
            runtime,
            sink: Arc::new(NoopSink),
            next_cycle: AtomicU64::new(1),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, serial: SerialNumber) -> bool {
        self.index.contains_key(&serial)
    }

    fn entry(&self, serial: SerialNumber) -> Result<&Entry, LaundryError> {
        self.index
            .get(&serial)
            .map(|&i| &self.entries[i])
            .ok_or(LaundryError::NotFound(serial))
    }

    /// Start a cycle of `duration` on an available machine.
    pub fn start_cycle(
        &self,
        serial: SerialNumber,
        duration: Duration,
    ) -> Result<MachineSnapshot, LaundryError> {
        let entry = self.entry(serial)?;
        let cycle_id = self.next_cycle.fetch_add(1, Ordering::Relaxed);

        let result = {
            let mut machine = lock(entry);
            machine
                .begin_cycle(cycle_id, Instant::now(), duration)
                .map(|()| {
                    let timer = self.spawn_timer(Arc::clone(entry), serial, cycle_id, duration);
                    machine.attach_timer(timer);
                    machine.snapshot()
                })
        };

        match &result {
            Ok(_) => {
                debug!(
                    "Cycle {} started on machine {} for {:?}",
                    cycle_id, serial, duration
                );
                self.sink.record(&MachineEvent::CycleStarted {
                    serial_number: serial,
                    cycle_id,
                    duration,
                });
            }
            Err(_) => self.sink.record(&MachineEvent::StartRejected {
                serial_number: serial,
            }),
        }
        result
    }

    fn spawn_timer(
        &self,
        entry: Entry,
        serial: SerialNumber,
        cycle_id: u64,
        duration: Duration,
    ) -> CycleTimer {
        let sink = Arc::clone(&self.sink);
        CycleTimer::spawn(&self.runtime, duration, move || {
            let finished = lock(&entry).finish_cycle(cycle_id);
            if finished {
                debug!("Cycle {} on machine {} finished", cycle_id, serial);
                sink.record(&MachineEvent::CycleFinished {
                    serial_number: serial,
                    cycle_id,
                });
            } else {
                debug!(
                    "Ignoring stale timer for cycle {} on machine {}",
                    cycle_id, serial
                );
            }
        })
    }

    pub fn status(&self, serial: SerialNumber) -> Result<MachineSnapshot, LaundryError> {
        let entry = self.entry(serial)?;
        let snapshot = lock(entry).snapshot();
        Ok(snapshot)
    }

    /// Snapshots of every machine, in load order.
    pub fn statuses(&self) -> Vec<MachineSnapshot> {
        let now = Instant::now();
        self.entries
            .iter()
            .map(|entry| lock(entry).snapshot_at(now))
            .collect()
    }

    /// Reset a single machine. A running machine is rejected rather than
    /// stopped; use [`MachineRegistry::reset_all`] to force.
    pub fn reset(&self, serial: SerialNumber) -> Result<MachineSnapshot, LaundryError> {
        let entry = self.entry(serial)?;
        let result = {
            let mut machine = lock(entry);
            machine.reset().map(|()| machine.snapshot())
        };

        let event = match &result {
            Ok(_) => MachineEvent::MachineReset {
                serial_number: serial,
            },
            Err(_) => MachineEvent::ResetRejected {
                serial_number: serial,
            },
        };
        self.sink.record(&event);
        result
    }

    /// Clear every machine regardless of occupancy, cancelling running
    /// timers. Returns the number of cycles cancelled.
    pub fn reset_all(&self) -> usize {
        let cancelled = self
            .entries
            .iter()
            .filter(|entry| lock(entry).force_reset())
            .count();
        info!(
            "Reset all {} machine(s), cancelled {} running cycle(s)",
            self.entries.len(),
            cancelled
        );
        self.sink.record(&MachineEvent::AllReset {
            machines: self.entries.len(),
            cycles_cancelled: cancelled,
        });
        cancelled
    }

    pub fn in_use_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| lock(entry).is_occupied())
            .count()
    }
}
