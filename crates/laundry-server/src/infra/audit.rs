//! Audit trail of machine activity.
//!
//! Every cycle start, completion and reset is appended to a JSONL file so
//! disputes over who used which machine can be settled after the fact.

use laundry_core::{MachineEvent, SerialNumber};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    CycleStarted,
    CycleFinished,
    /// Start requested on an occupied machine
    StartRejected,
    MachineReset,
    /// Reset requested on a running machine
    ResetRejected,
    AllMachinesReset,
    SystemStart,
    SystemShutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Monotonic timestamp in microseconds
    pub timestamp_us: u64,
    /// Wall-clock Unix timestamp in microseconds
    pub unix_us: u64,
    pub event_type: AuditEventType,
    pub details: serde_json::Value,
}

/// Thread-safe audit logger that writes to a JSONL file
pub struct AuditLogger {
    writer: Mutex<BufWriter<File>>,
}

impl AuditLogger {
    /// Open `path` in append mode, creating parent directories as needed.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
        })
    }

    pub fn log(&self, entry: AuditEntry) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        serde_json::to_writer(&mut *writer, &entry)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    pub fn log_event(
        &self,
        timestamp_us: u64,
        unix_us: u64,
        event_type: AuditEventType,
        details: serde_json::Value,
    ) -> std::io::Result<()> {
        self.log(AuditEntry {
            timestamp_us,
            unix_us,
            event_type,
            details,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct CycleDetails {
    serial_number: SerialNumber,
    cycle_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<u64>,
}

fn cycle_details(
    serial_number: SerialNumber,
    cycle_id: u64,
    duration_secs: Option<u64>,
) -> serde_json::Value {
    serde_json::to_value(CycleDetails {
        serial_number,
        cycle_id,
        duration_secs,
    })
    .unwrap_or_default()
}

/// Audit type and details for a registry event.
pub fn describe(event: &MachineEvent) -> (AuditEventType, serde_json::Value) {
    match event {
        MachineEvent::CycleStarted {
            serial_number,
            cycle_id,
            duration,
        } => (
            AuditEventType::CycleStarted,
            cycle_details(*serial_number, *cycle_id, Some(duration.as_secs())),
        ),
        MachineEvent::CycleFinished {
            serial_number,
            cycle_id,
        } => (
            AuditEventType::CycleFinished,
            cycle_details(*serial_number, *cycle_id, None),
        ),
        MachineEvent::StartRejected { serial_number } => (
            AuditEventType::StartRejected,
            serde_json::json!({ "serial_number": serial_number }),
        ),
        MachineEvent::MachineReset { serial_number } => (
            AuditEventType::MachineReset,
            serde_json::json!({ "serial_number": serial_number }),
        ),
        MachineEvent::ResetRejected { serial_number } => (
            AuditEventType::ResetRejected,
            serde_json::json!({ "serial_number": serial_number }),
        ),
        MachineEvent::AllReset {
            machines,
            cycles_cancelled,
        } => (
            AuditEventType::AllMachinesReset,
            serde_json::json!({
                "machines": machines,
                "cycles_cancelled": cycles_cancelled,
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_audit_logger_writes_jsonl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("audit.jsonl");

        let logger = AuditLogger::new(&path).unwrap();

        logger
            .log_event(
                1000,
                1704067200000000,
                AuditEventType::SystemStart,
                serde_json::json!({"machines": 4}),
            )
            .unwrap();

        let (event_type, details) = describe(&MachineEvent::CycleStarted {
            serial_number: 1001,
            cycle_id: 1,
            duration: Duration::from_secs(1800),
        });
        logger
            .log_event(2000, 1704067201000000, event_type, details)
            .unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();

        let lines: Vec<&str> = content.trim().split('\n').collect();
        assert_eq!(lines.len(), 2);

        let entry1: AuditEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(entry1.timestamp_us, 1000);
        assert_eq!(entry1.event_type, AuditEventType::SystemStart);

        let entry2: AuditEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(entry2.event_type, AuditEventType::CycleStarted);
        assert_eq!(entry2.details["serial_number"], 1001);
        assert_eq!(entry2.details["duration_secs"], 1800);
    }

    #[test]
    fn finished_cycles_omit_duration() {
        let (event_type, details) = describe(&MachineEvent::CycleFinished {
            serial_number: 7,
            cycle_id: 3,
        });
        assert_eq!(event_type, AuditEventType::CycleFinished);
        assert!(details.get("duration_secs").is_none());
        assert_eq!(details["cycle_id"], 3);
    }
}
