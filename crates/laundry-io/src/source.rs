//! Startup machine list.
//!
//! The list is a JSON array of `{type, name, serial_number}` records, as
//! exported from the machines table. Extra columns are ignored.

use laundry_core::{LaundryError, Machine, MachineKind, SerialNumber};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct MachineRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub serial_number: SerialNumber,
}

impl MachineRecord {
    pub fn into_machine(self) -> Result<Machine, LaundryError> {
        let kind: MachineKind = self.kind.parse()?;
        Ok(Machine::new(kind, self.name, self.serial_number))
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read machine list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid machine list JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid machine record: {0}")]
    Invalid(#[from] LaundryError),
}

pub fn parse_machines(json: &str) -> Result<Vec<Machine>, SourceError> {
    let records: Vec<MachineRecord> = serde_json::from_str(json)?;
    records
        .into_iter()
        .map(|record| record.into_machine().map_err(SourceError::from))
        .collect()
}

pub fn load_machines(path: &Path) -> Result<Vec<Machine>, SourceError> {
    let json = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let machines = parse_machines(&json)?;
    tracing::info!(
        path = %path.display(),
        count = machines.len(),
        "Loaded machine list"
    );
    Ok(machines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_records_and_ignores_extra_columns() {
        let json = r#"[
            {"id": 1, "created_at": "2024-05-01T10:00:00Z", "type": "washer", "name": "Washer 1", "serial_number": 1001},
            {"id": 2, "type": "dryer", "name": "Dryer 1", "serial_number": 2001}
        ]"#;
        let machines = parse_machines(json).unwrap();
        assert_eq!(machines.len(), 2);
        assert_eq!(machines[0].kind(), MachineKind::Washer);
        assert_eq!(machines[0].name(), "Washer 1");
        assert_eq!(machines[1].serial_number(), 2001);
    }

    #[test]
    fn rejects_unknown_machine_type() {
        let json = r#"[{"type": "folder", "name": "F", "serial_number": 1}]"#;
        match parse_machines(json) {
            Err(SourceError::Invalid(LaundryError::InvalidKind(kind))) => {
                assert_eq!(kind, "folder")
            }
            other => panic!("expected invalid kind, got {other:?}"),
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_machines(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"type": "washer", "name": "Washer 1", "serial_number": 7}}]"#
        )
        .unwrap();
        let machines = load_machines(file.path()).unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].serial_number(), 7);
    }
}
