use crate::machine::SerialNumber;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaundryError {
    #[error("machine {0} not found")]
    NotFound(SerialNumber),
    #[error("machine {0} is already occupied")]
    AlreadyOccupied(SerialNumber),
    #[error("machine {0} is currently in use")]
    InUse(SerialNumber),
    #[error("machine type must be 'washer' or 'dryer', got '{0}'")]
    InvalidKind(String),
    #[error("serial number {0} appears more than once in the machine list")]
    DuplicateSerial(SerialNumber),
}
