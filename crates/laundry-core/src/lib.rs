pub mod error;
pub mod events;
pub mod machine;
pub mod registry;
pub mod timebase;
pub mod timer;

pub use error::LaundryError;
pub use events::{EventSink, MachineEvent, NoopSink};
pub use machine::{format_remaining, Machine, MachineKind, MachineSnapshot, Occupancy, SerialNumber};
pub use registry::MachineRegistry;
pub use timebase::TimeBase;
pub use timer::CycleTimer;
