pub mod api;
pub mod cors;
pub mod metrics;
pub mod protocol;
pub mod source;

pub use api::{
    dispatch, preflight_reply, route, serve_api, ApiConfig, ApiError, ApiReply, Route,
};
pub use cors::{CorsPolicy, Preflight};
pub use metrics::{init_metrics, serve_metrics};
pub use protocol::{ErrorResponse, MessageResponse, StartWashRequest, StatusMsg, TimeRemaining};
pub use source::{load_machines, parse_machines, MachineRecord, SourceError};
