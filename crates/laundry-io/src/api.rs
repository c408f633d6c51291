//! HTTP JSON API over the machine registry.
//!
//! Routing and dispatch are plain functions so they can be exercised
//! without a socket; [`serve_api`] wires them to a tiny_http listener.

use crate::cors::{CorsPolicy, Preflight};
use crate::metrics::HTTP_REQUESTS;
use crate::protocol::{ErrorResponse, MessageResponse, StartWashRequest, StatusMsg};
use laundry_core::{LaundryError, MachineRegistry, SerialNumber};
use serde::Serialize;
use std::io::Cursor;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, error, info, warn};

pub struct ApiConfig {
    pub bind_addr: String,
    pub cors: CorsPolicy,
    /// How often the accept loop checks the stop flag.
    pub poll_interval: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            cors: CorsPolicy::default(),
            poll_interval: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to bind API server on {addr}: {reason}")]
    Bind { addr: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    StartWash(SerialNumber),
    Status(SerialNumber),
    Reset(SerialNumber),
    ResetAll,
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: Option<serde_json::Value>,
}

impl ApiReply {
    fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => Self {
                status,
                body: Some(value),
            },
            Err(e) => {
                error!(error = %e, "Failed to serialize response body");
                Self::detail(500, "Internal Server Error")
            }
        }
    }

    pub fn ok<T: Serialize>(body: &T) -> Self {
        Self::json(200, body)
    }

    pub fn detail(status: u16, detail: &str) -> Self {
        Self::json(
            status,
            &ErrorResponse {
                detail: detail.to_string(),
            },
        )
    }

    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn from_error(err: &LaundryError) -> Self {
        match err {
            LaundryError::NotFound(_) => Self::detail(404, "Machine not found."),
            LaundryError::AlreadyOccupied(_) => Self::detail(400, "Machine is already occupied."),
            LaundryError::InUse(_) => {
                Self::detail(400, "Machine is currently in use. Cannot reset.")
            }
            // Raised only while loading the machine list.
            LaundryError::InvalidKind(_) | LaundryError::DuplicateSerial(_) => {
                Self::detail(500, "Internal Server Error")
            }
        }
    }

    fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        match self.body {
            Some(body) => {
                let mut response =
                    Response::from_string(body.to_string()).with_status_code(self.status);
                if let Ok(header) =
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                {
                    response.add_header(header);
                }
                response
            }
            None => Response::from_data(Vec::new()).with_status_code(self.status),
        }
    }
}

fn parse_serial(raw: &str) -> Result<SerialNumber, ApiReply> {
    raw.parse()
        .map_err(|_| ApiReply::detail(422, "serial_number must be a non-negative integer."))
}

/// Resolve a request line to a route. Unknown paths, wrong methods and
/// malformed serial numbers come back as ready-made error replies.
pub fn route(method: &Method, url: &str) -> Result<Route, ApiReply> {
    let path = url.split('?').next().unwrap_or_default();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let (route, expected) = match segments.as_slice() {
        ["machines", "all"] => (Route::All, Method::Get),
        ["machines", "reset_all"] => (Route::ResetAll, Method::Get),
        ["machines", serial, "start_wash"] => {
            (Route::StartWash(parse_serial(serial)?), Method::Post)
        }
        ["machines", serial, "status"] => (Route::Status(parse_serial(serial)?), Method::Get),
        ["machines", serial, "reset"] => (Route::Reset(parse_serial(serial)?), Method::Get),
        _ => return Err(ApiReply::detail(404, "Not Found")),
    };

    if *method != expected {
        return Err(ApiReply::detail(405, "Method Not Allowed"));
    }
    Ok(route)
}

/// Execute a route against the registry.
pub fn dispatch(registry: &MachineRegistry, route: Route, body: &str) -> ApiReply {
    match route {
        Route::StartWash(serial) => {
            let request = match StartWashRequest::parse(body) {
                Ok(request) => request,
                Err(e) => {
                    debug!(error = %e, "Rejecting malformed start_wash body");
                    return ApiReply::detail(422, "Request body must be {\"minutes\": <integer>}.");
                }
            };
            let Some(duration) = request.duration() else {
                return ApiReply::detail(422, "minutes must be a positive integer.");
            };
            match registry.start_cycle(serial, duration) {
                Ok(machine) => {
                    info!(serial, minutes = request.minutes, name = %machine.name, "Wash started");
                    ApiReply::ok(&MessageResponse::wash_started(&machine.name, request.minutes))
                }
                Err(e) => ApiReply::from_error(&e),
            }
        }
        Route::Status(serial) => match registry.status(serial) {
            Ok(machine) => ApiReply::ok(&StatusMsg::from(&machine)),
            Err(e) => ApiReply::from_error(&e),
        },
        Route::All => {
            let statuses: Vec<StatusMsg> =
                registry.statuses().iter().map(StatusMsg::from).collect();
            ApiReply::ok(&statuses)
        }
        Route::Reset(serial) => match registry.reset(serial) {
            Ok(machine) => {
                info!(serial, name = %machine.name, "Machine reset");
                ApiReply::ok(&MessageResponse::machine_reset(&machine.name))
            }
            Err(e) => ApiReply::from_error(&e),
        },
        Route::ResetAll => {
            let cancelled = registry.reset_all();
            info!(cancelled, "All machines reset");
            ApiReply::ok(&MessageResponse::all_reset())
        }
    }
}

/// Answer a CORS preflight without touching the registry.
pub fn preflight_reply(cors: &CorsPolicy, preflight: &Preflight) -> ApiReply {
    match cors.preflight_failure(preflight) {
        Some(reason) => ApiReply::detail(400, reason),
        None => ApiReply::empty(204),
    }
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

fn preflight_of(request: &Request, origin: Option<&str>) -> Option<Preflight> {
    if *request.method() != Method::Options {
        return None;
    }
    Some(Preflight {
        origin: origin?.to_string(),
        request_method: header_value(request, "Access-Control-Request-Method")?,
        request_headers: header_value(request, "Access-Control-Request-Headers"),
    })
}

fn handle_request(registry: &MachineRegistry, cors: &CorsPolicy, mut request: Request) {
    HTTP_REQUESTS.inc();
    let origin = header_value(&request, "Origin");
    let preflight = preflight_of(&request, origin.as_deref());
    let method = request.method().clone();
    let url = request.url().to_string();

    let routed = match &preflight {
        Some(preflight) => Err(preflight_reply(cors, preflight)),
        None => route(&method, &url),
    };
    let reply = match routed {
        Ok(route) => {
            let mut body = String::new();
            match request.as_reader().read_to_string(&mut body) {
                Ok(_) => dispatch(registry, route, &body),
                Err(e) => {
                    warn!(error = %e, "Failed to read request body");
                    ApiReply::detail(400, "Unreadable request body.")
                }
            }
        }
        Err(reply) => reply,
    };

    debug!(method = %method, url = %url, status = reply.status, "Handled request");

    let mut response = reply.into_response();
    for header in cors.headers(origin.as_deref(), preflight.as_ref()) {
        response.add_header(header);
    }
    if let Err(e) = request.respond(response) {
        warn!(error = %e, "Failed to send response");
    }
}

/// Bind the API listener and serve it on a dedicated thread until `stop`
/// is set.
pub fn serve_api(
    registry: Arc<MachineRegistry>,
    config: ApiConfig,
    stop: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>, ApiError> {
    let server = Server::http(&config.bind_addr).map_err(|e| ApiError::Bind {
        addr: config.bind_addr.clone(),
        reason: e.to_string(),
    })?;
    info!(addr = %config.bind_addr, "API server listening");

    Ok(thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            match server.recv_timeout(config.poll_interval) {
                Ok(Some(request)) => handle_request(&registry, &config.cors, request),
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "API server accept failed");
                    break;
                }
            }
        }
        info!("API server stopped");
    }))
}
