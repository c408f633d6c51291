//! Prometheus metrics for machine occupancy and API traffic.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Header, Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register_counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("valid counter definition");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("counter registered once");
    counter
}

fn register_gauge(name: &str, help: &str) -> IntGauge {
    let gauge = IntGauge::new(name, help).expect("valid gauge definition");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("gauge registered once");
    gauge
}

// ============================================================================
// Cycle Metrics
// ============================================================================

pub static CYCLES_STARTED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter("laundry_cycles_started_total", "Wash/dry cycles started")
});

pub static CYCLES_FINISHED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter(
        "laundry_cycles_finished_total",
        "Cycles that ran to completion",
    )
});

/// Cycles cut short by a reset of all machines
pub static CYCLES_CANCELLED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter(
        "laundry_cycles_cancelled_total",
        "Running cycles cancelled by reset_all",
    )
});

pub static START_CONFLICTS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter(
        "laundry_start_conflicts_total",
        "Start requests rejected because the machine was occupied",
    )
});

pub static RESET_CONFLICTS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter(
        "laundry_reset_conflicts_total",
        "Reset requests rejected because the machine was running",
    )
});

// ============================================================================
// Occupancy
// ============================================================================

pub static MACHINES_REGISTERED: LazyLock<IntGauge> = LazyLock::new(|| {
    register_gauge(
        "laundry_machines_registered",
        "Machines loaded into the registry",
    )
});

pub static MACHINES_IN_USE: LazyLock<IntGauge> = LazyLock::new(|| {
    register_gauge("laundry_machines_in_use", "Machines currently running a cycle")
});

// ============================================================================
// API
// ============================================================================

pub static HTTP_REQUESTS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter("laundry_http_requests_total", "API requests received")
});

// ============================================================================
// Metrics HTTP Server
// ============================================================================

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            match request.url() {
                "/metrics" => {
                    let encoder = TextEncoder::new();
                    let metric_families = REGISTRY.gather();
                    let mut buffer = Vec::new();

                    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
                        tracing::warn!("Failed to encode metrics: {}", e);
                        let _ = request.respond(
                            Response::from_string("Internal Server Error").with_status_code(500),
                        );
                        continue;
                    }

                    let mut response = Response::from_data(buffer);
                    if let Ok(header) = Header::from_bytes(
                        &b"Content-Type"[..],
                        &b"text/plain; version=0.0.4"[..],
                    ) {
                        response.add_header(header);
                    }
                    let _ = request.respond(response);
                }
                "/health" => {
                    let _ = request.respond(Response::from_string("OK"));
                }
                "/ready" => {
                    // Ready once the machine list has been loaded
                    if MACHINES_REGISTERED.get() > 0 {
                        let _ = request.respond(Response::from_string("Ready"));
                    } else {
                        let _ = request
                            .respond(Response::from_string("Not Ready").with_status_code(503));
                    }
                }
                _ => {
                    let _ =
                        request.respond(Response::from_string("Not Found").with_status_code(404));
                }
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = CYCLES_STARTED.get();
    let _ = CYCLES_FINISHED.get();
    let _ = CYCLES_CANCELLED.get();
    let _ = START_CONFLICTS.get();
    let _ = RESET_CONFLICTS.get();
    let _ = MACHINES_REGISTERED.get();
    let _ = MACHINES_IN_USE.get();
    let _ = HTTP_REQUESTS.get();
}
