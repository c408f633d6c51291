use crate::infra::audit::{AuditEventType, AuditLogger};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry::{self, TelemetrySink};
use laundry_core::{LaundryError, MachineRegistry, TimeBase};
use laundry_io::api::{serve_api, ApiConfig, ApiError};
use laundry_io::cors::CorsPolicy;
use laundry_io::source::{load_machines, SourceError};
use std::path::{Path, PathBuf};
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no machine list given; pass --machines <PATH> or set LAUNDRY_MACHINES")]
    MissingMachineList,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Registry(#[from] LaundryError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to start cycle timer runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to open audit log {}: {source}", .path.display())]
    Audit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn run_from_args() -> Result<(), AppError> {
    let config = RuntimeConfig::from_env();
    if config.show_help {
        RuntimeConfig::print_help();
        return Ok(());
    }
    run(config)
}

pub fn run(config: RuntimeConfig) -> Result<(), AppError> {
    // Initialize tracing
    let _log_guard = init_tracing(config.json_logs, config.log_dir.as_deref());

    // Initialize metrics
    telemetry::init();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let timebase = TimeBase::new();
    let audit_logger = init_audit_logger(config.audit_path.as_deref())?;

    let machines_path = config
        .machines_path
        .as_deref()
        .ok_or(AppError::MissingMachineList)?;
    let machines = load_machines(machines_path)?;

    let timers = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("cycle-timer")
        .enable_time()
        .build()
        .map_err(AppError::Runtime)?;

    let sink = Arc::new(TelemetrySink::new(timebase, audit_logger.clone()));
    let registry =
        Arc::new(MachineRegistry::new(machines, timers.handle().clone())?.with_sink(sink));
    telemetry::record_registered(registry.len());

    if let Some(ref logger) = audit_logger {
        let _ = logger.log_event(
            timebase.now_us(),
            timebase.unix_us(),
            AuditEventType::SystemStart,
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "machines": registry.len(),
                "metrics_enabled": config.metrics_addr.is_some(),
            }),
        );
    }

    let stop = Arc::new(AtomicBool::new(false));
    let api_config = ApiConfig {
        bind_addr: config.bind_addr.clone(),
        cors: CorsPolicy::new(config.allowed_origins.clone()),
        ..Default::default()
    };
    let api_handle = serve_api(Arc::clone(&registry), api_config, Arc::clone(&stop))?;

    info!(
        machines = registry.len(),
        addr = %config.bind_addr,
        "Laundry tracker running"
    );

    if let Some(seconds) = config.run_seconds {
        info!(seconds, "Running for limited duration");
        thread::sleep(Duration::from_secs(seconds));
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        let _ = api_handle.join();

        let in_use = registry.in_use_count();
        info!(in_use, "Run complete");

        if let Some(ref logger) = audit_logger {
            let _ = logger.log_event(
                timebase.now_us(),
                timebase.unix_us(),
                AuditEventType::SystemShutdown,
                serde_json::json!({ "machines_in_use": in_use }),
            );
        }
    } else {
        let _ = api_handle.join();
    }

    timers.shutdown_background();
    Ok(())
}

fn init_audit_logger(audit_path: Option<&Path>) -> Result<Option<Arc<AuditLogger>>, AppError> {
    audit_path
        .map(|path| {
            let logger = AuditLogger::new(path).map_err(|source| AppError::Audit {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), "Audit logging enabled");
            Ok(Arc::new(logger))
        })
        .transpose()
}
