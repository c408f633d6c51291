use laundry_io::cors::DEFAULT_ORIGINS;
use std::path::PathBuf;

/// Environment variable consulted when `--machines` is not given.
pub const MACHINES_ENV: &str = "LAUNDRY_MACHINES";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub run_seconds: Option<u64>,
    pub bind_addr: String,
    pub machines_path: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    pub json_logs: bool,
    pub log_dir: Option<PathBuf>,
    pub metrics_addr: Option<String>,
    pub audit_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            run_seconds: None,
            bind_addr: "127.0.0.1:8000".to_string(),
            machines_path: None,
            allowed_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
            json_logs: false,
            log_dir: None,
            metrics_addr: None,
            audit_path: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut cfg = Self::from_args(&args);
        if cfg.machines_path.is_none() {
            cfg.machines_path = std::env::var_os(MACHINES_ENV).map(PathBuf::from);
        }
        cfg
    }

    pub fn from_args(args: &[String]) -> Self {
        let mut cfg = RuntimeConfig::default();
        let mut custom_origins = false;
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--run-seconds" => {
                    if i + 1 < args.len() {
                        cfg.run_seconds = args[i + 1].parse::<u64>().ok();
                        i += 1;
                    }
                }
                "--bind" => {
                    if i + 1 < args.len() {
                        cfg.bind_addr = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--machines" => {
                    if i + 1 < args.len() {
                        cfg.machines_path = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--allow-origin" => {
                    if i + 1 < args.len() {
                        // First explicit origin replaces the defaults
                        if !custom_origins {
                            cfg.allowed_origins.clear();
                            custom_origins = true;
                        }
                        cfg.allowed_origins.push(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--log-dir" => {
                    if i + 1 < args.len() {
                        cfg.log_dir = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--metrics-addr" => {
                    if i + 1 < args.len() {
                        cfg.metrics_addr = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--audit-log" => {
                    if i + 1 < args.len() {
                        cfg.audit_path = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        cfg
    }

    pub fn print_help() {
        println!(
            r#"laundry-server - Laundry machine occupancy tracker

USAGE:
    laundry-server --machines <PATH> [OPTIONS]

OPTIONS:
    --bind <ADDR>           API listen address [default: 127.0.0.1:8000]
    --machines <PATH>       JSON machine list: [{{"type","name","serial_number"}}, ...]
    --allow-origin <ORIGIN> Allowed CORS origin; repeat for several, '*' for any
                            [default: http://localhost:3000, https://laundryprogress.vercel.app]
    --run-seconds <SECS>    Run for a fixed duration then exit
    --json-logs             Output logs in JSON format (for log aggregation)
    --log-dir <DIR>         Also write daily-rolling JSON log files to DIR
    --metrics-addr <ADDR>   Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --audit-log <PATH>      Enable audit logging to specified JSONL file
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    LAUNDRY_MACHINES        Machine list path when --machines is not given
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,laundry_core=trace)

ENDPOINTS:
    POST /machines/{{serial_number}}/start_wash   body {{"minutes": <int>}}
    GET  /machines/{{serial_number}}/status
    GET  /machines/{{serial_number}}/reset
    GET  /machines/reset_all
    GET  /machines/all

EXAMPLES:
    # Basic run with metrics
    laundry-server --machines machines.json --metrics-addr 0.0.0.0:9090

    # Production run with all observability
    laundry-server --machines machines.json --bind 0.0.0.0:8000 --json-logs \
        --audit-log /var/log/laundry/audit.jsonl
"#
        );
    }
}
