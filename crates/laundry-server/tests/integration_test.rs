use serde_json::Value;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;

const MACHINES: &str = r#"[
    {"id": 1, "type": "washer", "name": "Washer 1", "serial_number": 1001},
    {"id": 2, "type": "washer", "name": "Washer 2", "serial_number": 1002},
    {"id": 3, "type": "dryer", "name": "Dryer 1", "serial_number": 2001}
]"#;

struct ServerProcess {
    child: Child,
    addr: String,
    _machines: NamedTempFile,
}

impl ServerProcess {
    fn start() -> Self {
        let bin_path = env!("CARGO_BIN_EXE_laundry-server");

        let mut machines = NamedTempFile::new().expect("Failed to create machine list");
        machines
            .write_all(MACHINES.as_bytes())
            .expect("Failed to write machine list");

        let listener = TcpListener::bind("127.0.0.1:0")
            .expect("Failed to bind ephemeral port for integration test");
        let addr = listener
            .local_addr()
            .expect("Failed to resolve bound address");
        let bind_addr = format!("127.0.0.1:{}", addr.port());
        drop(listener);

        let child = Command::new(bin_path)
            .args(["--bind", &bind_addr, "--machines"])
            .arg(machines.path())
            .spawn()
            .expect("Failed to start laundry-server");

        // Loop until port is open (up to 5s)
        let start = std::time::Instant::now();
        while start.elapsed().as_secs() < 5 {
            if TcpStream::connect(&bind_addr).is_ok() {
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }

        Self {
            child,
            addr: bind_addr,
            _machines: machines,
        }
    }

    fn request(&self, method: &str, path: &str, body: &str) -> (u16, Value) {
        self.request_with_headers(method, path, body, &[]).0
    }

    fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> ((u16, Value), String) {
        let mut stream = TcpStream::connect(&self.addr).expect("Failed to connect to server");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let mut raw = format!(
            "{method} {path} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.addr,
            body.len()
        );
        for (name, value) in headers {
            raw.push_str(&format!("{name}: {value}\r\n"));
        }
        raw.push_str("\r\n");
        raw.push_str(body);
        stream.write_all(raw.as_bytes()).unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        let (head, payload) = response
            .split_once("\r\n\r\n")
            .expect("response should have a header block");
        let status = head
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .expect("status line should carry a code");
        let json = serde_json::from_str(payload).unwrap_or(Value::Null);
        ((status, json), head.to_string())
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

#[test]
fn test_wash_lifecycle_over_http() {
    let server = ServerProcess::start();

    let (status, body) = server.request("GET", "/machines/1001/status", "");
    assert_eq!(status, 200);
    assert_eq!(body["status"], "available");
    assert_eq!(body["time_remaining"], 0);

    let (status, body) = server.request("POST", "/machines/1001/start_wash", r#"{"minutes": 5}"#);
    assert_eq!(status, 200);
    assert_eq!(
        body["message"],
        "Washer 1 has started washing for 5 minute(s)."
    );

    let (status, body) = server.request("GET", "/machines/1001/status", "");
    assert_eq!(status, 200);
    assert_eq!(body["status"], "in_use");
    let remaining = body["time_remaining"].as_str().unwrap();
    assert!(remaining == "05:00" || remaining == "04:59", "{remaining}");

    // Already running
    let (status, body) = server.request("POST", "/machines/1001/start_wash", r#"{"minutes": 5}"#);
    assert_eq!(status, 400);
    assert_eq!(body["detail"], "Machine is already occupied.");

    // Cannot reset a running machine
    let (status, _) = server.request("GET", "/machines/1001/reset", "");
    assert_eq!(status, 400);

    // Idle machine resets cleanly
    let (status, body) = server.request("GET", "/machines/2001/reset", "");
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Dryer 1 has been reset.");

    let (status, body) = server.request("GET", "/machines/reset_all", "");
    assert_eq!(status, 200);
    assert_eq!(body["message"], "All machines have been reset.");

    let (status, body) = server.request("GET", "/machines/all", "");
    assert_eq!(status, 200);
    let machines = body.as_array().unwrap();
    assert_eq!(machines.len(), 3);
    assert_eq!(machines[0]["serial_number"], 1001);
    assert!(machines.iter().all(|m| m["status"] == "available"));
}

#[test]
fn test_unknown_machine_and_bad_requests() {
    let server = ServerProcess::start();

    let (status, body) = server.request("GET", "/machines/9999/status", "");
    assert_eq!(status, 404);
    assert_eq!(body["detail"], "Machine not found.");

    let (status, _) = server.request("POST", "/machines/9999/start_wash", r#"{"minutes": 5}"#);
    assert_eq!(status, 404);

    let (status, _) = server.request("POST", "/machines/1002/start_wash", r#"{"mins": 5}"#);
    assert_eq!(status, 422);

    let (status, _) = server.request("GET", "/machines/1002/start_wash", "");
    assert_eq!(status, 405);
}

#[test]
fn test_cors_for_allowed_origin() {
    let server = ServerProcess::start();

    let ((status, _), head) = server.request_with_headers(
        "OPTIONS",
        "/machines/1001/start_wash",
        "",
        &[
            ("Origin", "https://laundryprogress.vercel.app"),
            ("Access-Control-Request-Method", "POST"),
            ("Access-Control-Request-Headers", "content-type"),
        ],
    );
    assert_eq!(status, 204);
    let head = head.to_ascii_lowercase();
    assert!(head.contains("access-control-allow-origin: https://laundryprogress.vercel.app"));
    assert!(head.contains("access-control-allow-credentials: true"));
    assert!(head.contains("access-control-allow-methods: get, post, options"));
    assert!(head.contains("access-control-allow-headers: content-type"));

    // Without Access-Control-Request-Method it is not a preflight.
    let ((status, _), _) = server.request_with_headers(
        "OPTIONS",
        "/machines/all",
        "",
        &[("Origin", "http://localhost:3000")],
    );
    assert_eq!(status, 405);

    let ((status, _), head) = server.request_with_headers(
        "GET",
        "/machines/all",
        "",
        &[("Origin", "https://evil.example")],
    );
    assert_eq!(status, 200);
    assert!(!head.to_ascii_lowercase().contains("access-control-allow-origin"));
}
