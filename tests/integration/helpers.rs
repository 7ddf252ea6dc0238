//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::StatusCode;
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use checkuser_checker::ConnectionChecker;
use checkuser_checker::process::MockProcessQuery;
use checkuser_core::AppResult;
use checkuser_core::config::{CheckerConfig, OpenVpnConfig, ServerConfig};
use checkuser_server::{CommandRegistry, RequestServer};

/// Render a management `status` dump listing one client per entry.
pub fn status_dump(clients: &[(&str, &str)]) -> String {
    let mut dump = String::from(
        "OpenVPN CLIENT LIST\r\nUpdated,2030-01-01 00:00:00\r\n\
         Common Name,Real Address,Bytes Received,Bytes Sent,Connected Since\r\n",
    );
    for (name, ip) in clients {
        dump.push_str(&format!("{name},{ip}:51000,1024,2048,2030-01-01 00:00:00\r\n"));
    }
    dump.push_str("ROUTING TABLE\r\nVirtual Address,Common Name,Real Address,Last Ref\r\n");
    for (i, (name, ip)) in clients.iter().enumerate() {
        dump.push_str(&format!(
            "10.8.0.{},{name},{ip}:51000,2030-01-01 00:00:00\r\n",
            i + 2
        ));
    }
    dump.push_str("GLOBAL STATS\r\nMax bcast/mcast queue length,0\r\nEND\r\n");
    dump
}

/// Stand-in for the OpenVPN management interface.
///
/// Answers `status` with the configured dump and records every command
/// line it receives.
pub struct FakeDaemon {
    /// Listening port
    pub port: u16,
    /// Command lines received, in order
    commands: Arc<Mutex<Vec<String>>>,
    /// Current status dump
    status: Arc<Mutex<String>>,
    /// Accept loop
    handle: JoinHandle<()>,
}

impl FakeDaemon {
    /// Start a daemon answering `status` with `status`.
    pub async fn start(status: String) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake daemon");
        let port = listener.local_addr().expect("addr").port();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let status = Arc::new(Mutex::new(status));

        let handle = {
            let commands = Arc::clone(&commands);
            let status = Arc::clone(&status);
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    let commands = Arc::clone(&commands);
                    let status = Arc::clone(&status);
                    tokio::spawn(async move {
                        let (read, mut write) = stream.into_split();
                        let mut line = String::new();
                        if BufReader::new(read).read_line(&mut line).await.is_err() {
                            return;
                        }
                        let line = line.trim_end().to_string();
                        commands.lock().expect("lock").push(line.clone());

                        if line == "status" {
                            let dump = status.lock().expect("lock").clone();
                            // Split the reply so the terminator spans reads.
                            let (head, tail) = dump.split_at(dump.len() - 4);
                            let _ = write.write_all(head.as_bytes()).await;
                            let _ = write.flush().await;
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            let _ = write.write_all(tail.as_bytes()).await;
                        }
                        let _ = write.shutdown().await;
                    });
                }
            })
        };

        Self {
            port,
            commands,
            status,
            handle,
        }
    }

    /// Replace the status dump.
    pub fn set_status(&self, status: String) {
        *self.status.lock().expect("lock") = status;
    }

    /// Command lines received so far.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().expect("lock").clone()
    }

    /// Wait up to a second for `command` to arrive.
    pub async fn wait_for(&self, command: &str) -> bool {
        for _ in 0..100 {
            if self.commands().iter().any(|c| c == command) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Where VPN sessions come from for a test app.
pub enum Vpn {
    /// OpenVPN not installed
    Absent,
    /// Installed and active, served by a fake daemon on this port
    Port(u16),
}

/// Test application context
pub struct TestApp {
    /// Server address
    pub addr: std::net::SocketAddr,
    /// Process table and account inquiries
    pub process: Arc<MockProcessQuery>,
    /// Checker shared with the server
    pub checker: Arc<ConnectionChecker>,
    /// Shutdown trigger
    shutdown: watch::Sender<bool>,
    /// Accept loop
    server: Option<JoinHandle<AppResult<()>>>,
    /// Scratch directory for limit and OpenVPN files
    _dir: TempDir,
}

impl TestApp {
    /// Start a server with no VPN and no limits.
    pub async fn new() -> Self {
        Self::start(Arc::new(MockProcessQuery::new()), Vpn::Absent, "", &[]).await
    }

    /// Start a server around `process` with the given VPN source, limit
    /// file contents, and excluded report fields.
    pub async fn start(
        process: Arc<MockProcessQuery>,
        vpn: Vpn,
        limits: &str,
        exclude: &[&str],
    ) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let limit_file = dir.path().join("usuarios.db");
        std::fs::write(&limit_file, limits).expect("Failed to write limit file");

        let (port, config_file) = match vpn {
            Vpn::Absent => (1, PathBuf::from("/nonexistent/openvpn/server.conf")),
            Vpn::Port(port) => {
                let config_file = dir.path().join("server.conf");
                std::fs::write(&config_file, "port 1194\n").expect("Failed to write server.conf");
                process.set_service_active("openvpn", true);
                (port, config_file)
            }
        };

        let checker_config = CheckerConfig {
            limit_file,
            limiter_tool: String::new(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            openvpn: OpenVpnConfig {
                host: "127.0.0.1".to_string(),
                port,
                config_file,
                connect_timeout_ms: 500,
                read_timeout_ms: 1000,
                ..Default::default()
            },
            ..Default::default()
        };
        let checker = Arc::new(ConnectionChecker::from_config(
            &checker_config,
            process.clone(),
        ));
        let registry = Arc::new(CommandRegistry::new(
            Arc::clone(&checker),
            checker_config.exclude.clone(),
        ));

        let server_config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            workers: 4,
            queue_capacity: 64,
            read_timeout_ms: 300,
            shutdown_grace_seconds: 1,
            ..Default::default()
        };
        let server = RequestServer::bind(&server_config, registry)
            .await
            .expect("Failed to bind server");
        let addr = server.local_addr().expect("addr");

        let (shutdown, rx) = watch::channel(false);
        let server = tokio::spawn(server.run(rx));

        Self {
            addr,
            process,
            checker,
            shutdown,
            server: Some(server),
            _dir: dir,
        }
    }

    /// Send `GET <path>` and read the response.
    pub async fn request(&self, path: &str) -> TestResponse {
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        self.raw_request(request.as_bytes()).await
    }

    /// Send raw bytes (possibly none) and read the response.
    pub async fn raw_request(&self, bytes: &[u8]) -> TestResponse {
        let mut stream = TcpStream::connect(self.addr)
            .await
            .expect("Failed to connect");
        if !bytes.is_empty() {
            stream.write_all(bytes).await.expect("Failed to send request");
        }

        let mut raw = Vec::new();
        stream
            .read_to_end(&mut raw)
            .await
            .expect("Failed to read response");
        TestResponse::parse(&raw)
    }

    /// Signal shutdown and wait for the server to stop.
    pub async fn stop(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(server) = self.server.take() {
            server
                .await
                .expect("Server task panicked")
                .expect("Server failed");
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers, lowercased names
    pub headers: Vec<(String, String)>,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let (head, body) = text.split_once("\r\n\r\n").expect("Malformed response");
        let mut lines = head.lines();

        let status = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse::<u16>().ok())
            .and_then(|code| StatusCode::from_u16(code).ok())
            .expect("Malformed status line");
        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();

        Self {
            status,
            headers,
            body: serde_json::from_str(body).unwrap_or(Value::Null),
        }
    }

    /// Value of a header by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
