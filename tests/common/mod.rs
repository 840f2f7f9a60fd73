//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use contract_proxy::http::RequestSummary;
use contract_proxy::lifecycle::Shutdown;
use contract_proxy::{
    ContractDocument, ContractProxy, HttpServer, ProxyConfig, ProxyOptions, ReportError, Reporter,
};

/// Response the mock backend sends for every request.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", "application/json".to_string())],
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

/// Raw request head and body as the backend received it.
#[derive(Debug, Clone)]
pub struct Received {
    pub head: String,
    pub body: Vec<u8>,
}

/// Start a mock backend on an ephemeral port. Every request it receives is
/// sent on the returned channel.
pub async fn start_mock_backend(response: MockResponse) -> (SocketAddr, mpsc::UnboundedReceiver<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let response = Arc::new(response);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let response = response.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        if let Some(received) = read_request(&mut socket).await {
                            let _ = tx.send(received);
                        }

                        let mut raw = format!("HTTP/1.1 {} {}\r\n", response.status, reason(response.status));
                        for (name, value) in &response.headers {
                            raw.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        raw.push_str(&format!(
                            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.body.len(),
                            response.body
                        ));
                        let _ = socket.write_all(raw.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, rx)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<Received> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < head_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(Received {
        head,
        body: buf[head_end..].to_vec(),
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

/// One reporter notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Warning(String),
    Error(String),
    Success,
}

/// Reporter that forwards every notification to a channel.
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<(RequestSummary, Report)>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(RequestSummary, Report)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Reporter for ChannelReporter {
    fn warning(&self, request: &RequestSummary, message: &str) {
        let _ = self.tx.send((request.clone(), Report::Warning(message.to_string())));
    }

    fn error(&self, request: &RequestSummary, error: &ReportError) {
        let _ = self.tx.send((request.clone(), Report::Error(error.to_string())));
    }

    fn success(&self, request: &RequestSummary) {
        let _ = self.tx.send((request.clone(), Report::Success));
    }
}

/// Wait for the next report, failing the test after two seconds.
pub async fn next_report(
    reports: &mut mpsc::UnboundedReceiver<(RequestSummary, Report)>,
) -> (RequestSummary, Report) {
    tokio::time::timeout(Duration::from_secs(2), reports.recv())
        .await
        .expect("no report within two seconds")
        .expect("reporter dropped")
}

/// Start the full server in front of `backend` and return its address.
pub async fn start_proxy(
    document: ContractDocument,
    backend: SocketAddr,
    reporter: Arc<dyn Reporter>,
    shutdown: &Shutdown,
) -> SocketAddr {
    let options = ProxyOptions::default().with_target(format!("http://{}", backend));
    let proxy = ContractProxy::new(document, reporter, options).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(ProxyConfig::default(), proxy);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    addr
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
