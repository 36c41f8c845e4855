//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cors_relay::config::RelayConfig;
use cors_relay::http::HttpServer;
use cors_relay::lifecycle::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// A canned upstream answer.
#[derive(Clone)]
pub struct MockReply {
    pub status_line: &'static str,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: &'static str,
}

impl MockReply {
    pub fn ok(body: &'static str) -> Self {
        Self {
            status_line: "200 OK",
            headers: vec![("Content-Type", "application/json")],
            body,
        }
    }

    pub fn status(status_line: &'static str, body: &'static str) -> Self {
        Self {
            status_line,
            headers: vec![("Content-Type", "application/json")],
            body,
        }
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }
}

/// One request as the upstream saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Handle to a running mock upstream.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub connections: Arc<AtomicUsize>,
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockUpstream {
    pub fn url(&self) -> String {
        format!("http://{}/mcp/", self.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

/// Start an upstream that answers every request with `reply` after `delay`.
pub async fn start_mock_upstream(reply: MockReply, delay: Duration) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream = MockUpstream {
        addr: listener.local_addr().unwrap(),
        connections: Arc::new(AtomicUsize::new(0)),
        seen: Arc::new(Mutex::new(Vec::new())),
    };

    let handle = upstream.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    handle.connections.fetch_add(1, Ordering::SeqCst);
                    let reply = reply.clone();
                    let seen = handle.seen.clone();
                    tokio::spawn(async move {
                        serve_one(socket, reply, delay, seen).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    upstream
}

async fn serve_one(
    mut socket: TcpStream,
    reply: MockReply,
    delay: Duration,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    seen.lock().unwrap().push(request);

    tokio::time::sleep(delay).await;

    let mut response = format!("HTTP/1.1 {}\r\n", reply.status_line);
    for (name, value) in &reply.headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.body.len(),
        reply.body
    ));
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(SeenRequest {
        request_line,
        headers,
        body,
    })
}

/// An upstream that takes one request and never answers. The receiver fires
/// once the relay closes its end of the connection.
pub async fn start_silent_upstream() -> (String, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        while let Ok(n) = socket.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
        let _ = closed_tx.send(());
    });

    (format!("http://{}/mcp/", addr), closed_rx)
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Start the relay in front of `upstream_url`; returns its address and the
/// shutdown handle.
pub async fn start_relay(upstream_url: String, tweak: impl FnOnce(&mut RelayConfig)) -> (SocketAddr, Shutdown) {
    let mut config = RelayConfig::default();
    config.upstream.url = upstream_url;
    config.timeouts.shutdown_grace_secs = 1;
    tweak(&mut config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.signal();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub fn assert_cors(headers: &reqwest::header::HeaderMap) {
    let expected = [
        ("access-control-allow-origin", "*"),
        ("access-control-allow-methods", "GET, POST, OPTIONS, DELETE"),
        (
            "access-control-allow-headers",
            "Content-Type, Accept, mcp-session-id, X-MCP-Session-ID",
        ),
        ("access-control-expose-headers", "mcp-session-id"),
        ("access-control-max-age", "3600"),
    ];
    for (name, value) in expected {
        let values: Vec<_> = headers.get_all(name).iter().collect();
        assert_eq!(values, vec![value], "header {}", name);
    }
}
