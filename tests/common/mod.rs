//! Shared utilities for integration testing: relay bootstrap and mock targets.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Request},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    routing::{any, get},
    Router,
};
use embed_relay::{HttpServer, RelayConfig, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Relay configuration suitable for talking to local mock targets.
pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.host = "127.0.0.1".to_string();
    config.listener.port = 0;
    config.upstream.use_system_proxy = false;
    config
}

/// Start the relay on an ephemeral port. Keep the returned `Shutdown` alive
/// for the duration of the test.
pub async fn start_relay(config: RelayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind(config.listener.bind_address()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// HTTP client for driving the relay, bypassing any system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// What the echo target saw.
#[derive(Debug)]
pub struct Echo {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Echo {
    pub fn parse(text: &str) -> Self {
        let mut echo = Echo {
            method: String::new(),
            uri: String::new(),
            headers: Vec::new(),
            body: String::new(),
        };
        let mut lines = text.split('\n');
        for line in lines.by_ref() {
            if let Some(method) = line.strip_prefix("METHOD ") {
                echo.method = method.to_string();
            } else if let Some(uri) = line.strip_prefix("URI ") {
                echo.uri = uri.to_string();
            } else if let Some(h) = line.strip_prefix("H ") {
                let (name, value) = h.split_once(": ").unwrap();
                echo.headers.push((name.to_string(), value.to_string()));
            } else if line == "BODY" {
                break;
            }
        }
        echo.body = lines.collect::<Vec<_>>().join("\n");
        echo
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let query = self.uri.split_once('?').map(|(_, q)| q).unwrap_or("");
        url::form_urlencoded::parse(query.as_bytes()).into_owned().collect()
    }
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> String {
    let mut out = format!("METHOD {method}\nURI {uri}\n");
    for (name, value) in &headers {
        out.push_str(&format!("H {}: {}\n", name, value.to_str().unwrap_or("<binary>")));
    }
    out.push_str("BODY\n");
    out.push_str(&String::from_utf8_lossy(&body));
    out
}

async fn framed() -> Response {
    (
        [
            (header::X_FRAME_OPTIONS, "DENY"),
            (header::CONTENT_SECURITY_POLICY, "frame-ancestors 'none'"),
            (header::SET_COOKIE, "session=target"),
            (header::CACHE_CONTROL, "no-store"),
            (header::CONTENT_TYPE, "text/html"),
        ],
        "<html>framed</html>",
    )
        .into_response()
}

async fn status(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap();
    (status, format!("status {code}")).into_response()
}

async fn large() -> Vec<u8> {
    vec![b'x'; LARGE_BODY_LEN]
}

/// Size of the `/large` body.
pub const LARGE_BODY_LEN: usize = 1024 * 1024;

/// Start an axum target with these routes:
/// - `/echo` (any method): describes the request it received
/// - `/framed`: HTML with anti-framing headers and a cookie
/// - `/status/{code}`: responds with that status
/// - `/redirect`: 303 to `/echo`
/// - `/large`: 1 MiB body
///
/// Returns the address and a counter of requests served.
pub async fn start_target() -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new()
        .route("/echo", any(echo))
        .route("/framed", get(framed))
        .route("/status/{code}", any(status))
        .route("/redirect", get(|| async { Redirect::to("/echo") }))
        .route("/large", get(large))
        .layer(tower::util::MapRequestLayer::new(move |req: Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            req
        }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, hits)
}

async fn read_request_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

const CHUNKED_HEAD: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nTransfer-Encoding: chunked\r\n\r\n";

/// Raw target that sends the head and `hello`, then holds the rest of the body
/// (`world`) until the returned sender fires or is dropped.
pub async fn start_gated_target() -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (gate_tx, gate_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            read_request_head(&mut socket).await;
            let _ = socket.write_all(CHUNKED_HEAD.as_bytes()).await;
            let _ = socket.write_all(b"5\r\nhello\r\n").await;
            let _ = socket.flush().await;

            let _ = gate_rx.await;

            let _ = socket.write_all(b"5\r\nworld\r\n0\r\n\r\n").await;
            let _ = socket.shutdown().await;
        }
    });

    (addr, gate_tx)
}

/// Raw target that sends the head and `hello`, then never finishes the body.
/// The returned receiver fires once the relay closes its side of the
/// connection (EOF or a read error on the target socket).
pub async fn start_watched_target() -> (SocketAddr, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            read_request_head(&mut socket).await;
            let _ = socket.write_all(CHUNKED_HEAD.as_bytes()).await;
            let _ = socket.write_all(b"5\r\nhello\r\n").await;
            let _ = socket.flush().await;

            let mut buf = [0u8; 64];
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => continue,
                }
            }
            let _ = closed_tx.send(());
        }
    });

    (addr, closed_rx)
}

/// Encoding of `hello` as a single zstd frame holding one raw block.
pub const ZSTD_HELLO: [u8; 14] = [
    0x28, 0xb5, 0x2f, 0xfd, // magic
    0x20, 0x05, // single segment, content size 5
    0x29, 0x00, 0x00, // last raw block of 5 bytes
    b'h', b'e', b'l', b'l', b'o',
];

/// Raw target answering with a zstd-encoded `hello`. The returned receiver
/// yields the request head the target saw.
pub async fn start_zstd_target() -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (head_tx, head_rx) = oneshot::channel::<String>();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let head = read_request_head(&mut socket).await;
            let _ = head_tx.send(head);
            let response_head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Encoding: zstd\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                ZSTD_HELLO.len()
            );
            let _ = socket.write_all(response_head.as_bytes()).await;
            let _ = socket.write_all(&ZSTD_HELLO).await;
            let _ = socket.shutdown().await;
        }
    });

    (addr, head_rx)
}

/// Raw target that sends the head and one chunk, then closes the connection
/// without finishing the chunked body.
pub async fn start_truncating_target() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            read_request_head(&mut socket).await;
            let _ = socket.write_all(CHUNKED_HEAD.as_bytes()).await;
            let _ = socket.write_all(b"5\r\nhello\r\n").await;
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = socket.shutdown().await;
        }
    });

    addr
}

/// Raw target that accepts connections and never answers.
pub async fn start_silent_target() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        drop(socket);
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address with nothing listening on it.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
