//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use mirror_proxy::config::{ProxyConfig, TlsConfig};
use mirror_proxy::http::MirrorServer;
use mirror_proxy::lifecycle::Shutdown;
use mirror_proxy::mirror::MemorySink;
use mirror_proxy::net::tls::load_tls_config;

/// A request as the mock backend received it.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl ReceivedRequest {
    /// Value of the first header called `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// Every request it receives is sent on the returned channel.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, mpsc::UnboundedReceiver<ReceivedRequest>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        if let Some(request) = read_request(&mut socket).await {
                            let _ = tx.send(request);
                        }
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, rx)
}

/// Start a backend that always answers `status` with `body`.
#[allow(dead_code)]
pub async fn start_mock_backend(
    status: u16,
    body: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<ReceivedRequest>) {
    start_programmable_backend(move || async move { (status, body.to_string()) }).await
}

async fn read_request(socket: &mut TcpStream) -> Option<ReceivedRequest> {
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

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut request = ReceivedRequest {
        head,
        body: buf[head_end + 4..].to_vec(),
    };

    let length: usize = request
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while request.body.len() < length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        request.body.extend_from_slice(&chunk[..n]);
    }

    Some(request)
}

/// A proxy running on an ephemeral port, mirroring into memory.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub sink: MemorySink,
    shutdown: Shutdown,
}

impl TestProxy {
    /// Start a proxy forwarding to `upstream`; `customize` adjusts the config.
    pub async fn start(upstream: SocketAddr, customize: impl FnOnce(&mut ProxyConfig)) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut config = ProxyConfig::default();
        config.listener.bind_address = addr.to_string();
        config.upstream.address = upstream.to_string();
        customize(&mut config);

        let sink = MemorySink::new();
        let shutdown = Shutdown::new();
        let server = MirrorServer::new(config, Arc::new(sink.clone())).unwrap();
        tokio::spawn(server.run(listener, shutdown.signal()));

        Self { addr, sink, shutdown }
    }

    /// Start an HTTPS proxy with a freshly generated self-signed certificate.
    #[allow(dead_code)]
    pub async fn start_tls(upstream: SocketAddr) -> Self {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let dir = std::env::temp_dir().join(format!("mirror-proxy-tls-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let cert_path = dir.join("cert.pem");
        let key_path = dir.join("key.pem");
        std::fs::write(&cert_path, certified.cert.pem()).unwrap();
        std::fs::write(&key_path, certified.key_pair.serialize_pem()).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut config = ProxyConfig::default();
        config.listener.bind_address = addr.to_string();
        config.listener.tls = Some(TlsConfig {
            cert_path: cert_path.display().to_string(),
            key_path: key_path.display().to_string(),
        });
        config.upstream.address = upstream.to_string();

        let tls = load_tls_config(&cert_path, &key_path).await.unwrap();
        let sink = MemorySink::new();
        let shutdown = Shutdown::new();
        let server = MirrorServer::new(config, Arc::new(sink.clone())).unwrap();
        tokio::spawn(server.run_tls(listener.into_std().unwrap(), tls, shutdown.signal()));

        Self { addr, sink, shutdown }
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    /// Wait until the transcript contains `count` closed requests.
    pub async fn transcripts(&self, count: usize) -> String {
        let footer = mirror_proxy::mirror::format::FOOTER;
        for _ in 0..100 {
            let text = self.sink.text();
            if text.matches(footer).count() >= count {
                return text;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("transcript never closed:\n{}", self.sink.text());
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// A client that never reuses connections or goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Like [`client`], but speaks TLS to `localhost` at `addr` and trusts any certificate.
#[allow(dead_code)]
pub fn tls_client(addr: SocketAddr) -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .danger_accept_invalid_certs(true)
        .resolve("localhost", addr)
        .build()
        .unwrap()
}
