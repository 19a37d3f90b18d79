//! Liveness probes, one per [`CheckKind`].
//!
//! A probe answers a single question, "is it up right now", and never fails:
//! refused connections, timeouts and server errors all come back as `false`.
use crate::domain::services::models::descriptor::CheckKind;
use futures_util::future::BoxFuture;
use log::{debug, trace, warn};
use reqwest::Client;
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;

/// Where and what to probe for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub port: Option<u16>,
    pub health_path: String,
    pub running: bool,
}

pub trait Probe: Send + Sync {
    fn probe<'a>(&'a self, target: &'a ProbeTarget) -> BoxFuture<'a, bool>;
}

pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Probe for TcpProbe {
    fn probe<'a>(&'a self, target: &'a ProbeTarget) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let Some(port) = target.port else {
                return false;
            };
            // the stream is dropped right away, which closes the socket
            match time::timeout(self.timeout, TcpStream::connect((target.host.as_str(), port))).await {
                Ok(Ok(_)) => true,
                Ok(Err(e)) => {
                    trace!("tcp {}:{port} failed: {e}", target.host);
                    false
                }
                Err(_) => {
                    trace!("tcp {}:{port} timed out", target.host);
                    false
                }
            }
        })
    }
}

pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    /// Redirects are not followed, a 3xx answer is judged on its own.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .unwrap_or_else(|e| {
                warn!("building http probe client failed, using defaults: {e}");
                Client::new()
            });
        Self { client, timeout }
    }
}

impl Probe for HttpProbe {
    /// Any status below 500 counts as up. Several services answer 4xx or
    /// redirect on a bare health path while being perfectly alive.
    fn probe<'a>(&'a self, target: &'a ProbeTarget) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let Some(port) = target.port else {
                return false;
            };
            let path = if target.health_path.starts_with('/') {
                target.health_path.clone()
            } else {
                format!("/{}", target.health_path)
            };
            let url = format!("http://{}:{port}{path}", target.host);

            match time::timeout(self.timeout, self.client.get(&url).send()).await {
                Ok(Ok(response)) => response.status().as_u16() < 500,
                Ok(Err(e)) => {
                    trace!("GET {url} failed: {e}");
                    false
                }
                Err(_) => {
                    trace!("GET {url} timed out");
                    false
                }
            }
        })
    }
}

pub struct ContainerProbe;

impl Probe for ContainerProbe {
    fn probe<'a>(&'a self, target: &'a ProbeTarget) -> BoxFuture<'a, bool> {
        Box::pin(async move { target.running })
    }
}

/// Maps check kinds to probes. Kinds without an entry are always down.
#[derive(Clone)]
pub struct ProbeTable {
    probes: HashMap<CheckKind, Arc<dyn Probe>>,
    timeout: Duration,
}

impl ProbeTable {
    pub fn empty(timeout: Duration) -> Self {
        Self {
            probes: HashMap::new(),
            timeout,
        }
    }

    pub fn standard(timeout: Duration) -> Self {
        Self::empty(timeout)
            .with(CheckKind::Web, HttpProbe::new(timeout))
            .with(CheckKind::Tcp, TcpProbe::new(timeout))
            .with(CheckKind::Container, ContainerProbe)
    }

    pub fn with(mut self, kind: CheckKind, probe: impl Probe + 'static) -> Self {
        self.probes.insert(kind, Arc::new(probe));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the probe registered for `kind`, cut off after the table timeout.
    pub async fn run(&self, kind: CheckKind, target: &ProbeTarget) -> bool {
        let Some(probe) = self.probes.get(&kind) else {
            debug!("no probe for check kind {kind}, reporting {} down", target.host);
            return false;
        };
        time::timeout(self.timeout, probe.probe(target))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::response::Redirect;
    use axum::routing::get;
    use tokio::net::TcpListener;

    fn target(port: u16, path: &str) -> ProbeTarget {
        ProbeTarget {
            host: "127.0.0.1".to_string(),
            port: Some(port),
            health_path: path.to_string(),
            running: true,
        }
    }

    async fn serve_http() -> u16 {
        let app = Router::new()
            .route("/ok", get(|| async { "OK" }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route("/broken", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .route("/moved", get(|| async { Redirect::temporary("/broken") }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move { axum::serve(listener, app).await });
        port
    }

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn tcp_probe_sees_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = TcpProbe::new(Duration::from_secs(1));
        assert!(probe.probe(&target(port, "")).await);
    }

    #[tokio::test]
    async fn tcp_probe_refused_is_down() {
        let port = closed_port().await;
        let probe = TcpProbe::new(Duration::from_secs(1));
        assert!(!probe.probe(&target(port, "")).await);
    }

    #[tokio::test]
    async fn http_probe_tolerates_client_errors() {
        let port = serve_http().await;
        let probe = HttpProbe::new(Duration::from_secs(2));
        assert!(probe.probe(&target(port, "/ok")).await);
        assert!(probe.probe(&target(port, "/missing")).await);
        assert!(!probe.probe(&target(port, "/broken")).await);
    }

    #[tokio::test]
    async fn http_probe_counts_redirect_as_up() {
        let port = serve_http().await;
        let probe = HttpProbe::new(Duration::from_secs(2));
        assert!(probe.probe(&target(port, "/moved")).await);
    }

    #[tokio::test]
    async fn http_probe_without_server_is_down() {
        let port = closed_port().await;
        let probe = HttpProbe::new(Duration::from_secs(1));
        assert!(!probe.probe(&target(port, "/")).await);
    }

    #[tokio::test]
    async fn container_probe_follows_running_flag() {
        let mut t = target(0, "");
        assert!(ContainerProbe.probe(&t).await);
        t.running = false;
        assert!(!ContainerProbe.probe(&t).await);
    }

    #[tokio::test]
    async fn unknown_kind_is_down() {
        let table = ProbeTable::standard(Duration::from_secs(1));
        assert!(!table.run(CheckKind::Unknown, &target(1, "")).await);
    }

    struct Stall;

    impl Probe for Stall {
        fn probe<'a>(&'a self, _target: &'a ProbeTarget) -> BoxFuture<'a, bool> {
            Box::pin(std::future::pending())
        }
    }

    #[tokio::test]
    async fn table_cuts_off_slow_probes() {
        let table = ProbeTable::empty(Duration::from_millis(50)).with(CheckKind::Tcp, Stall);
        let started = std::time::Instant::now();
        assert!(!table.run(CheckKind::Tcp, &target(1, "")).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
