use crate::domain::containers::logs::LogRetriever;
use crate::domain::containers::port::ContainerRuntime;
use crate::domain::services::models::health::ServiceHealth;
use crate::domain::services::service::HealthAggregator;
use axum::extract::ws::{Message, WebSocket};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};

const OUTBOX_CAPACITY: usize = 32;

/// Pushed from the dashboard to an observer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Status { data: Vec<ServiceHealth> },
    Logs { container: String, logs: Vec<String> },
    Error { message: String },
}

/// Requests an observer may send while connected.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    Refresh,
    Logs {
        container: String,
        #[serde(default)]
        tail: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub interval: Duration,
    pub default_tail: usize,
}

/// One connected observer. Owns its push timer and every request it started;
/// dropping the session cancels all of them, so nothing is pushed afterwards.
pub struct ObserverSession<R: ContainerRuntime> {
    aggregator: HealthAggregator<R>,
    logs: LogRetriever<R>,
    default_tail: usize,
    outbox: mpsc::Sender<ServerMessage>,
    ticker: JoinHandle<()>,
    requests: JoinSet<()>,
}

impl<R: ContainerRuntime> ObserverSession<R> {
    /// Starts the push timer. The first status goes out immediately, then one
    /// every `settings.interval`.
    pub fn open(
        aggregator: HealthAggregator<R>,
        logs: LogRetriever<R>,
        settings: SessionSettings,
        outbox: mpsc::Sender<ServerMessage>,
    ) -> Self {
        let ticker = tokio::spawn(push_status_every(
            aggregator.clone(),
            settings.interval,
            outbox.clone(),
        ));
        Self {
            aggregator,
            logs,
            default_tail: settings.default_tail,
            outbox,
            ticker,
            requests: JoinSet::new(),
        }
    }

    /// Handles one inbound text frame. Anything that does not parse is
    /// answered with an error push; the session stays open.
    pub fn handle_text(&mut self, text: &str) {
        while self.requests.try_join_next().is_some() {}

        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Refresh) => {
                let aggregator = self.aggregator.clone();
                let outbox = self.outbox.clone();
                self.requests.spawn(async move {
                    let data = aggregator.aggregate().await;
                    let _ = outbox.send(ServerMessage::Status { data }).await;
                });
            }
            Ok(ClientMessage::Logs { container, tail }) => {
                let tail = tail.filter(|t| *t > 0).unwrap_or(self.default_tail);
                let logs = self.logs.clone();
                let outbox = self.outbox.clone();
                self.requests.spawn(async move {
                    let lines = logs.fetch_logs(&container, tail).await;
                    let _ = outbox
                        .send(ServerMessage::Logs {
                            container,
                            logs: lines,
                        })
                        .await;
                });
            }
            Err(e) => {
                warn!("invalid observer message: {e}");
                self.push_error(e.to_string());
            }
        }
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        let outbox = self.outbox.clone();
        let message = message.into();
        self.requests.spawn(async move {
            let _ = outbox.send(ServerMessage::Error { message }).await;
        });
    }

    /// Same as dropping the session.
    pub fn close(self) {}
}

impl<R: ContainerRuntime> Drop for ObserverSession<R> {
    fn drop(&mut self) {
        self.ticker.abort();
        self.requests.abort_all();
    }
}

async fn push_status_every<R: ContainerRuntime>(
    aggregator: HealthAggregator<R>,
    period: Duration,
    outbox: mpsc::Sender<ServerMessage>,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let data = aggregator.aggregate().await;
        if outbox.send(ServerMessage::Status { data }).await.is_err() {
            break;
        }
    }
}

/// Drives one websocket connection until the peer goes away.
pub async fn observe<R: ContainerRuntime>(
    mut socket: WebSocket,
    aggregator: HealthAggregator<R>,
    logs: LogRetriever<R>,
    settings: SessionSettings,
) {
    info!("observer connected");
    let (tx, mut rx) = mpsc::channel(OUTBOX_CAPACITY);
    let mut session = ObserverSession::open(aggregator, logs, settings, tx);

    loop {
        tokio::select! {
            Some(outgoing) = rx.recv() => {
                let Ok(text) = serde_json::to_string(&outgoing) else {
                    warn!("failed to serialise observer message");
                    continue;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                let Some(Ok(message)) = incoming else {
                    break;
                };
                match message {
                    Message::Text(text) => session.handle_text(text.as_str()),
                    Message::Binary(_) => session.push_error("binary messages are not supported"),
                    Message::Ping(payload) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Close(_) => break,
                }
            }
        }
    }

    session.close();
    debug!("observer session closed");
    info!("observer disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::containers::logs::frame;
    use crate::domain::services::models::descriptor::{CheckKind, ServiceDescriptor, ServiceRegistry};
    use crate::domain::services::probes::{ContainerProbe, ProbeTable};
    use crate::outbound::runtime_memory::{InMemoryRuntime, MemoryContainer};
    use std::sync::Arc;
    use tokio::time::timeout;

    const LONG: Duration = Duration::from_secs(60);

    fn open(interval: Duration) -> (ObserverSession<InMemoryRuntime>, mpsc::Receiver<ServerMessage>) {
        let runtime = InMemoryRuntime::new([
            MemoryContainer::running("client").with_logs(frame(1, b"one\ntwo\n"))
        ]);
        let registry = Arc::new(ServiceRegistry::new(vec![ServiceDescriptor::container_only(
            "client",
            "Weather Client",
            "Ingestion",
        )]));
        let probes = ProbeTable::empty(Duration::from_secs(1)).with(CheckKind::Container, ContainerProbe);
        let aggregator = HealthAggregator::new(runtime.clone(), registry, probes);
        let settings = SessionSettings {
            interval,
            default_tail: 100,
        };
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        let session = ObserverSession::open(aggregator, LogRetriever::new(runtime), settings, tx);
        (session, rx)
    }

    async fn next(rx: &mut mpsc::Receiver<ServerMessage>) -> ServerMessage {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no push within 5s")
            .expect("outbox closed")
    }

    #[tokio::test]
    async fn pushes_status_on_open() {
        let (_session, mut rx) = open(LONG);
        match next(&mut rx).await {
            ServerMessage::Status { data } => {
                assert_eq!(data.len(), 1);
                assert!(data[0].service_up);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn timer_keeps_pushing() {
        let (_session, mut rx) = open(Duration::from_millis(30));
        for _ in 0..3 {
            assert!(matches!(next(&mut rx).await, ServerMessage::Status { .. }));
        }
    }

    #[tokio::test]
    async fn refresh_pushes_out_of_band() {
        let (mut session, mut rx) = open(LONG);
        next(&mut rx).await;
        session.handle_text(r#"{"action":"refresh"}"#);
        assert!(matches!(next(&mut rx).await, ServerMessage::Status { .. }));
    }

    #[tokio::test]
    async fn logs_request_is_tagged_with_container() {
        let (mut session, mut rx) = open(LONG);
        next(&mut rx).await;
        session.handle_text(r#"{"action":"logs","container":"client","tail":5}"#);
        assert_eq!(
            next(&mut rx).await,
            ServerMessage::Logs {
                container: "client".to_string(),
                logs: vec!["one".to_string(), "two".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn malformed_message_gets_error_and_session_survives() {
        let (mut session, mut rx) = open(LONG);
        next(&mut rx).await;

        session.handle_text("not json");
        assert!(matches!(next(&mut rx).await, ServerMessage::Error { .. }));
        session.handle_text(r#"{"action":"logs"}"#);
        assert!(matches!(next(&mut rx).await, ServerMessage::Error { .. }));

        session.handle_text(r#"{"action":"refresh"}"#);
        assert!(matches!(next(&mut rx).await, ServerMessage::Status { .. }));
    }

    #[tokio::test]
    async fn nothing_is_pushed_after_close() {
        let interval = Duration::from_millis(50);
        let (session, mut rx) = open(interval);
        next(&mut rx).await;
        session.close();

        // drain anything sent before the close took effect
        while let Ok(Some(_)) = timeout(Duration::from_millis(1), rx.recv()).await {}
        let after = timeout(interval * 3, rx.recv()).await;
        assert!(matches!(after, Err(_) | Ok(None)), "pushed after close: {after:?}");
    }

    #[test]
    fn wire_format() {
        let msg = serde_json::to_value(ServerMessage::Error {
            message: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(msg, serde_json::json!({"type": "error", "message": "boom"}));

        let req: ClientMessage =
            serde_json::from_str(r#"{"action":"logs","container":"kafka"}"#).unwrap();
        assert_eq!(
            req,
            ClientMessage::Logs {
                container: "kafka".to_string(),
                tail: None
            }
        );
    }
}
