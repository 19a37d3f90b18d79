use axum::{
    Router,
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use bollard::models::ContainerSummary;
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::domain::containers::logs::LogRetriever;
use crate::domain::containers::models::state::{ControlAction, ControlError, ControlRequest};
use crate::domain::containers::port::{ContainerRuntime, RuntimeError};
use crate::domain::containers::service::ControlGateway;
use crate::domain::services::models::health::ServiceHealth;
use crate::domain::services::probes::ProbeTable;
use crate::domain::services::service::HealthAggregator;
use crate::inbound::broadcaster::{SessionSettings, observe};

#[derive(Clone)]
pub struct AppState<R: ContainerRuntime> {
    pub runtime: R,
    pub aggregator: HealthAggregator<R>,
    pub gateway: ControlGateway<R>,
    pub logs: LogRetriever<R>,
    pub settings: SessionSettings,
}

impl<R: ContainerRuntime> AppState<R> {
    pub fn new(runtime: R, aggregator: HealthAggregator<R>, settings: SessionSettings) -> Self {
        Self {
            gateway: ControlGateway::new(runtime.clone()),
            logs: LogRetriever::new(runtime.clone()),
            runtime,
            aggregator,
            settings,
        }
    }

    pub fn from_config(runtime: R, config: &Config) -> Self {
        let aggregator = HealthAggregator::new(
            runtime.clone(),
            Arc::new(config.registry()),
            ProbeTable::standard(config.probe_timeout()),
        )
        .with_probe_host(config.probe_host.clone());
        let settings = SessionSettings {
            interval: config.poll_interval(),
            default_tail: config.log_tail,
        };
        Self::new(runtime, aggregator, settings)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LogsResponse {
    pub logs: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct LogsQuery {
    tail: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<ControlError> for ApiError {
    fn from(value: ControlError) -> Self {
        let status = match value {
            ControlError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            ControlError::ContainerNotFound(_) | ControlError::BackendUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: value.to_string(),
        }
    }
}

impl From<RuntimeError> for ApiError {
    fn from(value: RuntimeError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn get_services<R: ContainerRuntime>(
    State(state): State<AppState<R>>,
) -> Json<Vec<ServiceHealth>> {
    Json(state.aggregator.aggregate().await)
}

async fn get_logs<R: ContainerRuntime>(
    State(state): State<AppState<R>>,
    Path(container): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Json<LogsResponse> {
    let tail = query
        .tail
        .and_then(|t| t.parse::<usize>().ok())
        .filter(|t| *t > 0)
        .unwrap_or(state.settings.default_tail);
    let logs = state.logs.fetch_logs(&container, tail).await;
    Json(LogsResponse { logs })
}

async fn get_containers<R: ContainerRuntime>(
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<ContainerSummary>>, ApiError> {
    match state.runtime.list_containers().await {
        Ok(containers) => Ok(Json(containers)),
        Err(e) => {
            error!("Error listing containers: {e}");
            Err(e.into())
        }
    }
}

async fn control_container<R: ContainerRuntime>(
    State(state): State<AppState<R>>,
    Path((container, action)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ApiError> {
    let action: ControlAction = action.parse()?;
    let ack = state
        .gateway
        .execute(ControlRequest::new(container, action))
        .await?;
    Ok(Json(ActionResponse {
        success: true,
        message: ack.message,
    }))
}

async fn ws_handler<R: ContainerRuntime>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<R>>,
) -> Response {
    ws.on_upgrade(move |socket| observe(socket, state.aggregator, state.logs, state.settings))
}

pub fn create_app<R: ContainerRuntime>(state: AppState<R>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler::<R>))
        .route("/api/services", get(get_services::<R>))
        .route("/api/logs/{container}", get(get_logs::<R>))
        .route("/api/containers", get(get_containers::<R>))
        .route(
            "/api/containers/{container}/{action}",
            post(control_container::<R>),
        )
        .with_state(state)
}
