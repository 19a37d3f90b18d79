use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

pub const NOT_FOUND_STATUS: &str = "not found";
pub const NO_HEALTH: &str = "none";

/// Point in time view of a container as reported by the runtime.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerState {
    pub exists: bool,
    pub running: bool,
    pub paused: bool,
    pub status: String,
    pub health: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}

impl ContainerState {
    /// The state reported for containers the runtime could not look up.
    pub fn not_found() -> Self {
        Self {
            exists: false,
            running: false,
            paused: false,
            status: NOT_FOUND_STATUS.to_string(),
            health: NO_HEALTH.to_string(),
            started_at: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Pause,
    Unpause,
    Stop,
    Start,
    Restart,
}

impl ControlAction {
    /// Past tense used in acknowledgements.
    pub fn past_tense(&self) -> &'static str {
        match self {
            ControlAction::Pause => "paused",
            ControlAction::Unpause => "resumed",
            ControlAction::Stop => "stopped",
            ControlAction::Start => "started",
            ControlAction::Restart => "restarted",
        }
    }

    /// Checks the transition against the current state. `Err` carries the
    /// reason shown to the user.
    pub fn precondition(&self, state: &ContainerState) -> Result<(), &'static str> {
        match self {
            ControlAction::Pause if !state.running => Err("Container is not running"),
            ControlAction::Pause if state.paused => Err("Container is already paused"),
            ControlAction::Unpause if !state.paused => Err("Container is not paused"),
            ControlAction::Stop if !state.running => Err("Container is not running"),
            ControlAction::Start if state.running => Err("Container is already running"),
            _ => Ok(()),
        }
    }
}

impl Display for ControlAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlAction::Pause => write!(f, "pause"),
            ControlAction::Unpause => write!(f, "unpause"),
            ControlAction::Stop => write!(f, "stop"),
            ControlAction::Start => write!(f, "start"),
            ControlAction::Restart => write!(f, "restart"),
        }
    }
}

impl FromStr for ControlAction {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pause" => Ok(ControlAction::Pause),
            "unpause" => Ok(ControlAction::Unpause),
            "stop" => Ok(ControlAction::Stop),
            "start" => Ok(ControlAction::Start),
            "restart" => Ok(ControlAction::Restart),
            other => Err(ControlError::InvalidTransition(format!(
                "Unknown action: {other}"
            ))),
        }
    }
}

/// A container name paired with the transition requested for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    pub container: String,
    pub action: ControlAction,
}

impl ControlRequest {
    pub fn new(container: impl Into<String>, action: ControlAction) -> Self {
        Self {
            container: container.into(),
            action,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ControlAck {
    pub container: String,
    pub action: ControlAction,
    pub message: String,
}

impl From<&ControlRequest> for ControlAck {
    fn from(req: &ControlRequest) -> Self {
        Self {
            container: req.container.clone(),
            action: req.action,
            message: format!("Container {} {}", req.container, req.action.past_tense()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("{0}")]
    InvalidTransition(String),
    #[error("No such container: {0}")]
    ContainerNotFound(String),
    #[error("{0}")]
    BackendUnavailable(String),
}
