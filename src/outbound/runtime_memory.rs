use crate::domain::containers::models::state::{ControlAction, ControlRequest};
use crate::domain::containers::port::{ContainerRuntime, RuntimeError};
use bollard::models::{
    ContainerInspectResponse, ContainerState as RuntimeState, ContainerStateStatusEnum,
    ContainerSummary, Health, HealthStatusEnum,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const UNAVAILABLE: &str = "Cannot connect to the container runtime";

/// A container known to [`InMemoryRuntime`].
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    pub name: String,
    pub running: bool,
    pub paused: bool,
    pub health: Option<HealthStatusEnum>,
    pub started_at: Option<String>,
    pub logs: Vec<u8>,
}

impl MemoryContainer {
    pub fn running(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            running: true,
            started_at: Some("2024-01-01T00:00:00Z".to_string()),
            ..Default::default()
        }
    }

    pub fn stopped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn paused(name: impl Into<String>) -> Self {
        Self {
            paused: true,
            ..Self::running(name)
        }
    }

    pub fn with_health(mut self, health: HealthStatusEnum) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_logs(mut self, logs: impl Into<Vec<u8>>) -> Self {
        self.logs = logs.into();
        self
    }

    fn status(&self) -> ContainerStateStatusEnum {
        match (self.running, self.paused) {
            (true, true) => ContainerStateStatusEnum::PAUSED,
            (true, false) => ContainerStateStatusEnum::RUNNING,
            _ => ContainerStateStatusEnum::EXITED,
        }
    }
}

#[derive(Default)]
struct RuntimeData {
    containers: Vec<MemoryContainer>,
    unavailable: bool,
    unresponsive: bool,
    forwarded: Vec<ControlRequest>,
}

impl RuntimeData {
    fn check_available(&self) -> Result<(), RuntimeError> {
        if self.unavailable {
            return Err(RuntimeError::Unavailable(UNAVAILABLE.to_string()));
        }
        Ok(())
    }

    fn container(&self, name: &str) -> Result<&MemoryContainer, RuntimeError> {
        self.check_available()?;
        self.containers
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    fn container_mut(&mut self, name: &str) -> Result<&mut MemoryContainer, RuntimeError> {
        self.check_available()?;
        self.containers
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }
}

/// Container runtime kept entirely in memory. Lifecycle calls change the
/// stored state the way the docker daemon would and are recorded so callers
/// can check what reached the runtime.
#[derive(Clone, Default)]
pub struct InMemoryRuntime {
    state: Arc<RwLock<RuntimeData>>,
}

impl InMemoryRuntime {
    pub fn new(containers: impl IntoIterator<Item = MemoryContainer>) -> Self {
        let data = RuntimeData {
            containers: containers.into_iter().collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(data)),
        }
    }

    /// Makes every subsequent call fail as if the daemon socket were gone.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Makes inspections hang forever, like a daemon that accepts the
    /// connection and never answers.
    pub async fn set_unresponsive(&self, unresponsive: bool) {
        self.state.write().await.unresponsive = unresponsive;
    }

    /// Lifecycle requests that were forwarded, oldest first.
    pub async fn forwarded(&self) -> Vec<ControlRequest> {
        self.state.read().await.forwarded.clone()
    }

    async fn apply(&self, name: &str, action: ControlAction) -> Result<(), RuntimeError> {
        let mut state = self.state.write().await;
        let container = state.container_mut(name)?;
        match action {
            ControlAction::Pause => container.paused = true,
            ControlAction::Unpause => container.paused = false,
            ControlAction::Stop => {
                container.running = false;
                container.paused = false;
            }
            ControlAction::Start | ControlAction::Restart => {
                container.running = true;
                container.paused = false;
            }
        }
        state.forwarded.push(ControlRequest::new(name, action));
        Ok(())
    }
}

impl ContainerRuntime for InMemoryRuntime {
    async fn inspect_container(&self, name: &str) -> Result<ContainerInspectResponse, RuntimeError> {
        if self.state.read().await.unresponsive {
            return std::future::pending().await;
        }
        let state = self.state.read().await;
        let container = state.container(name)?;
        Ok(ContainerInspectResponse {
            name: Some(format!("/{}", container.name)),
            state: Some(RuntimeState {
                status: Some(container.status()),
                running: Some(container.running),
                paused: Some(container.paused),
                started_at: container.started_at.clone(),
                health: container.health.map(|status| Health {
                    status: Some(status),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(state
            .containers
            .iter()
            .map(|c| ContainerSummary {
                id: Some(c.name.clone()),
                names: Some(vec![format!("/{}", c.name)]),
                status: Some(c.status().to_string()),
                ..Default::default()
            })
            .collect())
    }

    async fn pause_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.apply(name, ControlAction::Pause).await
    }

    async fn unpause_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.apply(name, ControlAction::Unpause).await
    }

    async fn stop_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.apply(name, ControlAction::Stop).await
    }

    async fn start_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.apply(name, ControlAction::Start).await
    }

    async fn restart_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.apply(name, ControlAction::Restart).await
    }

    async fn container_logs(&self, name: &str, _tail: usize) -> Result<Vec<u8>, RuntimeError> {
        let state = self.state.read().await;
        Ok(state.container(name)?.logs.clone())
    }
}
