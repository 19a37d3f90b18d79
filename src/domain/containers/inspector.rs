use crate::domain::containers::models::state::{ContainerState, NO_HEALTH};
use crate::domain::containers::port::ContainerRuntime;
use bollard::models::{ContainerInspectResponse, HealthStatusEnum};
use log::debug;

/// Looks up containers and reduces the runtime's answer to a [`ContainerState`].
#[derive(Clone)]
pub struct RuntimeInspector<R: ContainerRuntime> {
    runtime: R,
}

impl<R: ContainerRuntime> RuntimeInspector<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    /// Never fails: lookup errors of any kind are reported as a container that
    /// does not exist.
    pub async fn inspect(&self, container_name: &str) -> ContainerState {
        match self.runtime.inspect_container(container_name).await {
            Ok(details) => ContainerState::from(details),
            Err(e) => {
                debug!("inspecting {container_name} failed: {e}");
                ContainerState::not_found()
            }
        }
    }
}

impl From<ContainerInspectResponse> for ContainerState {
    fn from(details: ContainerInspectResponse) -> Self {
        let state = details.state.unwrap_or_default();
        let health = match state.health.and_then(|h| h.status) {
            None | Some(HealthStatusEnum::EMPTY) => NO_HEALTH.to_string(),
            Some(status) => status.to_string(),
        };
        Self {
            exists: true,
            running: state.running.unwrap_or(false),
            paused: state.paused.unwrap_or(false),
            status: state.status.map(|s| s.to_string()).unwrap_or_default(),
            health,
            started_at: state.started_at,
        }
    }
}
