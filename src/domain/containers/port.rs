use bollard::errors::Error as BollardError;
use bollard::models::{ContainerInspectResponse, ContainerSummary};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("No such container: {0}")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
}

impl From<BollardError> for RuntimeError {
    fn from(value: BollardError) -> Self {
        match value {
            BollardError::DockerResponseServerError {
                status_code: 404,
                message,
            } => RuntimeError::NotFound(message),
            other => RuntimeError::Unavailable(other.to_string()),
        }
    }
}

// The container runtime the dashboard reads from and mutates. All calls address
// containers by name.
pub trait ContainerRuntime: Send + Sync + 'static + Clone {
    fn inspect_container(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<ContainerInspectResponse, RuntimeError>> + Send;

    /// All containers, stopped ones included.
    fn list_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerSummary>, RuntimeError>> + Send;

    fn pause_container(&self, name: &str) -> impl Future<Output = Result<(), RuntimeError>> + Send;

    fn unpause_container(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<(), RuntimeError>> + Send;

    fn stop_container(&self, name: &str) -> impl Future<Output = Result<(), RuntimeError>> + Send;

    fn start_container(&self, name: &str) -> impl Future<Output = Result<(), RuntimeError>> + Send;

    fn restart_container(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<(), RuntimeError>> + Send;

    /// Timestamped stdout and stderr, last `tail` entries, in the runtime's
    /// wire format: 8 byte frame headers unless the container has a TTY.
    fn container_logs(
        &self,
        name: &str,
        tail: usize,
    ) -> impl Future<Output = Result<Vec<u8>, RuntimeError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daemon_404_maps_to_not_found() {
        let err = RuntimeError::from(BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: kafka".to_string(),
        });
        assert!(matches!(err, RuntimeError::NotFound(_)));

        let err = RuntimeError::from(BollardError::DockerResponseServerError {
            status_code: 500,
            message: "boom".to_string(),
        });
        assert!(matches!(err, RuntimeError::Unavailable(_)));
    }
}
