use crate::domain::containers::models::state::{
    ContainerState, ControlAck, ControlAction, ControlError, ControlRequest,
};
use crate::domain::containers::port::{ContainerRuntime, RuntimeError};
use log::{error, info};

impl From<RuntimeError> for ControlError {
    fn from(value: RuntimeError) -> Self {
        match value {
            RuntimeError::NotFound(name) => ControlError::ContainerNotFound(name),
            RuntimeError::Unavailable(message) => ControlError::BackendUnavailable(message),
        }
    }
}

/// Guards lifecycle operations: the current state is checked before anything
/// reaches the runtime.
#[derive(Clone)]
pub struct ControlGateway<R: ContainerRuntime> {
    runtime: R,
}

impl<R: ContainerRuntime> ControlGateway<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    pub async fn pause(&self, container: &str) -> Result<ControlAck, ControlError> {
        self.execute(ControlRequest::new(container, ControlAction::Pause))
            .await
    }

    pub async fn unpause(&self, container: &str) -> Result<ControlAck, ControlError> {
        self.execute(ControlRequest::new(container, ControlAction::Unpause))
            .await
    }

    pub async fn stop(&self, container: &str) -> Result<ControlAck, ControlError> {
        self.execute(ControlRequest::new(container, ControlAction::Stop))
            .await
    }

    pub async fn start(&self, container: &str) -> Result<ControlAck, ControlError> {
        self.execute(ControlRequest::new(container, ControlAction::Start))
            .await
    }

    pub async fn restart(&self, container: &str) -> Result<ControlAck, ControlError> {
        self.execute(ControlRequest::new(container, ControlAction::Restart))
            .await
    }

    pub async fn execute(&self, req: ControlRequest) -> Result<ControlAck, ControlError> {
        let result = self.try_execute(&req).await;
        match &result {
            Ok(ack) => info!("{}", ack.message),
            Err(e) => error!("Error during {} of {}: {e}", req.action, req.container),
        }
        result
    }

    async fn try_execute(&self, req: &ControlRequest) -> Result<ControlAck, ControlError> {
        let name = req.container.as_str();
        // restart mirrors the runtime: it works from any state
        if req.action != ControlAction::Restart {
            let state = ContainerState::from(self.runtime.inspect_container(name).await?);
            req.action
                .precondition(&state)
                .map_err(|reason| ControlError::InvalidTransition(reason.to_string()))?;
        }

        match req.action {
            ControlAction::Pause => self.runtime.pause_container(name).await?,
            ControlAction::Unpause => self.runtime.unpause_container(name).await?,
            ControlAction::Stop => self.runtime.stop_container(name).await?,
            ControlAction::Start => self.runtime.start_container(name).await?,
            ControlAction::Restart => self.runtime.restart_container(name).await?,
        }
        Ok(ControlAck::from(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::containers::inspector::RuntimeInspector;
    use crate::outbound::runtime_memory::{InMemoryRuntime, MemoryContainer};

    fn setup(containers: Vec<MemoryContainer>) -> (ControlGateway<InMemoryRuntime>, InMemoryRuntime) {
        let runtime = InMemoryRuntime::new(containers);
        (ControlGateway::new(runtime.clone()), runtime)
    }

    #[tokio::test]
    async fn pause_rejects_stopped_container_and_leaves_it_alone() {
        let (gateway, runtime) = setup(vec![MemoryContainer::stopped("kafka")]);
        let before = RuntimeInspector::new(runtime.clone()).inspect("kafka").await;

        let err = gateway.pause("kafka").await.unwrap_err();
        assert_eq!(
            err,
            ControlError::InvalidTransition("Container is not running".to_string())
        );

        let after = RuntimeInspector::new(runtime.clone()).inspect("kafka").await;
        assert_eq!(before, after);
        assert!(runtime.forwarded().await.is_empty());
    }

    #[tokio::test]
    async fn pause_running_container() {
        let (gateway, runtime) = setup(vec![MemoryContainer::running("kafka")]);
        let ack = gateway.pause("kafka").await.unwrap();
        assert_eq!(ack.message, "Container kafka paused");
        assert_eq!(ack.action, ControlAction::Pause);

        let state = RuntimeInspector::new(runtime).inspect("kafka").await;
        assert!(state.paused);
    }

    #[tokio::test]
    async fn pause_twice_is_rejected() {
        let (gateway, _) = setup(vec![MemoryContainer::paused("kafka")]);
        assert_eq!(
            gateway.pause("kafka").await,
            Err(ControlError::InvalidTransition(
                "Container is already paused".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn unpause_requires_paused() {
        let (gateway, _) = setup(vec![
            MemoryContainer::running("minio"),
            MemoryContainer::paused("trino"),
        ]);
        assert!(matches!(
            gateway.unpause("minio").await,
            Err(ControlError::InvalidTransition(_))
        ));
        assert_eq!(
            gateway.unpause("trino").await.unwrap().message,
            "Container trino resumed"
        );
    }

    #[tokio::test]
    async fn stop_and_start_check_running() {
        let (gateway, _) = setup(vec![
            MemoryContainer::running("minio"),
            MemoryContainer::stopped("client"),
        ]);
        assert!(matches!(
            gateway.stop("client").await,
            Err(ControlError::InvalidTransition(_))
        ));
        assert!(matches!(
            gateway.start("minio").await,
            Err(ControlError::InvalidTransition(_))
        ));
        gateway.stop("minio").await.unwrap();
        gateway.start("client").await.unwrap();
    }

    #[tokio::test]
    async fn restart_is_always_forwarded() {
        let (gateway, runtime) = setup(vec![
            MemoryContainer::running("minio"),
            MemoryContainer::stopped("client"),
            MemoryContainer::paused("trino"),
        ]);
        for name in ["minio", "client", "trino"] {
            let ack = gateway.restart(name).await.unwrap();
            assert_eq!(ack.message, format!("Container {name} restarted"));
        }
        assert_eq!(runtime.forwarded().await.len(), 3);
    }

    #[tokio::test]
    async fn runtime_faults_are_backend_errors() {
        let (gateway, runtime) = setup(vec![MemoryContainer::running("minio")]);
        runtime.set_unavailable(true).await;
        assert!(matches!(
            gateway.stop("minio").await,
            Err(ControlError::BackendUnavailable(_))
        ));
        assert!(matches!(
            gateway.restart("minio").await,
            Err(ControlError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn unknown_container_is_not_found() {
        let (gateway, _) = setup(vec![]);
        assert!(matches!(
            gateway.start("ghost").await,
            Err(ControlError::ContainerNotFound(_))
        ));
    }
}
