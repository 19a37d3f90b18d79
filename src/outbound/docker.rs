use crate::domain::containers::logs::frame;
use crate::domain::containers::port::{ContainerRuntime, RuntimeError};
use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerInspectResponse, ContainerSummary};
use bollard::query_parameters::{
    InspectContainerOptions, ListContainersOptionsBuilder, LogsOptionsBuilder,
    RestartContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::{API_DEFAULT_VERSION, Docker};
use futures_util::StreamExt;
use log::{debug, info};

const SOCKET_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects to `socket` when given, otherwise to the local defaults
    /// (`DOCKER_HOST` or `/var/run/docker.sock`).
    pub fn connect(socket: Option<&str>) -> Result<Self, BollardError> {
        let docker = match socket {
            Some(path) => {
                info!("Connecting to docker at {path}");
                Docker::connect_with_socket(path, SOCKET_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            None => Docker::connect_with_local_defaults()?,
        };
        Ok(Self { docker })
    }
}

impl ContainerRuntime for DockerRuntime {
    async fn inspect_container(&self, name: &str) -> Result<ContainerInspectResponse, RuntimeError> {
        Ok(self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await?)
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let options = ListContainersOptionsBuilder::default().all(true).build();
        let containers = self.docker.list_containers(Some(options)).await?;
        debug!("found {} containers", containers.len());
        Ok(containers)
    }

    async fn pause_container(&self, name: &str) -> Result<(), RuntimeError> {
        Ok(self.docker.pause_container(name).await?)
    }

    async fn unpause_container(&self, name: &str) -> Result<(), RuntimeError> {
        Ok(self.docker.unpause_container(name).await?)
    }

    async fn stop_container(&self, name: &str) -> Result<(), RuntimeError> {
        Ok(self
            .docker
            .stop_container(name, None::<StopContainerOptions>)
            .await?)
    }

    async fn start_container(&self, name: &str) -> Result<(), RuntimeError> {
        Ok(self
            .docker
            .start_container(name, None::<StartContainerOptions>)
            .await?)
    }

    async fn restart_container(&self, name: &str) -> Result<(), RuntimeError> {
        Ok(self
            .docker
            .restart_container(name, None::<RestartContainerOptions>)
            .await?)
    }

    async fn container_logs(&self, name: &str, tail: usize) -> Result<Vec<u8>, RuntimeError> {
        let options = LogsOptionsBuilder::default()
            .stdout(true)
            .stderr(true)
            .timestamps(true)
            .tail(&tail.to_string())
            .build();

        // bollard already splits the stream into frames; put the headers back
        // so every backend hands over the same wire format
        let mut raw = Vec::new();
        let mut stream = self.docker.logs(name, Some(options));
        while let Some(output) = stream.next().await {
            match output? {
                LogOutput::StdIn { message } => raw.extend(frame(0, &message)),
                LogOutput::StdOut { message } => raw.extend(frame(1, &message)),
                LogOutput::StdErr { message } => raw.extend(frame(2, &message)),
                LogOutput::Console { message } => raw.extend_from_slice(&message),
            }
        }
        Ok(raw)
    }
}
