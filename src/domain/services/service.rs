use crate::domain::containers::inspector::RuntimeInspector;
use crate::domain::containers::models::state::ContainerState;
use crate::domain::containers::port::ContainerRuntime;
use crate::domain::services::models::descriptor::{ServiceDescriptor, ServiceRegistry};
use crate::domain::services::models::health::ServiceHealth;
use crate::domain::services::probes::{ProbeTable, ProbeTarget};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio::time;

/// Produces the health of every registered service in one concurrent sweep.
#[derive(Clone)]
pub struct HealthAggregator<R: ContainerRuntime> {
    inspector: RuntimeInspector<R>,
    registry: Arc<ServiceRegistry>,
    probes: Arc<ProbeTable>,
    probe_host: Option<String>,
}

impl<R: ContainerRuntime> HealthAggregator<R> {
    pub fn new(runtime: R, registry: Arc<ServiceRegistry>, probes: ProbeTable) -> Self {
        Self {
            inspector: RuntimeInspector::new(runtime),
            registry,
            probes: Arc::new(probes),
            probe_host: None,
        }
    }

    /// Probe every service on `host` instead of its container name.
    pub fn with_probe_host(mut self, host: Option<String>) -> Self {
        self.probe_host = host;
        self
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// One full sweep. Results come back in registry order; a service whose
    /// check blows up is reported down without affecting the others.
    /// Dropping the returned future aborts every check still in flight.
    pub async fn aggregate(&self) -> Vec<ServiceHealth> {
        let started = Instant::now();
        let mut checks = JoinSet::new();
        for (index, service) in self.registry.iter().enumerate() {
            let this = self.clone();
            let service = service.clone();
            checks.spawn(async move { (index, this.check(service).await) });
        }

        let mut slots: Vec<Option<ServiceHealth>> = vec![None; self.registry.len()];
        while let Some(result) = checks.join_next().await {
            match result {
                Ok((index, health)) => slots[index] = Some(health),
                Err(e) => warn!("health check aborted: {e}"),
            }
        }

        let statuses: Vec<ServiceHealth> = slots
            .into_iter()
            .zip(self.registry.iter())
            .map(|(slot, service)| {
                slot.unwrap_or_else(|| {
                    ServiceHealth::new(service.clone(), ContainerState::not_found(), false)
                })
            })
            .collect();

        debug!(
            "aggregated {} services in {:?}",
            statuses.len(),
            started.elapsed()
        );
        statuses
    }

    /// Inspects the container and, only when it runs, probes the service.
    pub async fn check(&self, service: ServiceDescriptor) -> ServiceHealth {
        let container = time::timeout(
            self.probes.timeout(),
            self.inspector.inspect(&service.container),
        )
        .await
        .unwrap_or_else(|_| {
            debug!("inspecting {} timed out", service.container);
            ContainerState::not_found()
        });
        let service_up = if container.running {
            let target = ProbeTarget {
                host: self
                    .probe_host
                    .clone()
                    .unwrap_or_else(|| service.container.clone()),
                port: service.port,
                health_path: service.health_path.clone().unwrap_or_else(|| "/".to_string()),
                running: container.running,
            };
            self.probes.run(service.kind, &target).await
        } else {
            false
        };
        ServiceHealth::new(service, container, service_up)
    }
}
