use crate::domain::containers::models::state::ContainerState;
use crate::domain::services::models::descriptor::ServiceDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health of one service captured during a single aggregation cycle.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    #[serde(flatten)]
    pub service: ServiceDescriptor,
    pub container: ContainerState,
    pub service_up: bool,
    pub timestamp: DateTime<Utc>,
}

impl ServiceHealth {
    /// `probe_result` is ignored unless the container is running.
    pub fn new(service: ServiceDescriptor, container: ContainerState, probe_result: bool) -> Self {
        let service_up = container.running && probe_result;
        Self {
            service,
            container,
            service_up,
            timestamp: Utc::now(),
        }
    }
}
