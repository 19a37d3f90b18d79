use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::slice::Iter;

/// How the liveness of a service is determined once its container runs.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// HTTP GET against `healthPath`, anything below 500 counts as up.
    Web,
    /// Plain TCP connect.
    Tcp,
    /// No network probe, the container running is enough.
    #[serde(alias = "container-only")]
    Container,
    #[serde(other)]
    Unknown,
}

impl Display for CheckKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckKind::Web => write!(f, "web"),
            CheckKind::Tcp => write!(f, "tcp"),
            CheckKind::Container => write!(f, "container"),
            CheckKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Static description of one service of the stack.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub name: String,
    #[serde(rename = "containerName", alias = "container")]
    pub container: String,
    #[serde(rename = "type")]
    pub kind: CheckKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_path: Option<String>,
    pub label: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_port: Option<u16>,
}

impl ServiceDescriptor {
    pub fn web(
        name: &str,
        port: u16,
        health_path: &str,
        label: &str,
        category: &str,
        web_port: u16,
    ) -> Self {
        Self {
            name: name.to_string(),
            container: name.to_string(),
            kind: CheckKind::Web,
            port: Some(port),
            health_path: Some(health_path.to_string()),
            label: label.to_string(),
            category: category.to_string(),
            web_port: Some(web_port),
        }
    }

    pub fn tcp(name: &str, port: u16, label: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            container: name.to_string(),
            kind: CheckKind::Tcp,
            port: Some(port),
            health_path: None,
            label: label.to_string(),
            category: category.to_string(),
            web_port: None,
        }
    }

    pub fn container_only(name: &str, label: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            container: name.to_string(),
            kind: CheckKind::Container,
            port: None,
            health_path: None,
            label: label.to_string(),
            category: category.to_string(),
            web_port: None,
        }
    }
}

/// The fixed set of services watched by the dashboard, in display order.
///
/// Built once at startup and shared behind an `Arc`; there is no way to add
/// or remove services afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRegistry {
    services: Vec<ServiceDescriptor>,
}

impl ServiceRegistry {
    pub fn new(services: Vec<ServiceDescriptor>) -> Self {
        Self { services }
    }

    pub fn iter(&self) -> Iter<'_, ServiceDescriptor> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }
}

impl Default for ServiceRegistry {
    /// The data platform stack shipped with the compose file.
    fn default() -> Self {
        Self::new(vec![
            ServiceDescriptor::web("minio", 9000, "/minio/health/live", "MinIO", "Storage", 9001),
            ServiceDescriptor::tcp("postgres", 5432, "PostgreSQL (Hive)", "Storage"),
            ServiceDescriptor::tcp("postgres-analytics", 5432, "PostgreSQL Analytics", "Storage"),
            ServiceDescriptor::tcp("hive-metastore", 9083, "Hive Metastore", "Metadata"),
            ServiceDescriptor::tcp("zookeeper", 2181, "Zookeeper", "Kafka"),
            ServiceDescriptor::tcp("kafka", 29092, "Kafka Broker", "Kafka"),
            ServiceDescriptor::web("kafka-ui", 8080, "/", "Kafka UI", "Kafka", 8090),
            ServiceDescriptor::web("kafka-connect", 8083, "/connectors", "Kafka Connect", "Kafka", 8083),
            ServiceDescriptor::web("logging-server", 9998, "/health", "Logging Server", "Ingestion", 9998),
            ServiceDescriptor::container_only("client", "Weather Client", "Ingestion"),
            ServiceDescriptor::web("flink-jobmanager", 8081, "/overview", "Flink JobManager", "Processing", 8081),
            ServiceDescriptor::container_only("flink-taskmanager", "Flink TaskManager", "Processing"),
            ServiceDescriptor::container_only("flink-sql-client", "Flink SQL Client", "Processing"),
            ServiceDescriptor::web("trino", 8080, "/v1/info", "Trino", "Query", 8080),
            ServiceDescriptor::web("trino-query-ui", 3001, "/", "Trino Query UI", "Query", 3001),
            ServiceDescriptor::web("visualization-server", 3000, "/health", "Visualization", "Visualization", 3000),
        ])
    }
}

impl<'a> IntoIterator for &'a ServiceRegistry {
    type Item = &'a ServiceDescriptor;
    type IntoIter = Iter<'a, ServiceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.services.iter()
    }
}
