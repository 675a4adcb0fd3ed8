// Container runtime seam: the scheduler and the HTTP layer only see this trait.

mod docker;
mod memory;

pub use docker::DockerRuntime;
pub use memory::MemoryRuntime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Point-in-time resource usage of one container.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerUsage {
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

/// Start/stop/inspect containers by name. Implementations must tolerate
/// concurrent calls for different names; errors are never fatal to callers.
#[async_trait]
pub trait Runtime: Send + Sync {
    async fn is_running(&self, name: &str) -> anyhow::Result<bool>;
    async fn start(&self, name: &str) -> anyhow::Result<()>;
    async fn stop(&self, name: &str) -> anyhow::Result<()>;
    async fn list_containers(&self) -> anyhow::Result<Vec<String>>;
    async fn stats(&self, name: &str) -> anyhow::Result<ContainerUsage>;
}
