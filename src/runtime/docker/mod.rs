// Docker runtime via bollard

mod stats;

use super::{ContainerUsage, Runtime};
use async_trait::async_trait;
use bollard::Docker;
use bollard::errors::Error as DockerError;
use bollard::query_parameters::{
    InspectContainerOptions, ListContainersOptions, StartContainerOptions, StatsOptions,
    StopContainerOptions,
};
use futures_util::StreamExt;
use tracing::instrument;

/// Docker answers 304 when the container is already in the requested state.
const NOT_MODIFIED: u16 = 304;

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn connect() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_unix_defaults()?;
        Ok(Self { docker })
    }
}

fn ignore_not_modified(result: Result<(), DockerError>) -> anyhow::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(DockerError::DockerResponseServerError { status_code, .. })
            if status_code == NOT_MODIFIED =>
        {
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Runtime for DockerRuntime {
    #[instrument(skip(self), fields(runtime = "docker", operation = "is_running"))]
    async fn is_running(&self, name: &str) -> anyhow::Result<bool> {
        let info = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await?;
        Ok(info.state.and_then(|s| s.running).unwrap_or(false))
    }

    #[instrument(skip(self), fields(runtime = "docker", operation = "start"))]
    async fn start(&self, name: &str) -> anyhow::Result<()> {
        ignore_not_modified(
            self.docker
                .start_container(name, None::<StartContainerOptions>)
                .await,
        )
    }

    #[instrument(skip(self), fields(runtime = "docker", operation = "stop"))]
    async fn stop(&self, name: &str) -> anyhow::Result<()> {
        ignore_not_modified(
            self.docker
                .stop_container(name, None::<StopContainerOptions>)
                .await,
        )
    }

    async fn list_containers(&self) -> anyhow::Result<Vec<String>> {
        let options = ListContainersOptions {
            all: true,
            ..Default::default()
        };
        let containers = self.docker.list_containers(Some(options)).await?;
        let names = containers
            .iter()
            .filter_map(|c| c.names.as_ref().and_then(|n| n.first()))
            .map(|n| n.trim_start_matches('/').to_string())
            .collect();
        Ok(names)
    }

    #[instrument(skip(self), fields(runtime = "docker", operation = "stats"))]
    async fn stats(&self, name: &str) -> anyhow::Result<ContainerUsage> {
        let options = StatsOptions {
            stream: false,
            ..Default::default()
        };
        let mut stream = self.docker.stats(name, Some(options));
        let sample = stream
            .next()
            .await
            .ok_or_else(|| anyhow::anyhow!("no stats sample for container {}", name))??;
        stats::usage_from_stats(&sample)
            .ok_or_else(|| anyhow::anyhow!("incomplete stats sample for container {}", name))
    }
}
