//! Read-only client wrapper for rehearsing a chaos schedule.

use super::ClusterClient;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Passes reads through to the wrapped client and only logs kills
pub struct DryRunClient {
    inner: Arc<dyn ClusterClient>,
}

impl DryRunClient {
    pub fn new(inner: Arc<dyn ClusterClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ClusterClient for DryRunClient {
    async fn list_tasks(&self) -> Result<Vec<String>> {
        self.inner.list_tasks().await
    }

    async fn list_applications(&self) -> Result<Vec<String>> {
        self.inner.list_applications().await
    }

    async fn kill_task(&self, id: &str) -> Result<()> {
        info!(task = id, "Dry run: would kill task");
        Ok(())
    }

    async fn kill_tasks(&self, ids: &[String]) -> Result<()> {
        info!(count = ids.len(), tasks = ?ids, "Dry run: would kill tasks");
        Ok(())
    }

    async fn kill_application_tasks(&self, app_id: &str) -> Result<()> {
        info!(app = app_id, "Dry run: would kill all tasks of application");
        Ok(())
    }

    async fn list_hosts(&self) -> Result<Vec<String>> {
        self.inner.list_hosts().await
    }

    async fn tasks_on_host(&self, hostname: &str) -> Result<Vec<String>> {
        self.inner.tasks_on_host(hostname).await
    }
}
