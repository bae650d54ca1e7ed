//! Cluster Manager Client
//!
//! The chaos engine only talks to the cluster through the [`ClusterClient`]
//! trait. [`MarathonClient`] binds it to the Marathon REST API (with host
//! inventory from the Mesos master), and [`DryRunClient`] wraps any client so
//! that reads go through but kills are only logged.

pub mod dry_run;
pub mod marathon;
pub mod retry;
pub mod types;

use crate::error::Result;
use async_trait::async_trait;

pub use dry_run::DryRunClient;
pub use marathon::MarathonClient;
pub use retry::RetryConfig;

/// Operations the chaos engine needs from the cluster manager
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Ids of every running task
    async fn list_tasks(&self) -> Result<Vec<String>>;

    /// Ids of every deployed application
    async fn list_applications(&self) -> Result<Vec<String>>;

    /// Kill one task without scaling its application down
    async fn kill_task(&self, id: &str) -> Result<()>;

    /// Kill a batch of tasks without scaling their applications down
    async fn kill_tasks(&self, ids: &[String]) -> Result<()>;

    /// Kill every task of one application
    async fn kill_application_tasks(&self, app_id: &str) -> Result<()>;

    /// Hostnames of the cluster's worker nodes
    async fn list_hosts(&self) -> Result<Vec<String>>;

    /// Ids of the tasks running on one host
    async fn tasks_on_host(&self, hostname: &str) -> Result<Vec<String>>;
}
