//! Marathon REST binding for [`ClusterClient`]
//!
//! Tasks and applications come from Marathon's `/v2` API. Host inventory
//! comes from the Mesos master's `/slaves` endpoint, reached either through
//! an explicitly configured URL or through the leader Marathon reports.

use super::retry::{retry_with_backoff, should_retry_status, RetryConfig};
use super::types::{AppList, Leader, SlaveList, TaskIds, TaskList};
use super::ClusterClient;
use crate::error::{Result, TurmoilError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for a Marathon endpoint
#[derive(Debug, Clone)]
pub struct MarathonClient {
    http: reqwest::Client,
    base_url: String,
    mesos_url: Option<String>,
    retry: RetryConfig,
}

impl MarathonClient {
    /// Create a client for the Marathon endpoint at `base_url`
    ///
    /// # Errors
    ///
    /// Returns `TurmoilError::Configuration` if the URL is not http(s), or
    /// `TurmoilError::ClientCommunication` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(TurmoilError::Configuration(format!(
                "Marathon URL must start with http:// or https://, got {:?}",
                base_url
            )));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            mesos_url: None,
            retry: RetryConfig::default(),
        })
    }

    /// Query host inventory from this Mesos master instead of the Marathon leader
    pub fn with_mesos_url(mut self, mesos_url: Option<String>) -> Self {
        self.mesos_url = mesos_url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET and decode a JSON body, retrying transient failures
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        retry_with_backoff(&self.retry, move || async move {
            tracing::debug!("GET {}", url);
            let response = self.http.get(url).send().await?;
            let response = check_status("GET", url, response)?;
            response.json::<T>().await.map_err(|e| {
                TurmoilError::ClientCommunication(format!("invalid response from {}: {}", url, e))
            })
        })
        .await
    }

    async fn all_tasks(&self) -> Result<TaskList> {
        self.get_json(&self.url("/v2/tasks")).await
    }

    /// Base URL of the Mesos master holding the host inventory
    async fn inventory_url(&self) -> Result<String> {
        if let Some(mesos_url) = &self.mesos_url {
            return Ok(mesos_url.clone());
        }

        let leader: Leader = self.get_json(&self.url("/v2/leader")).await?;
        if leader.leader.is_empty() {
            return Err(TurmoilError::ClientCommunication(
                "Marathon reported no leader".to_string(),
            ));
        }
        Ok(with_scheme(&leader.leader))
    }
}

fn check_status(method: &str, url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let transient = if should_retry_status(status.as_u16()) {
        " (temporary)"
    } else {
        ""
    };
    Err(TurmoilError::ClientCommunication(format!(
        "{} {} failed with status {}{}",
        method, url, status, transient
    )))
}

fn with_scheme(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    }
}

#[async_trait]
impl ClusterClient for MarathonClient {
    async fn list_tasks(&self) -> Result<Vec<String>> {
        let list = self.all_tasks().await?;
        Ok(list.tasks.into_iter().map(|t| t.id).collect())
    }

    async fn list_applications(&self) -> Result<Vec<String>> {
        let list: AppList = self.get_json(&self.url("/v2/apps")).await?;
        Ok(list.apps.into_iter().map(|a| a.id).collect())
    }

    async fn kill_task(&self, id: &str) -> Result<()> {
        self.kill_tasks(&[id.to_string()]).await
    }

    async fn kill_tasks(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let url = self.url("/v2/tasks/delete?scale=false");
        tracing::debug!("POST {} ({} tasks)", url, ids.len());
        let response = self
            .http
            .post(&url)
            .json(&TaskIds { ids })
            .send()
            .await?;
        check_status("POST", &url, response)?;
        Ok(())
    }

    async fn kill_application_tasks(&self, app_id: &str) -> Result<()> {
        let app = app_id.trim_start_matches('/');
        let url = self.url(&format!("/v2/apps/{}/tasks?scale=false", app));
        tracing::debug!("DELETE {}", url);
        let response = self.http.delete(&url).send().await?;
        check_status("DELETE", &url, response)?;
        Ok(())
    }

    async fn list_hosts(&self) -> Result<Vec<String>> {
        let inventory = self.inventory_url().await?;
        let list: SlaveList = self.get_json(&format!("{}/slaves", inventory)).await?;
        Ok(list
            .slaves
            .into_iter()
            .filter(|s| s.active && !s.hostname.is_empty())
            .map(|s| s.hostname)
            .collect())
    }

    async fn tasks_on_host(&self, hostname: &str) -> Result<Vec<String>> {
        let list = self.all_tasks().await?;
        Ok(list
            .tasks
            .into_iter()
            .filter(|t| t.host == hostname)
            .map(|t| t.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Requests the fake Marathon received that change cluster state
    #[derive(Default)]
    struct Recorded {
        killed_tasks: Vec<String>,
        killed_apps: Vec<String>,
    }

    type Shared = Arc<Mutex<Recorded>>;

    async fn tasks() -> Json<Value> {
        Json(json!({
            "tasks": [
                {"id": "web.a1b2", "appId": "/web", "host": "agent-1"},
                {"id": "web.c3d4", "appId": "/web", "host": "agent-2"},
                {"id": "api.e5f6", "appId": "/api", "host": "agent-1"}
            ]
        }))
    }

    async fn apps() -> Json<Value> {
        Json(json!({"apps": [{"id": "/web"}, {"id": "/api"}, {"id": "/turmoil"}]}))
    }

    async fn slaves() -> Json<Value> {
        Json(json!({
            "slaves": [
                {"hostname": "agent-1", "active": true},
                {"hostname": "agent-2"},
                {"hostname": "agent-3", "active": false}
            ]
        }))
    }

    async fn delete_tasks(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
        let ids = body["ids"].as_array().cloned().unwrap_or_default();
        let mut recorded = state.lock().unwrap();
        for id in ids {
            recorded.killed_tasks.push(id.as_str().unwrap_or_default().to_string());
        }
        StatusCode::OK
    }

    async fn delete_app_tasks(State(state): State<Shared>, Path(app): Path<String>) -> StatusCode {
        state.lock().unwrap().killed_apps.push(app);
        StatusCode::OK
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("{}", addr)
    }

    /// Fake Marathon that also serves Mesos `/slaves` and names itself leader
    async fn fake_marathon() -> (MarathonClient, Shared) {
        let state = Shared::default();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let leader = addr.to_string();

        let router = Router::new()
            .route("/v2/tasks", get(tasks))
            .route("/v2/apps", get(apps))
            .route(
                "/v2/leader",
                get(move || {
                    let leader = leader.clone();
                    async move { Json(json!({ "leader": leader })) }
                }),
            )
            .route("/slaves", get(slaves))
            .route("/v2/tasks/delete", post(delete_tasks))
            .route("/v2/apps/{app}/tasks", delete(delete_app_tasks))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = MarathonClient::new(format!("http://{}", addr), Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryConfig::disabled());
        (client, state)
    }

    #[test]
    fn test_new_rejects_non_http_url() {
        let err = MarathonClient::new("127.0.0.1:8080", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, TurmoilError::Configuration(_)));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = MarathonClient::new("http://marathon:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://marathon:8080");
        assert_eq!(client.url("/v2/tasks"), "http://marathon:8080/v2/tasks");
    }

    #[test]
    fn test_with_scheme() {
        assert_eq!(with_scheme("leader:5050"), "http://leader:5050");
        assert_eq!(with_scheme("https://leader:5050/"), "https://leader:5050");
    }

    #[tokio::test]
    async fn test_list_tasks_and_apps() {
        let (client, _) = fake_marathon().await;
        assert_eq!(
            client.list_tasks().await.unwrap(),
            vec!["web.a1b2", "web.c3d4", "api.e5f6"]
        );
        assert_eq!(
            client.list_applications().await.unwrap(),
            vec!["/web", "/api", "/turmoil"]
        );
    }

    #[tokio::test]
    async fn test_list_hosts_through_leader() {
        let (client, _) = fake_marathon().await;
        assert_eq!(client.list_hosts().await.unwrap(), vec!["agent-1", "agent-2"]);
    }

    #[tokio::test]
    async fn test_list_hosts_from_configured_mesos() {
        let mesos = serve(Router::new().route("/slaves", get(slaves))).await;
        let client = MarathonClient::new("http://127.0.0.1:1", Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryConfig::disabled())
            .with_mesos_url(Some(format!("http://{}/", mesos)));
        assert_eq!(client.list_hosts().await.unwrap(), vec!["agent-1", "agent-2"]);
    }

    #[tokio::test]
    async fn test_tasks_on_host() {
        let (client, _) = fake_marathon().await;
        assert_eq!(
            client.tasks_on_host("agent-1").await.unwrap(),
            vec!["web.a1b2", "api.e5f6"]
        );
        assert!(client.tasks_on_host("agent-9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_kill_calls_reach_marathon() {
        let (client, state) = fake_marathon().await;

        client.kill_task("web.a1b2").await.unwrap();
        client
            .kill_tasks(&["web.c3d4".to_string(), "api.e5f6".to_string()])
            .await
            .unwrap();
        client.kill_application_tasks("/web").await.unwrap();

        let recorded = state.lock().unwrap();
        assert_eq!(recorded.killed_tasks, vec!["web.a1b2", "web.c3d4", "api.e5f6"]);
        assert_eq!(recorded.killed_apps, vec!["web"]);
    }

    #[tokio::test]
    async fn test_error_status_is_communication_error() {
        let server = serve(Router::new().route(
            "/v2/tasks",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        let client = MarathonClient::new(format!("http://{}", server), Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryConfig::disabled());

        let err = client.list_tasks().await.unwrap_err();
        match err {
            TurmoilError::ClientCommunication(message) => {
                assert!(message.contains("503"));
                assert!(message.contains("temporary"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let client = MarathonClient::new("http://127.0.0.1:1", Duration::from_secs(2))
            .unwrap()
            .with_retry(RetryConfig::disabled());
        assert!(matches!(
            client.list_applications().await,
            Err(TurmoilError::ClientCommunication(_))
        ));
    }
}
