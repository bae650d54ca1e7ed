//! Marathon and Mesos REST payloads
//!
//! Only the fields the chaos engine reads are modelled; everything else in
//! the responses is ignored.

use serde::{Deserialize, Serialize};

/// `GET /v2/tasks`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub id: String,

    #[serde(rename = "appId", default)]
    pub app_id: String,

    #[serde(default)]
    pub host: String,
}

/// `GET /v2/apps`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppList {
    #[serde(default)]
    pub apps: Vec<App>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct App {
    pub id: String,
}

/// `GET /v2/leader`
#[derive(Debug, Clone, Deserialize)]
pub struct Leader {
    pub leader: String,
}

/// `GET /slaves` on the Mesos master
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlaveList {
    #[serde(default)]
    pub slaves: Vec<Slave>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Slave {
    pub hostname: String,

    #[serde(default)]
    pub id: String,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Body of `POST /v2/tasks/delete`
#[derive(Debug, Serialize)]
pub struct TaskIds<'a> {
    pub ids: &'a [String],
}
