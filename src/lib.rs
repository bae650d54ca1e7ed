//! Turmoil Library
//!
//! Window-gated chaos injection for a Marathon/Mesos cluster: randomly kills
//! tasks, applications, fractions of tasks, or whole hosts, but only during a
//! configured daily window and never touching blacklisted applications.

pub mod chaos;
pub mod cluster;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod metrics_server;
pub mod schedule;

pub use error::{Result, TurmoilError};
