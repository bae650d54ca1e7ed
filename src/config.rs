// Configuration File Support
//
// TOML configuration for the chaos daemon, with TURMOIL_* environment
// variable overrides. Looked up at /mnt/mesos/sandbox/params.toml, then
// /params.toml, unless a path is given explicitly.

use crate::chaos::{ActionKind, ActionSpec, Blacklist};
use crate::error::{Result, TurmoilError};
use crate::schedule::Window;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file inside a Mesos task sandbox
pub const SANDBOX_CONFIG_PATH: &str = "/mnt/mesos/sandbox/params.toml";

/// Fallback config file at the filesystem root
pub const ROOT_CONFIG_PATH: &str = "/params.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Bare application names that are never targeted
    pub blacklist: Vec<String>,

    /// Cluster manager endpoints
    pub cluster: ClusterConfig,

    /// Daily chaos window
    pub window: WindowConfig,

    /// Per-kind action settings
    pub actions: ActionsConfig,

    /// Action time bounds
    pub timing: TimingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blacklist: vec!["turmoil".to_string()],
            cluster: ClusterConfig::default(),
            window: WindowConfig::default(),
            actions: ActionsConfig::default(),
            timing: TimingConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    /// Marathon API endpoint
    pub marathon_url: String,

    /// Mesos master used for host inventory; the Marathon leader when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesos_url: Option<String>,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            marathon_url: "http://127.0.0.1:8080".to_string(),
            mesos_url: None,
            request_timeout_secs: 10,
        }
    }
}

/// Window boundaries as local "HH:MM" times
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub start: String,
    pub stop: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            start: "10:00".to_string(),
            stop: "16:00".to_string(),
        }
    }
}

/// Settings for one action kind.
///
/// `frequency` is the number of hours between attempts. Both fields are
/// required when the table is present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ActionConfig {
    pub frequency: f64,
    pub probability: f64,
}

/// Settings for the fractional task kill
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FractionActionConfig {
    pub frequency: f64,
    pub probability: f64,
    /// Share of unprotected tasks killed per firing
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActionsConfig {
    pub task: ActionConfig,
    pub app: ActionConfig,
    pub fraction: FractionActionConfig,
    pub host: ActionConfig,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            task: ActionConfig {
                frequency: 0.1,
                probability: 0.5,
            },
            app: ActionConfig {
                frequency: 0.5,
                probability: 0.2,
            },
            fraction: FractionActionConfig {
                frequency: 0.5,
                probability: 0.2,
                fraction: 0.25,
            },
            host: ActionConfig {
                frequency: 2.0,
                probability: 0.25,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Upper bound on one action invocation in seconds
    pub action_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            action_timeout_secs: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to serve /metrics
    pub enabled: bool,

    /// Port for metrics server
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => write!(
                f,
                "built-in defaults (no file at {} or {})",
                SANDBOX_CONFIG_PATH, ROOT_CONFIG_PATH
            ),
        }
    }
}

impl Config {
    /// Load configuration and apply environment overrides.
    ///
    /// An explicit path must exist. Without one, the sandbox and root config
    /// files are tried in turn, falling back to defaults. The result is not
    /// validated so command-line overrides can still be applied; call
    /// [`Config::validate`] afterwards.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<(Self, ConfigSource)> {
        let (mut config, source) = match explicit {
            Some(path) => (Self::read(path)?, ConfigSource::File(path.to_path_buf())),
            None => Self::load_fallback()?,
        };

        config.apply_env_overrides();
        Ok((config, source))
    }

    fn load_fallback() -> anyhow::Result<(Self, ConfigSource)> {
        for candidate in [SANDBOX_CONFIG_PATH, ROOT_CONFIG_PATH] {
            let path = Path::new(candidate);
            if path.exists() {
                return Ok((Self::read(path)?, ConfigSource::File(path.to_path_buf())));
            }
        }
        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// Parse a TOML config file
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file from {:?}", path))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file from {:?}", path))
    }

    /// Apply TURMOIL_* variables from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply TURMOIL_* overrides from an arbitrary variable source:
    /// - TURMOIL_MARATHON_URL, TURMOIL_MESOS_URL
    /// - TURMOIL_START, TURMOIL_STOP
    /// - TURMOIL_BLACKLIST (comma-separated)
    /// - TURMOIL_LOG_LEVEL, TURMOIL_LOG_FORMAT
    /// - TURMOIL_METRICS_ENABLED, TURMOIL_METRICS_PORT
    /// - TURMOIL_ACTION_TIMEOUT_SECS
    /// - TURMOIL_{TASK,APP,FRACTION,HOST}_{FREQUENCY,PROBABILITY}, TURMOIL_FRACTION
    ///
    /// Unparsable numeric values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TURMOIL_MARATHON_URL") {
            self.cluster.marathon_url = url;
        }
        if let Some(url) = lookup("TURMOIL_MESOS_URL") {
            self.cluster.mesos_url = Some(url);
        }

        if let Some(start) = lookup("TURMOIL_START") {
            self.window.start = start;
        }
        if let Some(stop) = lookup("TURMOIL_STOP") {
            self.window.stop = stop;
        }

        if let Some(names) = lookup("TURMOIL_BLACKLIST") {
            self.set_blacklist(&names);
        }

        if let Some(level) = lookup("TURMOIL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("TURMOIL_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Some(enabled) = lookup("TURMOIL_METRICS_ENABLED") {
            self.metrics.enabled = enabled.parse().unwrap_or(self.metrics.enabled);
        }
        if let Some(port) = lookup("TURMOIL_METRICS_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.metrics.port = port;
            }
        }

        if let Some(timeout) = lookup("TURMOIL_ACTION_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.timing.action_timeout_secs = timeout;
            }
        }

        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());
        let actions = &mut self.actions;
        for (prefix, action) in [
            ("TASK", &mut actions.task),
            ("APP", &mut actions.app),
            ("HOST", &mut actions.host),
        ] {
            if let Some(frequency) = number(&format!("TURMOIL_{}_FREQUENCY", prefix)) {
                action.frequency = frequency;
            }
            if let Some(probability) = number(&format!("TURMOIL_{}_PROBABILITY", prefix)) {
                action.probability = probability;
            }
        }
        if let Some(frequency) = number("TURMOIL_FRACTION_FREQUENCY") {
            actions.fraction.frequency = frequency;
        }
        if let Some(probability) = number("TURMOIL_FRACTION_PROBABILITY") {
            actions.fraction.probability = probability;
        }
        if let Some(fraction) = number("TURMOIL_FRACTION") {
            actions.fraction.fraction = fraction;
        }
    }

    /// Replace the blacklist from a comma-separated string
    pub fn set_blacklist(&mut self, csv: &str) {
        self.blacklist = Blacklist::parse(csv)
            .names()
            .into_iter()
            .map(str::to_string)
            .collect();
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`TurmoilError::Configuration`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(invalid(format!(
                "log level {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ))),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => return Err(invalid(format!(
                "log format {}. Must be one of: json, pretty, compact",
                self.logging.format
            ))),
        }

        let window = self.window()?;
        if window.start() == window.stop() {
            return Err(invalid(format!(
                "window start and stop are both {}",
                window.start()
            )));
        }

        check_url("cluster.marathon_url", &self.cluster.marathon_url)?;
        if let Some(url) = &self.cluster.mesos_url {
            check_url("cluster.mesos_url", url)?;
        }
        if self.cluster.request_timeout_secs == 0 {
            return Err(invalid("cluster.request_timeout_secs must be > 0"));
        }
        if self.timing.action_timeout_secs == 0 {
            return Err(invalid("timing.action_timeout_secs must be > 0"));
        }

        let actions = &self.actions;
        check_action("actions.task", actions.task.frequency, actions.task.probability)?;
        check_action("actions.app", actions.app.frequency, actions.app.probability)?;
        check_action("actions.host", actions.host.frequency, actions.host.probability)?;
        check_action(
            "actions.fraction",
            actions.fraction.frequency,
            actions.fraction.probability,
        )?;
        check_unit("actions.fraction.fraction", actions.fraction.fraction)?;

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port must be > 0"));
        }

        Ok(())
    }

    /// The configured window
    pub fn window(&self) -> Result<Window> {
        Window::parse(&self.window.start, &self.window.stop)
    }

    pub fn blacklist(&self) -> Blacklist {
        Blacklist::new(&self.blacklist)
    }

    /// One spec per action kind, eligible or not
    pub fn action_specs(&self) -> Vec<ActionSpec> {
        let a = &self.actions;
        vec![
            ActionSpec::from_hours(ActionKind::KillTask, a.task.frequency, a.task.probability),
            ActionSpec::from_hours(ActionKind::KillApp, a.app.frequency, a.app.probability),
            ActionSpec::from_hours(
                ActionKind::KillFraction {
                    fraction: a.fraction.fraction,
                },
                a.fraction.frequency,
                a.fraction.probability,
            ),
            ActionSpec::from_hours(ActionKind::KillHost, a.host.frequency, a.host.probability),
        ]
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.cluster.request_timeout_secs)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.timing.action_timeout_secs)
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> anyhow::Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }
}

fn invalid(message: impl Into<String>) -> TurmoilError {
    TurmoilError::Configuration(message.into())
}

fn check_url(field: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(invalid(format!("{} must be an http(s) URL, got {:?}", field, url)))
    }
}

fn check_unit(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{} must be within [0, 1], got {}", field, value)))
    }
}

fn check_action(table: &str, frequency: f64, probability: f64) -> Result<()> {
    if !frequency.is_finite() || frequency < 0.0 {
        return Err(invalid(format!(
            "{}.frequency must be a non-negative number of hours, got {}",
            table, frequency
        )));
    }
    check_unit(&format!("{}.probability", table), probability)
}
