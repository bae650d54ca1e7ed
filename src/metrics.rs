// Prometheus metrics for the chaos daemon
//
// Exposed on the /metrics HTTP endpoint when enabled:
// - Action attempts and outcomes per kind (counter)
// - Targets killed per kind (counter)
// - Action latency (histogram)
// - Running timers and window state (gauge)

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref ACTION_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("turmoil_action_attempts_total", "Timer ticks per action kind"),
        &["kind"]
    ).expect("Failed to create action attempts metric");

    pub static ref ACTION_OUTCOMES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("turmoil_action_outcomes_total", "Tick outcomes per action kind"),
        &["kind", "outcome"]
    ).expect("Failed to create action outcomes metric");

    pub static ref TARGETS_KILLED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("turmoil_targets_killed_total", "Task or application ids named in kill requests"),
        &["kind"]
    ).expect("Failed to create targets killed metric");

    pub static ref ACTION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("turmoil_action_duration_seconds", "Duration of executed actions"),
        &["kind"]
    ).expect("Failed to create action duration metric");

    pub static ref RUNNING_TIMERS: IntGauge = IntGauge::new(
        "turmoil_running_timers",
        "Number of action timers currently running"
    ).expect("Failed to create running timers metric");

    pub static ref WINDOW_OPEN: IntGauge = IntGauge::new(
        "turmoil_window_open",
        "1 while the chaos window is open"
    ).expect("Failed to create window open metric");
}

/// Initialize metrics registry - must be called once at daemon startup
pub fn init() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(ACTION_ATTEMPTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ACTION_OUTCOMES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TARGETS_KILLED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ACTION_DURATION_SECONDS.clone()))?;
    REGISTRY.register(Box::new(RUNNING_TIMERS.clone()))?;
    REGISTRY.register(Box::new(WINDOW_OPEN.clone()))?;
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}
