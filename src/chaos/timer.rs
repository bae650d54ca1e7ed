//! A single periodic, probability-gated action timer.

use super::action::Execution;
use super::{ActionOutcome, ActionSpec, TurmoilContext};
use crate::error::TurmoilError;
use crate::metrics;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval_at, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Ticks one action kind until cancelled
pub struct ActionTimer {
    spec: ActionSpec,
    ctx: Arc<TurmoilContext>,
}

impl ActionTimer {
    pub fn new(spec: ActionSpec, ctx: Arc<TurmoilContext>) -> Self {
        Self { spec, ctx }
    }

    /// Run until `cancel` fires. The first tick lands one interval after start.
    ///
    /// Cancellation is observed between ticks; an in-flight action is bounded
    /// by the context's action timeout instead of being interrupted.
    pub async fn run(self, cancel: CancellationToken) {
        let kind = self.spec.kind.label();
        let mut ticker = interval_at(
            tokio::time::Instant::now() + self.spec.interval,
            self.spec.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(kind, interval = ?self.spec.interval, "Action timer started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        debug!(kind, "Action timer stopped");
    }

    /// One tick: roll, then run the action with a time bound.
    ///
    /// Failures are logged and swallowed so the timer keeps going.
    pub async fn tick(&self) -> Option<ActionOutcome> {
        let kind = self.spec.kind.label();
        metrics::ACTION_ATTEMPTS_TOTAL.with_label_values(&[kind]).inc();

        if !self.ctx.selector.roll(self.spec.probability) {
            debug!(kind, "Probability roll failed, skipping tick");
            return Some(self.record(ActionOutcome::Skipped));
        }

        let started = Instant::now();
        let execution =
            tokio::time::timeout(self.ctx.action_timeout, self.spec.kind.execute(&self.ctx)).await;

        metrics::ACTION_DURATION_SECONDS
            .with_label_values(&[kind])
            .observe(started.elapsed().as_secs_f64());

        let Execution { population, result } = match execution {
            Ok(execution) => execution,
            Err(_) => {
                let e = TurmoilError::Timeout(self.ctx.action_timeout);
                warn!(kind, error = %e, "Chaos action failed, skipping tick");
                self.record_failure();
                return None;
            }
        };

        match result {
            Ok(strike) => {
                info!(kind, targets = ?strike.targets, killed = strike.killed.len(), "Chaos action executed");
                metrics::TARGETS_KILLED_TOTAL
                    .with_label_values(&[kind])
                    .inc_by(strike.killed.len() as u64);
                Some(self.record(ActionOutcome::Killed(strike.targets)))
            }
            Err(e) if e.is_benign() => {
                info!(kind, population, "No eligible targets this round");
                Some(self.record(ActionOutcome::NoTargets))
            }
            Err(e) => {
                warn!(kind, population, error = %e, "Chaos action failed, skipping tick");
                self.record_failure();
                None
            }
        }
    }

    fn record_failure(&self) {
        metrics::ACTION_OUTCOMES_TOTAL
            .with_label_values(&[self.spec.kind.label(), "failed"])
            .inc();
    }

    fn record(&self, outcome: ActionOutcome) -> ActionOutcome {
        metrics::ACTION_OUTCOMES_TOTAL
            .with_label_values(&[self.spec.kind.label(), outcome.label()])
            .inc();
        outcome
    }
}
