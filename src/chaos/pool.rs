//! Pool-wide start/stop of the action timers.

use super::timer::ActionTimer;
use super::{ActionKind, ActionSpec, TurmoilContext};
use crate::metrics;
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runtime state of one running timer
struct TimerHandle {
    kind: ActionKind,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the configured specs and the currently running handle set
pub struct TimerPool {
    specs: Vec<ActionSpec>,
    ctx: Arc<TurmoilContext>,
    handles: Vec<TimerHandle>,
}

impl TimerPool {
    pub fn new(specs: Vec<ActionSpec>, ctx: Arc<TurmoilContext>) -> Self {
        Self {
            specs,
            ctx,
            handles: Vec::new(),
        }
    }

    /// Spawn one timer per eligible spec, each with a fresh cancellation token.
    ///
    /// Does nothing if timers are already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        for spec in &self.specs {
            if !spec.is_eligible() {
                info!(kind = spec.kind.label(), interval = ?spec.interval, "Action is inert, not starting timer");
                continue;
            }

            let cancel = CancellationToken::new();
            let timer = ActionTimer::new(*spec, self.ctx.clone());
            let task = tokio::spawn(timer.run(cancel.clone()));
            self.handles.push(TimerHandle {
                kind: spec.kind,
                cancel,
                task,
            });
        }

        metrics::RUNNING_TIMERS.set(self.handles.len() as i64);
        info!(timers = self.handles.len(), "Chaos timers started");
    }

    /// Cancel every running timer and wait for all of them to exit
    pub async fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        let handles = std::mem::take(&mut self.handles);
        for handle in &handles {
            handle.cancel.cancel();
        }

        let kinds: Vec<ActionKind> = handles.iter().map(|h| h.kind).collect();
        let results = join_all(handles.into_iter().map(|h| h.task)).await;
        for (kind, result) in kinds.iter().zip(results) {
            if let Err(e) = result {
                error!(kind = kind.label(), error = %e, "Action timer terminated abnormally");
            }
        }

        metrics::RUNNING_TIMERS.set(0);
        info!(timers = kinds.len(), "Chaos timers stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Kinds with a live timer, in spec order
    pub fn running_kinds(&self) -> Vec<ActionKind> {
        self.handles.iter().map(|h| h.kind).collect()
    }
}
