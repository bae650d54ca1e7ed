//! Disruptive action kinds and their per-kind configuration.

use super::TurmoilContext;
use crate::error::{Result, TurmoilError};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Shortest tick a timer may run at; slower-than-this specs are inert
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// What a timer does when its probability roll succeeds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionKind {
    /// Kill one random task
    KillTask,
    /// Kill every task of one random application
    KillApp,
    /// Kill `floor(len * fraction)` random tasks in one request
    KillFraction { fraction: f64 },
    /// Kill every task scheduled on one random host
    KillHost,
}

impl ActionKind {
    /// Stable name used in logs and metric labels
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::KillTask => "kill_task",
            ActionKind::KillApp => "kill_app",
            ActionKind::KillFraction { .. } => "kill_fraction",
            ActionKind::KillHost => "kill_host",
        }
    }

    /// Fetch fresh candidates, pick victims, and kill them.
    ///
    /// The candidate count is reported alongside the result so failures can
    /// be logged against the population they were drawn from.
    pub async fn execute(&self, ctx: &TurmoilContext) -> Execution {
        let candidates = match self.candidates(ctx).await {
            Ok(candidates) => candidates,
            Err(e) => {
                return Execution {
                    population: 0,
                    result: Err(e),
                }
            }
        };

        Execution {
            population: candidates.len(),
            result: self.strike(ctx, &candidates).await,
        }
    }

    /// Unprotected tasks or applications, or every active host
    async fn candidates(&self, ctx: &TurmoilContext) -> Result<Vec<String>> {
        match self {
            ActionKind::KillTask | ActionKind::KillFraction { .. } => {
                Ok(ctx.blacklist.filter(&ctx.client.list_tasks().await?))
            }
            ActionKind::KillApp => Ok(ctx.blacklist.filter(&ctx.client.list_applications().await?)),
            ActionKind::KillHost => ctx.client.list_hosts().await,
        }
    }

    async fn strike(&self, ctx: &TurmoilContext, candidates: &[String]) -> Result<Strike> {
        match *self {
            ActionKind::KillTask => {
                let victim = ctx.selector.pick_one(candidates)?;
                ctx.client.kill_task(&victim).await?;
                Ok(Strike::direct(vec![victim]))
            }
            ActionKind::KillApp => {
                let victim = ctx.selector.pick_one(candidates)?;
                ctx.client.kill_application_tasks(&victim).await?;
                Ok(Strike::direct(vec![victim]))
            }
            ActionKind::KillFraction { fraction } => {
                let victims = ctx.selector.pick_fraction(candidates, fraction);
                if victims.is_empty() {
                    return Err(TurmoilError::EmptyPopulation);
                }
                ctx.client.kill_tasks(&victims).await?;
                Ok(Strike::direct(victims))
            }
            ActionKind::KillHost => {
                let host = ctx.selector.pick_one(candidates)?;
                let tasks = ctx.blacklist.filter(&ctx.client.tasks_on_host(&host).await?);
                if tasks.is_empty() {
                    debug!(host = %host, "No unprotected tasks on host");
                    return Err(TurmoilError::EmptyPopulation);
                }
                ctx.client.kill_tasks(&tasks).await?;
                Ok(Strike {
                    targets: vec![host],
                    killed: tasks,
                })
            }
        }
    }

    /// The kill fraction, for fractional kills
    pub fn fraction(&self) -> Option<f64> {
        match self {
            ActionKind::KillFraction { fraction } => Some(*fraction),
            _ => None,
        }
    }
}

/// What one successful execution hit
#[derive(Debug, Clone, PartialEq)]
pub struct Strike {
    /// The selected victims: task ids, an application id, or a hostname
    pub targets: Vec<String>,
    /// Ids named in kill requests: task ids, or the application id
    pub killed: Vec<String>,
}

impl Strike {
    fn direct(ids: Vec<String>) -> Self {
        Self {
            targets: ids.clone(),
            killed: ids,
        }
    }
}

/// Result of [`ActionKind::execute`] with the size of the candidate list
#[derive(Debug)]
pub struct Execution {
    pub population: usize,
    pub result: Result<Strike>,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of a single timer tick
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Probability roll failed
    Skipped,
    /// Nothing left to select after filtering
    NoTargets,
    /// These identifiers were affected
    Killed(Vec<String>),
}

impl ActionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ActionOutcome::Skipped => "skipped",
            ActionOutcome::NoTargets => "no_targets",
            ActionOutcome::Killed(_) => "killed",
        }
    }
}

/// Configuration of one action timer, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionSpec {
    pub kind: ActionKind,
    pub interval: Duration,
    pub probability: f64,
}

impl ActionSpec {
    pub fn new(kind: ActionKind, interval: Duration, probability: f64) -> Self {
        Self {
            kind,
            interval,
            probability,
        }
    }

    /// Build from a frequency expressed as hours between attempts.
    ///
    /// Non-finite or negative frequencies produce a zero interval, which
    /// leaves the spec inert.
    pub fn from_hours(kind: ActionKind, hours: f64, probability: f64) -> Self {
        let interval = Duration::try_from_secs_f64(hours * 3600.0).unwrap_or(Duration::ZERO);
        Self::new(kind, interval, probability)
    }

    /// Whether the interval is wide enough for a timer to run
    pub fn is_eligible(&self) -> bool {
        self.interval >= MIN_INTERVAL
    }
}

impl fmt::Display for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} every {:?} with probability {}",
            self.kind, self.interval, self.probability
        )?;
        if let Some(fraction) = self.kind.fraction() {
            write!(f, ", fraction {}", fraction)?;
        }
        Ok(())
    }
}
