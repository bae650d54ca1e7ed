//! Chaos Actions
//!
//! Everything that runs while the window is open:
//! - `blacklist`: protected-name filtering of candidate lists
//! - `selector`: unbiased single and fractional sampling
//! - `action`: the four disruptive action kinds
//! - `timer`: one cancellable periodic timer per action kind
//! - `pool`: start/stop of the whole timer set

pub mod action;
pub mod blacklist;
pub mod pool;
pub mod selector;
pub mod timer;

pub use action::{ActionKind, ActionOutcome, ActionSpec};
pub use blacklist::Blacklist;
pub use pool::TimerPool;
pub use selector::TargetSelector;

use crate::cluster::ClusterClient;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single action invocation
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared, read-only state handed to every timer.
///
/// Built once at startup and passed down by `Arc`.
pub struct TurmoilContext {
    pub client: Arc<dyn ClusterClient>,
    pub blacklist: Blacklist,
    pub selector: TargetSelector,
    pub action_timeout: Duration,
}

impl TurmoilContext {
    pub fn new(client: Arc<dyn ClusterClient>, blacklist: Blacklist) -> Self {
        Self {
            client,
            blacklist,
            selector: TargetSelector::new(),
            action_timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    pub fn with_selector(mut self, selector: TargetSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }
}
