//! Window-aware control loop that opens and closes the timer pool each day.

use super::time::{Clock, SystemClock, TimeOfDay};
use super::window::{Alignment, Window};
use crate::chaos::TimerPool;
use crate::metrics;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Keeps the timer pool running exactly while the window is open.
///
/// Every sleep is recomputed from the live clock when it is scheduled, so
/// drift between iterations does not accumulate.
pub struct WindowScheduler<C: Clock = SystemClock> {
    window: Window,
    pool: TimerPool,
    clock: C,
}

impl WindowScheduler<SystemClock> {
    pub fn new(window: Window, pool: TimerPool) -> Self {
        Self::with_clock(window, pool, SystemClock)
    }
}

impl<C: Clock> WindowScheduler<C> {
    pub fn with_clock(window: Window, pool: TimerPool, clock: C) -> Self {
        Self {
            window,
            pool,
            clock,
        }
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn pool(&self) -> &TimerPool {
        &self.pool
    }

    /// Align to the current phase of the window.
    ///
    /// Starts the pool, waiting for the window to open first if needed, then
    /// sleeps until the next stop boundary. Returns `false` if `shutdown`
    /// fired while waiting.
    pub async fn stabilize(&mut self, shutdown: &CancellationToken) -> bool {
        if self.window.is_overnight() {
            info!(window = %self.window, open_for = ?self.window.length(), "Run overnight");
        } else {
            info!(window = %self.window, open_for = ?self.window.length(), "Run daily");
        }

        if let Alignment::Closed { open_in } = self.window.align(self.clock.now()) {
            info!(start = %self.window.start(), wait = ?open_in, "Waiting until {} to start", self.window.start());
            if !sleep_or_shutdown(open_in, shutdown).await {
                return false;
            }
        }

        self.open();
        self.sleep_until(self.window.stop(), shutdown).await
    }

    /// Run forever: align, then alternate stop and start at each boundary.
    ///
    /// The pool is always stopped and drained before the next start. Exits
    /// only when `shutdown` is cancelled, stopping any running timers.
    pub async fn run(mut self, shutdown: CancellationToken) {
        if self.stabilize(&shutdown).await {
            loop {
                self.close().await;
                if !self.sleep_until(self.window.start(), &shutdown).await {
                    break;
                }
                self.open();
                if !self.sleep_until(self.window.stop(), &shutdown).await {
                    break;
                }
            }
        }

        self.close().await;
        info!("Scheduler shut down");
    }

    fn open(&mut self) {
        info!(stop = %self.window.stop(), "Window open, starting chaos timers");
        self.pool.start();
        metrics::WINDOW_OPEN.set(1);
    }

    async fn close(&mut self) {
        if self.pool.is_running() {
            info!(start = %self.window.start(), "Window closed, stopping chaos timers");
        }
        self.pool.stop().await;
        metrics::WINDOW_OPEN.set(0);
    }

    async fn sleep_until(&self, target: TimeOfDay, shutdown: &CancellationToken) -> bool {
        sleep_or_shutdown(self.clock.now().until(target), shutdown).await
    }
}

/// Sleep for `duration`; `false` means shutdown won the race
async fn sleep_or_shutdown(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chaos::testing::MockCluster;
    use crate::chaos::{ActionKind, ActionSpec, Blacklist, TargetSelector, TurmoilContext};
    use crate::schedule::time::{SimulatedClock, DAY};
    use std::sync::Arc;

    fn tod(s: &str) -> TimeOfDay {
        TimeOfDay::parse(s).unwrap()
    }

    fn hours(h: u64) -> Duration {
        Duration::from_secs(h * 3600)
    }

    fn scheduler(
        window: &str,
        now: &str,
        interval: Duration,
    ) -> (Arc<MockCluster>, WindowScheduler<SimulatedClock>) {
        let (start, stop) = window.split_once('-').unwrap();
        let cluster = Arc::new(MockCluster::with_tasks(&["web.a1", "api.b2"]));
        let ctx = TurmoilContext::new(cluster.clone(), Blacklist::default())
            .with_selector(TargetSelector::with_seed(42));
        let pool = TimerPool::new(
            vec![ActionSpec::new(ActionKind::KillTask, interval, 1.0)],
            Arc::new(ctx),
        );
        let scheduler = WindowScheduler::with_clock(
            Window::parse(start, stop).unwrap(),
            pool,
            SimulatedClock::starting_at(tod(now)),
        );
        (cluster, scheduler)
    }

    #[tokio::test(start_paused = true)]
    async fn test_overnight_inside_window_starts_immediately() {
        let (cluster, mut scheduler) = scheduler("22:00-06:00", "23:00", hours(1));
        let shutdown = CancellationToken::new();
        let begin = tokio::time::Instant::now();

        assert!(scheduler.stabilize(&shutdown).await);

        // Slept until 06:00 with timers running the whole time
        assert_eq!(begin.elapsed(), hours(7));
        assert!(scheduler.pool().is_running());
        let first = cluster.kill_times()[0];
        assert_eq!(first - begin, hours(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overnight_outside_window_waits_for_start() {
        let (cluster, mut scheduler) = scheduler("22:00-06:00", "10:00", hours(1));
        let shutdown = CancellationToken::new();
        let begin = tokio::time::Instant::now();

        assert!(scheduler.stabilize(&shutdown).await);

        // 12h until 22:00, then 8h open
        assert_eq!(begin.elapsed(), hours(20));
        let first = cluster.kill_times()[0];
        assert_eq!(first - begin, hours(13));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_day_inside_window() {
        let (_, mut scheduler) = scheduler("10:00-16:00", "12:00", hours(1));
        let shutdown = CancellationToken::new();
        let begin = tokio::time::Instant::now();

        assert!(scheduler.stabilize(&shutdown).await);
        assert_eq!(begin.elapsed(), hours(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_day_after_window_waits_for_tomorrow() {
        let (cluster, mut scheduler) = scheduler("10:00-16:00", "18:00", hours(1));
        let shutdown = CancellationToken::new();
        let begin = tokio::time::Instant::now();

        assert!(scheduler.stabilize(&shutdown).await);

        // 16h until 10:00 next day, then 6h open
        assert_eq!(begin.elapsed(), hours(22));
        assert_eq!(cluster.kill_times()[0] - begin, hours(17));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_waiting() {
        let (cluster, scheduler) = scheduler("10:00-16:00", "18:00", hours(1));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(scheduler.run(shutdown.clone()));
        tokio::time::sleep(hours(2)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(cluster.kills().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_running_timers() {
        let (cluster, scheduler) = scheduler("10:00-16:00", "11:00", Duration::from_secs(600));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(scheduler.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_secs(1900)).await;
        shutdown.cancel();
        handle.await.unwrap();
        assert_eq!(cluster.kills().len(), 3);

        tokio::time::sleep(hours(48)).await;
        assert_eq!(cluster.kills().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_kills_outside_window_across_many_days() {
        // 500 days of an overnight window is 1000 boundary crossings
        let (cluster, scheduler) = scheduler("22:00-06:00", "03:00", Duration::from_secs(25 * 60));
        let window = scheduler.window();
        let shutdown = CancellationToken::new();
        let begin = tokio::time::Instant::now();

        let handle = tokio::spawn(scheduler.run(shutdown.clone()));
        tokio::time::sleep(DAY * 500).await;
        shutdown.cancel();
        handle.await.unwrap();

        let times = cluster.kill_times();
        // 3h on the first night, then 8h per night
        assert!(times.len() > 500 * 18);
        for t in times {
            let at = TimeOfDay::from_duration(tod("03:00").as_duration() + (t - begin));
            assert!(window.contains(at), "kill at {} outside {}", at, window);
        }
    }
}
