//! Daily window scheduling
//!
//! Time-of-day arithmetic, the chaos window, and the control loop that
//! starts and stops the timer pool at each window boundary.

pub mod scheduler;
pub mod time;
pub mod window;

pub use scheduler::WindowScheduler;
pub use time::{Clock, SystemClock, TimeOfDay};
pub use window::{Alignment, Window};
