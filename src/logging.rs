//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level; `--verbose` raises
//! the default to DEBUG.

use crate::config::LoggingConfig;
use anyhow::Result;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset
pub fn default_level(config: &LoggingConfig, verbose: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    config.level.to_lowercase().parse().unwrap_or(Level::INFO)
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global subscriber in the configured format
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = env_filter(default_level(config, verbose));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.format.to_lowercase().as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing::{debug, info, warn};

    /// Writer that collects output in memory
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    #[test]
    fn test_default_level() {
        let mut config = LoggingConfig::default();
        assert_eq!(default_level(&config, false), Level::INFO);
        assert_eq!(default_level(&config, true), Level::DEBUG);

        config.level = "WARN".to_string();
        assert_eq!(default_level(&config, false), Level::WARN);

        config.level = "bogus".to_string();
        assert_eq!(default_level(&config, false), Level::INFO);
    }

    #[test]
    fn test_level_filtering() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            debug!("hidden detail");
            info!(kind = "kill_task", "Chaos action executed");
        });

        let text = capture.text();
        assert!(text.contains("Chaos action executed"));
        assert!(text.contains("kind=\"kill_task\""));
        assert!(!text.contains('\u{1b}'));
        assert!(!text.contains("hidden detail"));
    }

    #[test]
    fn test_json_output_is_parseable() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            warn!(kind = "kill_app", population = 3, "Chaos action failed, skipping tick");
        });

        let text = capture.text();
        let line = text.lines().next().unwrap();
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["fields"]["kind"], "kill_app");
        assert_eq!(value["fields"]["population"], 3);
        assert_eq!(value["level"], "WARN");
    }
}
