// Turmoil - Main Entry Point
//
// Loads configuration, wires the Marathon client into the timer pool, and
// runs the window scheduler until interrupted.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use turmoil::chaos::{TimerPool, TurmoilContext};
use turmoil::cluster::{ClusterClient, DryRunClient, MarathonClient};
use turmoil::config::{Config, ConfigSource};
use turmoil::schedule::WindowScheduler;
use turmoil::{logging, metrics_server};

/// Turmoil: window-gated chaos for Marathon/Mesos
#[derive(Parser, Debug)]
#[command(name = "turmoil")]
#[command(version)]
#[command(about = "Randomly kill Marathon tasks, apps, and hosts during a daily window", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "TURMOIL_CONFIG")]
    config: Option<PathBuf>,

    /// Window start time (HH:MM)
    #[arg(long, global = true)]
    start: Option<String>,

    /// Window stop time (HH:MM)
    #[arg(long, global = true)]
    stop: Option<String>,

    /// Comma-separated application names never to target
    #[arg(long, global = true)]
    blacklist: Option<String>,

    /// Marathon API endpoint
    #[arg(long, global = true)]
    marathon_url: Option<String>,

    /// Hours between kill-task attempts
    #[arg(long, global = true)]
    task_frequency: Option<f64>,

    /// Chance a kill-task attempt fires (0-1)
    #[arg(long, global = true)]
    task_probability: Option<f64>,

    /// Hours between kill-app attempts
    #[arg(long, global = true)]
    app_frequency: Option<f64>,

    /// Chance a kill-app attempt fires (0-1)
    #[arg(long, global = true)]
    app_probability: Option<f64>,

    /// Hours between kill-fraction attempts
    #[arg(long, global = true)]
    fraction_frequency: Option<f64>,

    /// Chance a kill-fraction attempt fires (0-1)
    #[arg(long, global = true)]
    fraction_probability: Option<f64>,

    /// Share of unprotected tasks killed by a kill-fraction attempt (0-1)
    #[arg(long, global = true)]
    fraction: Option<f64>,

    /// Hours between kill-host attempts
    #[arg(long, global = true)]
    host_frequency: Option<f64>,

    /// Chance a kill-host attempt fires (0-1)
    #[arg(long, global = true)]
    host_probability: Option<f64>,

    /// Log kills instead of performing them
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the chaos scheduler (default)
    Run,
    /// Print the effective configuration and exit
    CheckConfig,
}

impl Args {
    fn apply_to(&self, config: &mut Config) {
        if let Some(start) = &self.start {
            config.window.start = start.clone();
        }
        if let Some(stop) = &self.stop {
            config.window.stop = stop.clone();
        }
        if let Some(names) = &self.blacklist {
            config.set_blacklist(names);
        }
        if let Some(url) = &self.marathon_url {
            config.cluster.marathon_url = url.clone();
        }

        let actions = &mut config.actions;
        let overrides = [
            (self.task_frequency, &mut actions.task.frequency),
            (self.task_probability, &mut actions.task.probability),
            (self.app_frequency, &mut actions.app.frequency),
            (self.app_probability, &mut actions.app.probability),
            (self.fraction_frequency, &mut actions.fraction.frequency),
            (self.fraction_probability, &mut actions.fraction.probability),
            (self.fraction, &mut actions.fraction.fraction),
            (self.host_frequency, &mut actions.host.frequency),
            (self.host_probability, &mut actions.host.probability),
        ];
        for (flag, field) in overrides {
            if let Some(value) = flag {
                *field = value;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) = Config::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate().context("Configuration rejected")?;

    match args.command {
        Some(Commands::CheckConfig) => {
            let text = toml::to_string_pretty(&config)
                .context("Failed to serialize configuration")?;
            println!("# source: {}", source);
            print!("{}", text);
            Ok(())
        }
        Some(Commands::Run) | None => {
            logging::init(&config.logging, args.verbose)?;
            run(config, source, args.dry_run).await
        }
    }
}

async fn run(config: Config, source: ConfigSource, dry_run: bool) -> Result<()> {
    info!("Turmoil v{} starting", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::Defaults => info!("Using {}", source),
        ConfigSource::File(_) => info!("Loaded configuration from {}", source),
    }

    let window = config.window()?;
    let blacklist = config.blacklist();
    info!(blacklist = ?blacklist.names(), marathon = %config.cluster.marathon_url, "Cluster settings");
    for spec in config.action_specs() {
        info!(
            kind = spec.kind.label(),
            interval = ?spec.interval,
            probability = spec.probability,
            fraction = spec.kind.fraction(),
            "Kill settings: {}",
            spec
        );
    }

    let marathon = MarathonClient::new(&config.cluster.marathon_url, config.request_timeout())
        .context("Failed to create Marathon client")?
        .with_mesos_url(config.cluster.mesos_url.clone());
    let client: Arc<dyn ClusterClient> = if dry_run {
        info!("Dry run enabled, no kills will be sent");
        Arc::new(DryRunClient::new(Arc::new(marathon)))
    } else {
        Arc::new(marathon)
    };

    if config.metrics.enabled {
        let port = config.metrics.port;
        tokio::spawn(async move {
            if let Err(e) = metrics_server::start_metrics_server(port).await {
                error!("Metrics server failed: {:#}", e);
            }
        });
    }

    let ctx = TurmoilContext::new(client, blacklist).with_action_timeout(config.action_timeout());
    let pool = TimerPool::new(config.action_specs(), Arc::new(ctx));
    let scheduler = WindowScheduler::new(window, pool);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                signal.cancel();
            }
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
    });

    scheduler.run(shutdown).await;
    Ok(())
}
