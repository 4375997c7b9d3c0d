use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ember_limiter::config::{LimiterConfig, LoggingConfig};
use ember_limiter::LimiterStore;

#[derive(Parser, Debug)]
#[command(name = "ember-limiter")]
#[command(about = "Inspect and exercise the in-memory request limiter", version)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a burst of checks for one identifier and print each decision
    Simulate {
        /// Named policy to apply
        #[arg(short, long, default_value = "api")]
        policy: String,

        /// Identifier being limited, e.g. ip:1.2.3.4
        #[arg(short, long)]
        identifier: String,

        /// Number of checks to run
        #[arg(short = 'n', long, default_value_t = 10)]
        requests: u32,

        /// Pause between checks in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
    /// List the configured named policies
    Policies,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = LimiterConfig::load(args.config.as_deref())?;
    init_tracing(&config.logging);

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Simulate {
            policy,
            identifier,
            requests,
            interval_ms,
        } => simulate(&config, &policy, &identifier, requests, interval_ms).await,
        Command::Policies => {
            for (name, policy) in config.policy_set()?.iter() {
                println!(
                    "{}\t{} per {}s",
                    name,
                    policy.max_requests(),
                    policy.window().as_secs()
                );
            }
            Ok(())
        }
    }
}

async fn simulate(
    config: &LimiterConfig,
    policy_name: &str,
    identifier: &str,
    requests: u32,
    interval_ms: u64,
) -> anyhow::Result<()> {
    let policy = config.policy_set()?.get(policy_name)?;
    let store = Arc::new(LimiterStore::new());
    let sweeper = store.start_sweeper(config.sweep.interval())?;

    info!(
        policy = %policy_name,
        identifier = %identifier,
        requests = requests,
        "Starting simulation"
    );

    let mut denied = 0u32;
    for _ in 0..requests {
        let decision = store.check(identifier, &policy)?;
        if decision.is_denied() {
            denied += 1;
        }
        println!("{}", serde_json::to_string(&decision.headers())?);

        if interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    }

    if denied > 0 {
        warn!(denied = denied, "Some requests were rate limited");
    }

    sweeper.stop().await;
    info!("Simulation finished");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
