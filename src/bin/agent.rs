use std::path::PathBuf;

use anyhow::Context;
use atella::{
    agent::{Agent, AgentOptions},
    config::read_config_file,
    util::{get_config_path, get_secret, resolve_hostname},
};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Peer-to-peer host availability monitor")]
struct Args {
    /// Config file (defaults to $ATELLA_CONFIG or /etc/atella/atella.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Don't start the reporter
    #[arg(long)]
    without_reporter: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_targets(vec![
        ("atella", level),
        ("atella_agent", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::INFO)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(get_config_path()));
    let mut config = read_config_file(&path.to_string_lossy())?;

    if let Some(secret) = get_secret() {
        config.security = secret;
    }
    let hostname = resolve_hostname(config.hostname.as_deref())
        .context("can't determine hostname, set \"hostname\" in the config file")?;
    config.hostname = Some(hostname.clone());

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        parse_level(&config.log_level)
    };
    init(level);
    trace!("started with args: {args:?}");
    info!("atella {} starting on {hostname}", atella::VERSION);

    if config.security.is_empty() {
        warn!("no shared secret configured, pushes will be sent unauthenticated");
    }

    let stop = CancellationToken::new();
    let options = AgentOptions {
        without_reporter: args.without_reporter,
    };
    let agent = Agent::start(config, &hostname, options, stop.clone()).await?;

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                stop.cancel();
            }
            Err(e) => error!("can't listen for interrupt: {e}"),
        }
    });

    agent.wait().await;
    Ok(())
}
