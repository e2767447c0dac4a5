//! jobnode CLI

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use jobnode_core::SessionGuard;
use jobnode_node::job_source::load_job_definition;
use jobnode_node::market_client::list_markets;
use jobnode_node::{fetch_market, parse_port, serve, HttpMarketClient, NodeConfig, NodeError};

/// jobnode - run and inspect job nodes
#[derive(Parser)]
#[command(name = "jobnode")]
#[command(about = "Job node process and tooling", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Job commands
    #[command(subcommand)]
    Job(JobCommand),

    /// Market commands
    #[command(subcommand)]
    Market(MarketCommand),
}

#[derive(Subcommand)]
enum JobCommand {
    /// Run a node session
    Serve {
        /// Path to the node config file
        #[arg(short, long)]
        config: PathBuf,

        /// Port to listen on
        #[arg(short, long)]
        port: String,
    },

    /// Validate a job definition
    Validate {
        /// File path or URL of the job definition
        location: String,
    },
}

#[derive(Subcommand)]
enum MarketCommand {
    /// Show a market
    Get {
        /// Market address
        address: String,

        #[command(flatten)]
        source: MarketApiArgs,
    },

    /// List markets
    List {
        #[command(flatten)]
        source: MarketApiArgs,
    },
}

#[derive(Args)]
struct MarketApiArgs {
    /// Market API base URL, overrides the config file
    #[arg(long)]
    api: Option<String>,

    /// Node config file to take `market_api` from
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl MarketApiArgs {
    fn client(self) -> Result<HttpMarketClient, NodeError> {
        let api = NodeConfig::market_api_for(self.api, self.config.as_deref())?;
        Ok(HttpMarketClient::new(&api))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    // One guard per process: every session started here claims its address in it.
    let sessions = Arc::new(SessionGuard::new());

    let result = match cli.command {
        Commands::Job(JobCommand::Serve { config, port }) => {
            run_serve(config, &port, sessions).await
        }
        Commands::Job(JobCommand::Validate { location }) => validate(&location).await,
        Commands::Market(MarketCommand::Get { address, source }) => market_get(&address, source).await,
        Commands::Market(MarketCommand::List { source }) => market_list(source).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

async fn run_serve(
    config_path: PathBuf,
    port: &str,
    sessions: Arc<SessionGuard>,
) -> Result<(), NodeError> {
    // Reject the port before touching any session state.
    let port = parse_port(port)?;
    let config = NodeConfig::from_file(&config_path)?;
    info!(address = %config.address, port, "starting node");
    serve(config, port, sessions).await
}

async fn validate(location: &str) -> Result<(), NodeError> {
    let job = load_job_definition(location).await?;
    match job.validate() {
        Ok(()) => {
            println!("Job definition is valid ({} operations)", job.ops.len());
            Ok(())
        }
        Err(issues) => {
            println!("Job definition has {} issue(s):", issues.len());
            for issue in &issues {
                println!("  - {issue}");
            }
            Err(NodeError::JobSource {
                location: location.to_string(),
                reason: "validation failed".to_string(),
            })
        }
    }
}

async fn market_get(address: &str, source: MarketApiArgs) -> Result<(), NodeError> {
    let client = source.client()?;
    let market = fetch_market(&client, address).await?;
    print_json(&market)
}

async fn market_list(source: MarketApiArgs) -> Result<(), NodeError> {
    let client = source.client()?;
    let markets = list_markets(&client).await?;
    if markets.is_empty() {
        println!("No markets found");
        return Ok(());
    }
    for market in &markets {
        println!(
            "{}  price={}  timeout={}s  queue={}",
            market.address,
            market.job_price,
            market.job_timeout,
            market.queue_len()
        );
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), NodeError> {
    let text = serde_json::to_string_pretty(value).map_err(jobnode_core::CoreError::from)?;
    println!("{text}");
    Ok(())
}
