//! CLI for LiteMsg
//!
//! Subcommands:
//! - `server`: run the TCP broker
//! - `client`: run the interactive console client

use clap::{Args, Parser};
use litemsg::broker::Broker;
use litemsg::config::{Settings, load_config};
use litemsg::transport::start_tcp_server;
use litemsg::utils::{BrokerError, logging};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "litemsg", about = "A small topic-based pub/sub broker")]
enum Command {
    /// Start the broker
    Server(ServerArgs),
    /// Connect an interactive console to a running broker
    Client(ClientArgs),
}

#[derive(Args)]
struct ServerArgs {
    /// Listen address (host:port); overrides configuration
    #[arg(long)]
    addr: Option<String>,
    /// Require clients to authenticate before subscribing or publishing
    #[arg(long)]
    auth: bool,
    /// Username for authentication
    #[arg(long)]
    user: Option<String>,
    /// Password for authentication
    #[arg(long)]
    pass: Option<String>,
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Args)]
struct ClientArgs {
    /// Broker address to connect to
    #[arg(long, default_value = "localhost:8083")]
    addr: String,
    /// Credentials to send first, as "username:password"
    #[arg(long)]
    auth: Option<String>,
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let result = match Command::parse() {
        Command::Server(args) => {
            logging::init(&args.log_level);
            run_server(args).await
        }
        Command::Client(args) => {
            logging::init(&args.log_level);
            litemsg::console::run(&args.addr, args.auth).await
        }
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run_server(args: ServerArgs) -> Result<(), BrokerError> {
    let mut settings = load_config()?;
    apply_overrides(&mut settings, args)?;

    let broker = Broker::new().shared();

    tokio::select! {
        result = start_tcp_server(&settings, broker) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting.");
            Ok(())
        }
    }
}

fn apply_overrides(settings: &mut Settings, args: ServerArgs) -> Result<(), BrokerError> {
    if let Some(addr) = args.addr {
        settings.set_listen_addr(&addr)?;
    }
    if args.auth {
        settings.auth.enabled = true;
    }
    if let Some(user) = args.user {
        settings.auth.username = user;
    }
    if let Some(pass) = args.pass {
        settings.auth.password = pass;
    }
    Ok(())
}
