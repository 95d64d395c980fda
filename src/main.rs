//! vpn-paths-agent main entry point
//!
//! This binary runs the agent daemon and doubles as its command-line
//! client. Logs go to stderr; command results go to stdout.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vpn_paths_agent::{
    config::{Config, DEFAULT_CONFIG_PATH},
    control::{CommandHandler, ControlClient, ControlServer},
    vpn::Direction,
    VpnState, APP_NAME, VERSION,
};

/// Keep a list of VPN paths and toggle the VPN on and off
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version = VERSION, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Run commands in this process instead of asking the running agent
    #[arg(long, global = true)]
    local: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the agent daemon
    Serve,

    /// List registered VPN paths
    List,

    /// Register a VPN path
    Add {
        /// Path to register
        path: String,
    },

    /// Remove every registered VPN path
    Clear,

    /// Turn the VPN on
    On,

    /// Turn the VPN off
    Off,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize structured logging with tracing
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run the CLI command
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Version = cli.command {
        println!("{} v{}", APP_NAME, VERSION);
        return Ok(());
    }

    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Serve => serve(config).await,
        command if cli.local => {
            let handler = CommandHandler::from_config(&config)?;
            run_local(&handler, command).await
        }
        command => {
            let client = ControlClient::new(config.control.socket_path.clone());
            run_remote(&client, command).await
        }
    }
}

/// Run the agent until Ctrl+C or SIGTERM
async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Starting {} v{}", APP_NAME, VERSION);

    let handler = Arc::new(CommandHandler::from_config(&config)?);
    let server = Arc::new(ControlServer::from_config(&config.control, handler));

    let mut server_task = {
        let server = server.clone();
        tokio::spawn(async move { server.start().await })
    };

    let finished = tokio::select! {
        result = &mut server_task => Some(result),
        _ = shutdown_signal() => None,
    };

    // Lets any toggle that is already running finish first
    info!("Shutting down agent");
    server.shutdown().await?;

    let result = match finished {
        Some(result) => result,
        None => server_task.await,
    };
    result??;
    Ok(())
}

async fn run_local(handler: &CommandHandler, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::List => {
            for path in handler.get_vpn_paths().await? {
                println!("{}", path);
            }
        }
        Commands::Add { path } => {
            handler.add_vpn_path(path).await?;
            print_paths(handler.get_vpn_paths().await?.iter().map(|p| p.as_str()));
        }
        Commands::Clear => {
            handler.delete_vpn_paths().await?;
            println!("Cleared all VPN paths");
        }
        Commands::On => {
            println!("Turning VPN ON...");
            let (output, state) = handler.toggle(Direction::On).await?;
            print_toggle(output.as_str(), state);
        }
        Commands::Off => {
            println!("Turning VPN OFF...");
            let (output, state) = handler.toggle(Direction::Off).await?;
            print_toggle(output.as_str(), state);
        }
        Commands::Serve | Commands::Version => unreachable!("handled in run"),
    }
    Ok(())
}

async fn run_remote(client: &ControlClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::List => {
            for path in client.get_vpn_paths().await? {
                println!("{}", path);
            }
        }
        Commands::Add { path } => {
            client.add_vpn_path(path).await?;
            let paths = client.get_vpn_paths().await?;
            print_paths(paths.iter().map(String::as_str));
        }
        Commands::Clear => {
            client.delete_vpn_paths().await?;
            println!("Cleared all VPN paths");
        }
        Commands::On => {
            println!("Turning VPN ON...");
            let report = client.vpn_on().await?;
            print_toggle(report.output.as_str(), report.state);
        }
        Commands::Off => {
            println!("Turning VPN OFF...");
            let report = client.vpn_off().await?;
            print_toggle(report.output.as_str(), report.state);
        }
        Commands::Serve | Commands::Version => unreachable!("handled in run"),
    }
    Ok(())
}

fn print_paths<'a>(paths: impl Iterator<Item = &'a str>) {
    println!("Registered VPN paths:");
    for path in paths {
        println!("  {}", path);
    }
}

fn print_toggle(output: &str, state: VpnState) {
    print!("{}", output);
    if !output.is_empty() && !output.ends_with('\n') {
        println!();
    }
    println!("VPN is {}", state);
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
