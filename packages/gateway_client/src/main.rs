use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

use gateway_client::config::{ClientPaths, ClientSettings, FileConfig, load_config};

mod cli;

#[derive(Parser)]
#[command(name = "gwchat")]
#[command(about = "Terminal chat client for the gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Custom data directory (defaults to ~/.gwchat)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Gateway WebSocket URL, e.g. ws://127.0.0.1:3888/ws
    #[arg(long, global = true)]
    url: Option<String>,

    /// Access token for this run (overrides config and the saved token)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent (default)
    Chat,

    /// Show gateway status
    Status,

    /// List, select or activate LLM providers
    Providers(ProvidersArgs),

    /// Save an access token for later runs
    Login(LoginArgs),

    /// Remove the saved access token
    Logout,

    /// Forget the current session so the next chat starts fresh
    Forget,
}

#[derive(Parser)]
struct ProvidersArgs {
    #[command(subcommand)]
    action: Option<ProvidersAction>,
}

#[derive(Subcommand)]
enum ProvidersAction {
    /// List providers known to the gateway (default)
    List,

    /// Use a provider for chat messages (no id: gateway default)
    Select { id: Option<String> },

    /// Activate a provider on the gateway
    Activate {
        id: String,

        /// API key for providers that need one
        #[arg(long)]
        api_key: Option<String>,

        /// Also make it the gateway's default provider
        #[arg(long)]
        default: bool,
    },
}

#[derive(Parser)]
struct LoginArgs {
    token: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = ClientPaths::new(cli.data_dir.clone())?;

    // The chat screen owns the terminal, so its logs go to a file
    let chatting = matches!(cli.command, None | Some(Commands::Chat));
    init_logging(cli.debug, chatting.then(|| paths.chat_log_path()))?;

    let mut fc: FileConfig = load_config(&paths.data_dir)
        .extract()
        .context("Failed to load configuration")?;
    if let Some(url) = cli.url {
        fc.gateway.url = url;
    }
    let settings = ClientSettings::from_file(&fc)?;
    let store = paths.open_state()?;
    let token = settings.resolve_token(cli.token, &store);

    match cli.command {
        None | Some(Commands::Chat) => cli::chat::chat_command(&settings, store, token).await,
        Some(Commands::Status) => cli::status_command(&settings, token).await,
        Some(Commands::Providers(args)) => match args.action.unwrap_or(ProvidersAction::List) {
            ProvidersAction::List => cli::providers::list_command(&settings, token, &store).await,
            ProvidersAction::Select { id } => cli::providers::select_command(&store, id),
            ProvidersAction::Activate {
                id,
                api_key,
                default,
            } => cli::providers::activate_command(&settings, token, id, api_key, default).await,
        },
        Some(Commands::Login(args)) => cli::login_command(&store, &args.token),
        Some(Commands::Logout) => cli::logout_command(&store),
        Some(Commands::Forget) => cli::forget_command(&store),
    }
}

fn init_logging(debug: bool, log_file: Option<PathBuf>) -> Result<()> {
    let default_directive = if debug {
        "gwchat=debug,gateway_client=debug,info"
    } else {
        "gwchat=info,gateway_client=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file: {:?}", path))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}
