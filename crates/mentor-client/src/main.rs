mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use mentor_client::config::DEFAULT_CONFIG_FILE;

// ============================================================================
// CLI Types
// ============================================================================

/// Mentor - command-line client for the AI English Mentor API
#[derive(Parser, Debug)]
#[command(version = mentor_client::build_info::VERSION, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the endpoint candidates in the order they are tried
    Endpoints,

    /// Log in and store the session
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Clear the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// List practice sessions
    Sessions,

    /// Send a message and stream the reply
    Chat {
        /// Session ID to chat in
        #[arg(short, long)]
        session: String,

        /// Message text
        #[arg(value_name = "TEXT", required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List flashcards due for review
    Due,
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();
    debug!(version = %mentor_client::build_info::version_string(), "Starting");

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_str();

    match cli.command {
        Commands::Endpoints => commands::endpoints::run(config).await,
        Commands::Login { email, password } => {
            commands::auth::login(config, &email, password).await
        }
        Commands::Logout => commands::auth::logout(config).await,
        Commands::Whoami => commands::auth::whoami(config).await,
        Commands::Sessions => commands::sessions::run(config).await,
        Commands::Chat { session, text } => {
            commands::chat::run(config, &session, &text.join(" ")).await
        }
        Commands::Due => commands::due::run(config).await,
    }
}

// ============================================================================
// Initialization
// ============================================================================

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
