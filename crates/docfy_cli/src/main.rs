//! Docfy CLI
//!
//! Runs and operates the Docfy back office.
//!
//! # Commands
//!
//! - `serve` - Start the reconciliation watcher until interrupted
//! - `sync` - Run one reconciliation
//! - `auth-url` - Print the Google consent URL
//! - `register` - Redeem an authorization code and register the box
//! - `boxes` - List registered contact boxes
//! - `link` - Link stored contacts to records already in a box
//! - `contacts` - List local contacts
//! - `add-user` - Create an API user

mod app;
mod commands;
mod settings;

use clap::{Parser, Subcommand};
use settings::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Docfy back-office tools.
#[derive(Parser)]
#[command(name = "docfy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the settings file (default: docfy.toml)
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the watcher and run until Ctrl-C
    Serve,

    /// Run one reconciliation and print the outcome
    Sync,

    /// Print the Google consent URL
    AuthUrl,

    /// Complete the consent flow and register the contact box
    Register {
        /// Authorization code from the consent redirect
        #[arg(long)]
        code: String,
    },

    /// List registered contact boxes
    Boxes {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Link stored contacts to records already in a box
    Link {
        /// Email of the registered box
        #[arg(long = "box")]
        box_email: String,
    },

    /// List local contacts
    Contacts {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create an API user
    AddUser {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// Show version information
    Version,
}

fn init_logging(verbose: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("Docfy CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(cli.verbose, &settings.logging.level);
    let server = app::build(&settings)?;

    match cli.command {
        Commands::Serve => commands::serve::run(&server).await?,
        Commands::Sync => commands::sync::run(&server).await?,
        Commands::AuthUrl => commands::auth::url(&server),
        Commands::Register { code } => commands::auth::register(&server, &code).await?,
        Commands::Boxes { format } => commands::boxes::run(&server, &format).await?,
        Commands::Link { box_email } => commands::link::run(&server, &box_email).await?,
        Commands::Contacts { format } => commands::contacts::run(&server, &format).await?,
        Commands::AddUser { username, password } => {
            commands::users::add(&server, &username, &password).await?
        }
        Commands::Version => {}
    }

    Ok(())
}
