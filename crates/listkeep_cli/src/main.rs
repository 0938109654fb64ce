//! ListKeep CLI
//!
//! Command-line backup and restore for ListKeep data.
//!
//! # Commands
//!
//! - `profile` - Show or set the local user profile
//! - `inspect` - Display local lists and item counts
//! - `gist` - Authenticate, back up to or restore from a private Gist
//! - `cloud` - Back up to or restore from the cloud key-value store

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ListKeep backup and restore tools.
#[derive(Parser)]
#[command(name = "listkeep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding local ListKeep data
    #[arg(global = true, short, long, env = "LISTKEEP_DATA_DIR", default_value = "listkeep-data")]
    data_dir: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or set the local user profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Display local lists, deleted lists and item counts
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Back up to or restore from a private Gist
    Gist {
        /// Personal access token
        #[arg(long, env = "LISTKEEP_GITHUB_TOKEN", hide_env_values = true)]
        token: String,

        #[command(subcommand)]
        action: GistAction,
    },

    /// Back up to or restore from the cloud key-value store
    Cloud {
        /// Directory shared with other devices
        #[arg(long, env = "LISTKEEP_CLOUD_DIR")]
        cloud_dir: Option<PathBuf>,

        /// Account identity on this device; the store is unavailable without one
        #[arg(long, env = "LISTKEEP_CLOUD_IDENTITY")]
        identity: Option<String>,

        #[command(subcommand)]
        action: CloudAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the stored profile
    Show,

    /// Store a profile
    Set {
        /// Given name
        #[arg(long)]
        first: String,

        /// Family name
        #[arg(long)]
        last: String,

        /// User id (an email address)
        #[arg(long)]
        id: String,

        /// Sign-in credential
        #[arg(long, env = "LISTKEEP_CREDENTIAL", hide_env_values = true)]
        credential: String,
    },
}

#[derive(Subcommand)]
enum GistAction {
    /// Verify the token and print the account
    Auth,
    /// Upload local lists
    Backup,
    /// Download the backup and replace local lists
    Restore,
}

#[derive(Subcommand)]
enum CloudAction {
    /// Upload local lists
    Backup,
    /// Download the backup and replace local lists
    Restore,
    /// Show availability and storage usage
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Profile { action } => {
            let library = commands::open_library(&cli.data_dir)?;
            match action {
                ProfileAction::Show => commands::profile::show(&library)?,
                ProfileAction::Set {
                    first,
                    last,
                    id,
                    credential,
                } => commands::profile::set(&library, first, last, id, credential)?,
            }
        }
        Commands::Inspect { format } => {
            let library = commands::open_library(&cli.data_dir)?;
            commands::inspect::run(&library, &format)?;
        }
        Commands::Gist { token, action } => {
            let library = commands::open_library(&cli.data_dir)?;
            match action {
                GistAction::Auth => commands::gist::auth(&library, &token).await?,
                GistAction::Backup => commands::gist::backup(&library, &token).await?,
                GistAction::Restore => commands::gist::restore(&library, &token).await?,
            }
        }
        Commands::Cloud {
            cloud_dir,
            identity,
            action,
        } => {
            let library = commands::open_library(&cli.data_dir)?;
            let cloud_dir = cloud_dir.unwrap_or_else(|| cli.data_dir.join("cloud"));
            let backend = commands::cloud::open(&library, &cloud_dir, identity)?;
            match action {
                CloudAction::Backup => commands::cloud::backup(&backend, &library).await?,
                CloudAction::Restore => commands::cloud::restore(&backend, &library).await?,
                CloudAction::Status => commands::cloud::status(&backend)?,
            }
        }
        Commands::Version => {
            println!("ListKeep CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Snapshot format v{}", listkeep_codec::SNAPSHOT_VERSION);
        }
    }

    Ok(())
}
