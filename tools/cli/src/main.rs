//! vidrelay CLI - Command line interface for multi-provider video uploads.
//!
//! Runs the HTTP API, or performs the same operations directly against the
//! local database for a single user.

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vidrelay_common::{Listing, UploadOptions, UploadOutcome};
use vidrelay_hub::{AccountEntry, AppConfig, Hub, UploadFile};

#[derive(Parser)]
#[command(name = "vidrelay")]
#[command(about = "vidrelay - Upload videos to several hosting providers at once")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: <config dir>/vidrelay/config.json).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// User whose credentials and history are used.
    #[arg(short, long, global = true, default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server.
    Serve {
        /// Address to listen on (overrides the config file).
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Manage provider API keys.
    Keys {
        #[command(subcommand)]
        action: KeysCommand,
    },

    /// Upload files to one or more providers.
    Upload {
        /// Files to upload.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Target providers, comma separated.
        #[arg(short, long, value_delimiter = ',', required = true)]
        to: Vec<String>,

        /// Destination folder id.
        #[arg(short, long)]
        folder: Option<String>,

        /// Description or title.
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Ask providers to fetch a file from a URL.
    Remote {
        /// Source URL.
        url: String,

        /// Target providers, comma separated.
        #[arg(short, long, value_delimiter = ',', required = true)]
        to: Vec<String>,

        /// Destination folder id.
        #[arg(short, long)]
        folder: Option<String>,

        /// Title for the new file.
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List a provider folder.
    Ls {
        provider: String,

        /// Folder id (default: root).
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Create a folder.
    Mkdir {
        provider: String,
        name: String,

        /// Parent folder id (default: root).
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Rename a file, or a folder with --folder.
    Rename {
        provider: String,
        id: String,
        name: String,

        #[arg(long)]
        folder: bool,
    },

    /// Move a file into a folder.
    Mv {
        provider: String,
        id: String,
        folder: String,
    },

    /// Delete a file, or a folder with --folder.
    Rm {
        provider: String,
        id: String,

        #[arg(long)]
        folder: bool,
    },

    /// Show account details for every configured provider.
    Account,

    /// Show recent uploads.
    History,

    /// Print shell completions.
    Completions { shell: Shell },
}

#[derive(Subcommand)]
enum KeysCommand {
    /// Show which providers have a key.
    Status,

    /// Store a key.
    Set { provider: String, key: String },

    /// Store a StreamTape login and key.
    SetStreamtape { login: String, key: String },

    /// Remove a key.
    Delete { provider: String },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "vidrelay", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    debug!("Database: {}", config.database_path.display());

    let hub = Hub::from_config(&config).context("Failed to initialize")?;
    let user = cli.user.as_str();

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            info!("Starting server on {}", bind);
            vidrelay_server::run_server(hub, &bind)
                .await
                .context("Server failed")
        }

        Commands::Keys { action } => cmd_keys(&hub, user, action),

        Commands::Upload {
            files,
            to,
            folder,
            description,
        } => {
            let options = UploadOptions {
                folder_id: folder,
                description,
            };
            cmd_upload(&hub, user, &files, &to, &options).await
        }

        Commands::Remote {
            url,
            to,
            folder,
            description,
        } => {
            let options = UploadOptions {
                folder_id: folder,
                description,
            };
            cmd_remote(&hub, user, &url, &to, &options).await
        }

        Commands::Ls { provider, folder } => {
            let listing = hub
                .folders()
                .list(user, &provider, folder.as_deref())
                .await
                .context("Failed to list folder")?;
            print_listing(&listing);
            Ok(())
        }

        Commands::Mkdir {
            provider,
            name,
            parent,
        } => {
            hub.folders()
                .create_folder(user, &provider, &name, parent.as_deref())
                .await
                .context("Failed to create folder")?;
            println!("Folder created: {}", name);
            Ok(())
        }

        Commands::Rename {
            provider,
            id,
            name,
            folder,
        } => {
            let folders = hub.folders();
            let renamed = if folder {
                folders.rename_folder(user, &provider, &id, &name).await
            } else {
                folders.rename_file(user, &provider, &id, &name).await
            };
            renamed.context("Failed to rename")?;
            println!("Renamed {} to {}", id, name);
            Ok(())
        }

        Commands::Mv {
            provider,
            id,
            folder,
        } => {
            hub.folders()
                .move_file(user, &provider, &id, &folder)
                .await
                .context("Failed to move file")?;
            println!("Moved {} to folder {}", id, folder);
            Ok(())
        }

        Commands::Rm {
            provider,
            id,
            folder,
        } => {
            let folders = hub.folders();
            let deleted = if folder {
                folders.delete_folder(user, &provider, &id).await
            } else {
                folders.delete_file(user, &provider, &id).await
            };
            deleted.context("Failed to delete")?;
            println!("Deleted: {}", id);
            Ok(())
        }

        Commands::Account => cmd_account(&hub, user).await,

        Commands::History => cmd_history(&hub, user),

        Commands::Completions { .. } => Ok(()),
    }
}

fn cmd_keys(hub: &Hub, user: &str, action: KeysCommand) -> Result<()> {
    let keys = hub.keys();
    match action {
        KeysCommand::Status => {
            let status = keys.status(user).context("Failed to read key status")?;
            println!("API keys for {}:", user);
            for (provider, configured) in status {
                let mark = if configured { "configured" } else { "missing" };
                println!("  {:<12} {}", provider.display_name(), mark);
            }
        }
        KeysCommand::Set { provider, key } => {
            let provider = keys.set(user, &provider, &key).context("Failed to store key")?;
            println!("API key for {} updated", provider);
        }
        KeysCommand::SetStreamtape { login, key } => {
            keys.set_streamtape(user, &login, &key)
                .context("Failed to store key")?;
            println!("API key for streamtape updated");
        }
        KeysCommand::Delete { provider } => {
            let provider = keys.delete(user, &provider).context("Failed to delete key")?;
            println!("API key for {} deleted", provider);
        }
    }
    Ok(())
}

async fn read_upload(path: &Path) -> Result<UploadFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("Not a file: {}", path.display()))?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(UploadFile::new(filename, mime_type, Bytes::from(data)))
}

async fn cmd_upload(
    hub: &Hub,
    user: &str,
    paths: &[PathBuf],
    targets: &[String],
    options: &UploadOptions,
) -> Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(read_upload(path).await?);
    }

    let report = hub
        .orchestrator()
        .upload_files(user, files, targets, options)
        .await
        .context("Upload rejected")?;

    for file in &report.results {
        println!("{} [{}]", file.filename, file.status.as_str());
        for outcome in &file.uploads {
            print_outcome(outcome);
        }
    }
    println!("{}", report.message);

    if !report.success {
        anyhow::bail!("No provider accepted the upload");
    }
    Ok(())
}

async fn cmd_remote(
    hub: &Hub,
    user: &str,
    url: &str,
    targets: &[String],
    options: &UploadOptions,
) -> Result<()> {
    let report = hub
        .orchestrator()
        .upload_remote(user, url, targets, options)
        .await
        .context("Remote upload rejected")?;

    for outcome in &report.results {
        print_outcome(outcome);
    }
    println!("{}", report.message);

    if !report.success {
        anyhow::bail!("No provider accepted the remote upload");
    }
    Ok(())
}

fn print_outcome(outcome: &UploadOutcome) {
    let name = outcome.provider.display_name();
    if outcome.success {
        let location = outcome
            .url
            .as_deref()
            .or(outcome.id.as_deref())
            .unwrap_or("accepted");
        println!("  {:<12} ok     {}", name, location);
    } else {
        println!(
            "  {:<12} failed {}",
            name,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
}

fn print_listing(listing: &Listing) {
    if listing.total() == 0 {
        println!("Folder is empty.");
        return;
    }
    for folder in &listing.folders {
        println!("  [DIR]  {}/  (id {})", folder.name, folder.id);
    }
    for file in &listing.files {
        let size = file
            .size
            .map(|s| format!("{} bytes", s))
            .unwrap_or_default();
        println!("  [FILE] {} ({})  id {}", file.name, size, file.id);
        if let Some(url) = &file.url {
            println!("         {}", url);
        }
    }
}

async fn cmd_account(hub: &Hub, user: &str) -> Result<()> {
    let accounts = hub
        .accounts(user)
        .await
        .context("Failed to fetch accounts")?;
    if accounts.is_empty() {
        println!("No providers configured.");
        return Ok(());
    }

    for (provider, entry) in accounts {
        println!("{}:", provider.display_name());
        match entry {
            AccountEntry::Failed { error } => println!("  error: {}", error),
            AccountEntry::Info(info) => {
                let json = serde_json::to_value(&info)?;
                if let Some(fields) = json.as_object() {
                    for (key, value) in fields {
                        println!("  {}: {}", key, value);
                    }
                }
            }
        }
    }
    Ok(())
}

fn cmd_history(hub: &Hub, user: &str) -> Result<()> {
    let history = hub.history(user).context("Failed to read history")?;
    if history.is_empty() {
        println!("No uploads yet.");
        return Ok(());
    }
    for record in history {
        println!(
            "{}  {:<10} {:<7} {}  {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.provider.as_str(),
            record.status,
            record.filename,
            record.url.unwrap_or_default()
        );
    }
    Ok(())
}
