//! drive_catalog CLI - list, upload, download and delete Google Drive files.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drive_catalog::{
    parse_file_ref, viewer_url, Authenticator, Catalog, CatalogConfig, CatalogEvent, CatalogRow,
    DriveClient, MediaKind, PresentationSink, SortColumn,
};

/// Browse and manage the files of a Google Drive account.
#[derive(Parser)]
#[command(name = "drive_catalog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    globals: Globals,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Globals {
    /// Path to service account JSON credentials file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", conflicts_with = "token")]
    credentials: Option<PathBuf>,

    /// Pre-issued OAuth access token.
    #[arg(long, env = "DRIVE_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Config file (TOML). Defaults to the platform config directory.
    #[arg(long, env = "DRIVE_CATALOG_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List files, optionally only those inside a named folder.
    List {
        /// Folder name.
        #[arg(long, short = 'f')]
        folder: Option<String>,

        /// Sort column: name, id or mimeType.
        #[arg(long, short = 's')]
        sort: Option<SortColumn>,

        /// Sort descending.
        #[arg(long)]
        desc: bool,
    },

    /// Upload a local file.
    Upload {
        /// Local file path.
        path: PathBuf,

        /// Name to store the file under (defaults to the file name).
        #[arg(long, short = 'n', default_value = "")]
        name: String,
    },

    /// Download a file to the local filesystem.
    Download {
        /// File URL or ID.
        file: String,

        /// Destination file or directory (defaults to download_dir).
        #[arg(long, short = 't')]
        to: Option<PathBuf>,

        /// Folder to look the file up in.
        #[arg(long, short = 'f')]
        folder: Option<String>,
    },

    /// Delete one or more files.
    Delete {
        /// File URLs or IDs.
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Print the browser URL of a file.
    OpenUrl {
        /// File URL or ID.
        file: String,
    },
}

/// Keeps the latest rows the catalog rendered.
#[derive(Default)]
struct ConsoleTable {
    rows: RefCell<Vec<CatalogRow>>,
}

impl PresentationSink for ConsoleTable {
    fn render(&self, rows: &[CatalogRow]) {
        *self.rows.borrow_mut() = rows.to_vec();
    }
}

impl ConsoleTable {
    fn print(&self) {
        let rows = self.rows.borrow();
        if rows.is_empty() {
            println!("No files found.");
            return;
        }
        println!("{:>4} {:<44} {:<40} {}", "#", "ID", "TYPE", "NAME");
        println!("{}", "-".repeat(110));
        for row in rows.iter() {
            println!(
                "{:>4} {:<44} {:<40} {}",
                row.display_id, row.record.id, row.record.mime_type, row.record.name
            );
        }
    }
}

/// Apply completions until no background operation is left.
async fn settle(catalog: &mut Catalog) -> Vec<CatalogEvent> {
    let mut events = Vec::new();
    while let Some(event) = catalog.next_event().await {
        events.push(event);
    }
    events
}

fn first_refresh_error(events: Vec<CatalogEvent>) -> Result<()> {
    for event in events {
        if let CatalogEvent::RefreshFailed(e) = event {
            return Err(e).context("Failed to list files");
        }
    }
    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// An authenticated catalog with a console table attached.
struct Session {
    catalog: Catalog,
    table: Rc<ConsoleTable>,
    download_dir: PathBuf,
}

fn connect(globals: &Globals) -> Result<Session> {
    let config = CatalogConfig::load(globals.config.as_deref()).context("Failed to load config")?;

    let auth = match (&globals.credentials, &globals.token) {
        (_, Some(token)) => Authenticator::static_token(token.clone()),
        (Some(path), None) => Authenticator::from_file(path)
            .with_context(|| format!("Failed to load credentials from {:?}", path))?,
        (None, None) => anyhow::bail!("Either --credentials or --token is required"),
    };
    let client = DriveClient::with_endpoints(auth, &config.api_base, &config.upload_base);

    let download_dir = config.download_dir.clone();
    let mut catalog = Catalog::new(Arc::new(client), config);
    let table = Rc::new(ConsoleTable::default());
    catalog.attach_sink(&table);

    Ok(Session {
        catalog,
        table,
        download_dir,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::OpenUrl { file } => {
            let file_id = parse_file_ref(&file)
                .with_context(|| format!("Invalid file URL or ID: {}", file))?;
            println!("{}", viewer_url(&file_id));
        }

        Commands::List { folder, sort, desc } => {
            let Session {
                mut catalog, table, ..
            } = connect(&cli.globals)?;
            if let Some(column) = sort {
                catalog.sort_by(column, !desc);
            } else if desc {
                let column = catalog.snapshot().sort_order().column;
                catalog.sort_by(column, false);
            }
            catalog.refresh(folder.as_deref());
            first_refresh_error(settle(&mut catalog).await)?;
            table.print();
        }

        Commands::Upload { path, name } => {
            let Session { mut catalog, .. } = connect(&cli.globals)?;
            let kind = catalog.resolver().resolve_from_extension(&path);
            if kind == MediaKind::Unknown {
                anyhow::bail!("Unsupported file type: {:?}", path);
            }
            println!("Uploading {:?} ({})...", path, kind);
            catalog
                .upload(&path, &name, kind)
                .with_context(|| format!("Failed to upload {:?}", path))?;

            for event in settle(&mut catalog).await {
                match event {
                    CatalogEvent::Uploaded(receipt) => {
                        println!("OK");
                        println!("File ID:  {}", receipt.id);
                        println!("File URL: {}", receipt.url);
                    }
                    CatalogEvent::UploadFailed { error, .. } => {
                        return Err(error).context("Upload failed");
                    }
                    _ => {}
                }
            }
        }

        Commands::Download { file, to, folder } => {
            let file_id = parse_file_ref(&file)
                .with_context(|| format!("Invalid file URL or ID: {}", file))?;
            let Session {
                mut catalog,
                download_dir,
                ..
            } = connect(&cli.globals)?;

            catalog.refresh(folder.as_deref());
            first_refresh_error(settle(&mut catalog).await)?;

            let (file_name, kind) = match catalog.snapshot().find(&file_id) {
                Some(record) => catalog.download_file_name(record),
                None => {
                    tracing::warn!("{} is not in the listing, downloading raw bytes", file_id);
                    let kind = to
                        .as_ref()
                        .map(|p| catalog.resolver().resolve_from_extension(p))
                        .unwrap_or(MediaKind::Unknown);
                    (file_id.clone(), kind)
                }
            };

            let destination = match to {
                Some(path) if path.is_dir() => path.join(&file_name),
                Some(path) => path,
                None => download_dir.join(&file_name),
            };

            print!("Downloading {}... ", file_id);
            catalog
                .download(&file_id, &destination, kind)
                .with_context(|| format!("Failed to download file: {}", file_id))?;

            for event in settle(&mut catalog).await {
                match event {
                    CatalogEvent::Downloaded { path, .. } => {
                        println!("OK");
                        println!("Saved to: {:?}", path);
                    }
                    CatalogEvent::DownloadFailed { error, .. } => {
                        println!("FAILED");
                        return Err(error).context("Download failed");
                    }
                    _ => {}
                }
            }
        }

        Commands::Delete { files } => {
            let ids = files
                .iter()
                .map(|f| parse_file_ref(f).with_context(|| format!("Invalid file URL or ID: {}", f)))
                .collect::<Result<Vec<_>>>()?;
            let Session { mut catalog, .. } = connect(&cli.globals)?;

            println!("Deleting {} file(s)...", ids.len());
            catalog.delete_many(ids);

            let mut failed = 0;
            for event in settle(&mut catalog).await {
                match event {
                    CatalogEvent::Deleted { deleted, failures } => {
                        for id in deleted {
                            println!("Deleted: {}", id);
                        }
                        for failure in &failures {
                            eprintln!("  Error: {} ({})", failure.id, failure.error);
                        }
                        failed = failures.len();
                    }
                    CatalogEvent::RefreshFailed(e) => {
                        tracing::warn!("Post-delete refresh failed: {}", e);
                    }
                    _ => {}
                }
            }

            println!("{} file(s) remain listed.", catalog.rows().len());
            if failed > 0 {
                anyhow::bail!("{} file(s) could not be deleted", failed);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_open_url_parses_without_credentials() {
        let cli = Cli::try_parse_from(["drive_catalog", "open-url", "1abcDEF"]).unwrap();
        assert!(matches!(cli.command, Commands::OpenUrl { ref file } if file == "1abcDEF"));
    }
}
