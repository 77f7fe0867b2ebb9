//! CLI entry point for quire

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quire::server::ServeOptions;
use quire::Site;

#[derive(Parser)]
#[command(name = "quire")]
#[command(version)]
#[command(about = "A small static blog generator with index-ordered collections", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site into the public directory
    #[command(alias = "b")]
    Build {
        /// Include items marked as drafts
        #[arg(long)]
        drafts: bool,
    },

    /// Build, serve and rebuild on changes
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Serve only, without watching for changes
        #[arg(long)]
        no_watch: bool,

        /// Include items marked as drafts
        #[arg(long)]
        drafts: bool,
    },

    /// Remove the public directory
    Clean,

    /// List site information
    List {
        /// Type of content to list (posts, pages, tags)
        #[arg(default_value = "posts")]
        r#type: String,
    },

    /// Create a new post with the next free index
    New {
        /// Title of the new post
        title: String,

        /// Id (and file name) of the new post; defaults to the slugified title
        #[arg(long)]
        id: Option<String>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug { "quire=debug,info" } else { "quire=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read the current directory")?,
    };

    match cli.command {
        Commands::Build { drafts } => {
            let site = open_site(&base_dir)?;
            let report = quire::commands::build::run(&site, drafts)?;
            println!(
                "Built {} file(s) in {:.2}s",
                report.files_written,
                report.elapsed.as_secs_f64()
            );
        }

        Commands::Serve {
            port,
            ip,
            no_watch,
            drafts,
        } => {
            let site = open_site(&base_dir)?;
            quire::commands::build::run(&site, drafts)?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            let options = ServeOptions {
                ip,
                port,
                watch: !no_watch,
                include_drafts: drafts,
            };
            quire::server::start(&site, options).await?;
        }

        Commands::Clean => {
            let site = open_site(&base_dir)?;
            if quire::commands::clean::run(&site)? {
                println!("Cleaned successfully!");
            }
        }

        Commands::List { r#type } => {
            let site = open_site(&base_dir)?;
            quire::commands::list::run(&site, &r#type)?;
        }

        Commands::New { title, id } => {
            let site = open_site(&base_dir)?;
            let path = quire::commands::new::create_post(&site, &title, id.as_deref())?;
            println!("Created: {:?}", path);
        }

        Commands::Version => {
            println!("quire version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn open_site(base_dir: &Path) -> Result<Site> {
    Site::new(base_dir).with_context(|| format!("failed to open site at {:?}", base_dir))
}
