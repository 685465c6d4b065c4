use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use replicator::config::Config;
use replicator::logging;
use replicator::server::{AppState, create_router};
use replicator::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "replicator")]
#[command(about = "A fleet registry that groups servers into apps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to the TOML config file (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

impl ConfigArgs {
    fn load(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        config.log.verbose |= self.verbose;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        #[command(flatten)]
        config: ConfigArgs,

        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Create the database schema
    Init {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Insert sample apps and servers
    Seed {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    let path = &config.database.path;
    let store = SqliteStore::new(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    store.initialize()?;
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => {
            let mut config = config.load()?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            logging::init(&config.log)?;

            let store = open_store(&config)?;
            info!("Using database at {}", config.database.path.display());

            let state = Arc::new(AppState::new(Arc::new(store)));
            let app = create_router(state);
            let addr = config.server.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
        Commands::Init { config } => {
            let config = config.load()?;
            logging::init(&config.log)?;

            open_store(&config)?;
            println!(
                "Initialized database at {}",
                config.database.path.display()
            );
        }
        Commands::Seed { config } => {
            let config = config.load()?;
            logging::init(&config.log)?;

            let store = open_store(&config)?;
            store
                .seed_sample_data()
                .context("failed to insert sample data")?;
            println!("Inserted sample data");
        }
    }

    Ok(())
}
