//! aum: the tiny document search engine
//!
//! Indexes a directory of documents into a search backend and serves a
//! search API over it.

mod commands;

use anyhow::{Context, Result};
use aum::backend::DEFAULT_SEARCH_LIMIT;
use aum::config::{
    BackendConfig, BackendKind, Config, ExtractorKind, LogFormat, LoggingConfig,
    DEFAULT_CONFIG_FILE,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aum")]
#[command(about = "The tiny document search engine")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "AUM_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Backend selection and connection overrides
#[derive(Args)]
struct BackendArgs {
    /// Search backend (http, socket, meilisearch or sonic)
    #[arg(long, env = "AUM_BACKEND", global = true)]
    backend: Option<BackendKind>,

    /// URL of the HTTP search engine
    #[arg(long, env = "AUM_HTTP_URL", global = true)]
    http_url: Option<String>,

    /// API key of the HTTP search engine
    #[arg(long, env = "AUM_HTTP_API_KEY", hide_env_values = true, global = true)]
    http_api_key: Option<String>,

    /// Host of the socket search daemon
    #[arg(long, env = "AUM_SOCKET_HOST", global = true)]
    socket_host: Option<String>,

    /// Port of the socket search daemon
    #[arg(long, env = "AUM_SOCKET_PORT", global = true)]
    socket_port: Option<u16>,

    /// Password of the socket search daemon
    #[arg(long, env = "AUM_SOCKET_PASSWORD", hide_env_values = true, global = true)]
    socket_password: Option<String>,
}

impl BackendArgs {
    fn apply(self, config: &mut BackendConfig) {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(url) = self.http_url {
            config.http.url = url;
        }
        if let Some(key) = self.http_api_key {
            config.http.api_key = Some(key);
        }
        if let Some(host) = self.socket_host {
            config.socket.host = host;
        }
        if let Some(port) = self.socket_port {
            config.socket.port = port;
        }
        if let Some(password) = self.socket_password {
            config.socket.password = password;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scan and index a directory of documents
    Index {
        /// Name of the index to create
        index_name: String,

        /// Directory to scan for documents
        directory: PathBuf,

        /// URL of the Tika server (default: starts a local instance)
        #[arg(long, env = "AUM_TIKA_URL")]
        tika_url: Option<String>,

        /// Text extractor (tika or plain)
        #[arg(long)]
        extractor: Option<ExtractorKind>,

        /// Documents per indexing request
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Serve the search API and web interface
    Serve {
        /// Name of the index to serve
        index_name: String,

        /// Listen address
        #[arg(short, long)]
        listen: Option<String>,

        /// Directory of static frontend files
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Delete an index and all its documents
    Delete {
        /// Name of the index to delete
        index_name: String,
    },

    /// Search an index and print the result as JSON
    Search {
        /// Name of the index to search
        index_name: String,

        /// Search query
        query: String,

        /// Maximum number of hits
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    cli.backend.apply(&mut config.search);

    init_logging(&config.logging, cli.verbose)?;
    info!("Starting aum, the tiny document search engine");

    match cli.command {
        Commands::Index {
            index_name,
            directory,
            tika_url,
            extractor,
            batch_size,
        } => {
            if tika_url.is_some() {
                config.extraction.tika_url = tika_url;
            }
            if let Some(extractor) = extractor {
                config.extraction.extractor = extractor;
            }
            if let Some(batch_size) = batch_size {
                config.indexing.batch_size = batch_size;
            }
            config.validate()?;
            commands::index::index_directory(&config, &index_name, &directory)
        }
        Commands::Serve {
            index_name,
            listen,
            static_dir,
        } => {
            if let Some(listen) = listen {
                config.http.listen_addr = listen;
            }
            if static_dir.is_some() {
                config.http.static_dir = static_dir;
            }
            config.validate()?;
            commands::serve::serve(&config, &index_name)
        }
        Commands::Delete { index_name } => {
            config.validate()?;
            commands::delete::delete_index(&config, &index_name)
        }
        Commands::Search {
            index_name,
            query,
            limit,
        } => {
            config.validate()?;
            commands::search::search_index(&config, &index_name, &query, limit)
        }
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over `-v`, which wins over the configured level.
fn init_logging(config: &LoggingConfig, verbose: u8) -> Result<()> {
    let level = config.level.raised_by(verbose);
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => EnvFilter::try_new(directives)
            .with_context(|| format!("Invalid {}", EnvFilter::DEFAULT_ENV))?,
        _ => EnvFilter::new(level.as_str()),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
