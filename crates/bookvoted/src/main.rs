//! bookvoted — the book ballot daemon.
//!
//! Serves the voting and admin pages, and offers offline access to the
//! tally and the vote reset for when the server is stopped.
//!
//! # Usage
//!
//! ```text
//! bookvoted serve --port 3000 --data-dir ./data
//! bookvoted results --data-dir ./data
//! bookvoted reset --data-dir ./data
//! ```

mod offline;
mod serve;

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use bookvote_core::BookvoteConfig;
use bookvote_core::config::LogFormat;

#[derive(Parser)]
#[command(name = "bookvoted", about = "Book ballot daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the ballot over HTTP.
    Serve {
        #[command(flatten)]
        common: CommonArgs,

        /// Port to listen on (overrides PORT and the config file).
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind.
        #[arg(long)]
        bind: Option<IpAddr>,
    },

    /// Print the current tally.
    Results {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Drop all votes and start a new voting round.
    Reset {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Path to a bookvote.toml file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Directory holding the database file.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl CommonArgs {
    fn load(&self) -> anyhow::Result<BookvoteConfig> {
        let mut config = BookvoteConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.storage.data_dir = dir.clone();
        }
        Ok(config)
    }

    /// Load the config under a temporary stderr subscriber, since the
    /// configured log format is only known afterwards.
    fn load_logged(&self) -> anyhow::Result<BookvoteConfig> {
        load_with_bootstrap_logs(self, std::io::stderr)
    }
}

fn load_with_bootstrap_logs<W>(common: &CommonArgs, make_writer: W) -> anyhow::Result<BookvoteConfig>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::with_default(bootstrap, || common.load())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { common, port, bind } => {
            let mut config = common.load_logged()?;
            init_tracing(config.logging.format);
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve::run(config).await
        }
        Command::Results { common } => {
            let config = common.load_logged()?;
            init_tracing(config.logging.format);
            offline::print_results(&config)
        }
        Command::Reset { common } => {
            let config = common.load_logged()?;
            init_tracing(config.logging.format);
            offline::reset_votes(&config)
        }
    }
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = installed {
        warn!(error = %e, "tracing subscriber already installed");
    }

    // Log panics through tracing; the runtime keeps serving other requests.
    std::panic::set_hook(Box::new(|info| {
        error!(panic = %info, "uncaught panic");
    }));
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,bookvote=debug"))
}
