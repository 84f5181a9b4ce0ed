//! CLI definition and entrypoint to executable
use crate::{keytool, logs::init_tracing, query, serve};
use clap::{Parser, Subcommand};
use dr_config::{Config, ConfigFmt, ConfigTrait as _, DelegatedRoutingConfig};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, level_filters::LevelFilter};

/// The main delegated routing cli interface.
///
/// This is the entrypoint to the executable.
#[derive(Debug, Parser)]
#[command(author, version, about = "Delegated content routing", long_about = None)]
pub struct Cli {
    /// The command to run
    #[clap(subcommand)]
    pub command: Commands,

    /// Path to the yaml configuration.
    ///
    /// The default configuration is written here if the file does not exist.
    #[arg(
        long,
        value_name = "CONFIG",
        default_value = "delegated-routing.yaml",
        verbatim_doc_comment,
        global = true
    )]
    pub config: PathBuf,

    /// The default log level. Directives in `RUST_LOG` take precedence.
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    pub verbosity: LevelFilter,
}

impl Cli {
    /// Parsers only the default CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parsers only the default CLI arguments from the given iterator
    pub fn try_parse_args_from<I, T>(itr: I) -> Result<Self, clap::error::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Cli::try_parse_from(itr)
    }

    /// Execute the configured cli command.
    pub fn run(self) -> eyre::Result<()> {
        init_tracing(self.verbosity);

        match self.command {
            Commands::Keytool(command) => command.execute(),
            Commands::Serve(command) => {
                let config = load_config(&self.config)?;
                let base = self.config.parent().unwrap_or_else(|| Path::new("."));
                runtime()?.block_on(command.execute(config.server, base))
            }
            Commands::FindProviders(command) => {
                let config = load_config(&self.config)?;
                runtime()?.block_on(command.execute(config.client))
            }
            Commands::Provide(command) => {
                let config = load_config(&self.config)?;
                runtime()?.block_on(command.execute(config.client))
            }
        }
    }
}

/// Commands to be executed
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve delegated routing requests from a static provider table.
    #[command(name = "serve")]
    Serve(serve::ServeArgs),

    /// Stream the providers of a content id from a router.
    #[command(name = "find-providers")]
    FindProviders(query::FindProvidersArgs),

    /// Sign and publish provider advertisements to a router.
    #[command(name = "provide")]
    Provide(query::ProvideArgs),

    /// Key management.
    /// Generate or inspect the peer identity used to sign advertisements.
    #[command(name = "keytool")]
    Keytool(keytool::KeyArgs),
}

fn load_config(path: &Path) -> eyre::Result<DelegatedRoutingConfig> {
    let config = Config::load_from_path_or_default(path, ConfigFmt::YAML)?;
    debug!(target: "dr::cli", ?config, "configuration loaded");
    Ok(config)
}

fn runtime() -> eyre::Result<Runtime> {
    Ok(Builder::new_multi_thread()
        .thread_name("delegated-routing")
        .enable_io()
        .enable_time()
        .build()?)
}
