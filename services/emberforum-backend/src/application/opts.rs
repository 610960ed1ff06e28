use std::{fmt, path::PathBuf};

use common::config;
use common::err_context::{ErrorContext, ErrorContextExt};
use common::settings::Settings;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

#[derive(Debug)]
pub enum Error {
    Merging {
        context: String,
        source: config::Error,
    },
    Deserializing {
        context: String,
        source: ::config::ConfigError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Merging { context, source } => {
                write!(fmt, "Could not merge configuration: {context} | {source}")
            }
            Error::Deserializing { context, source } => {
                write!(
                    fmt,
                    "Could not deserialize configuration: {context} | {source}"
                )
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<config::Error>> for Error {
    fn from(err: ErrorContext<config::Error>) -> Self {
        Error::Merging {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<::config::ConfigError>> for Error {
    fn from(err: ErrorContext<::config::ConfigError>) -> Self {
        Error::Deserializing {
            context: err.0,
            source: err.1,
        }
    }
}

#[derive(Debug, Clone, clap::Parser)]
#[clap(
    name = "emberforum",
    about = "Serving REST API for the emberforum forum",
    version = VERSION,
    author = AUTHORS
    )]
pub struct Opts {
    /// Defines the config directory
    ///
    #[arg(value_parser = clap::value_parser!(PathBuf), short = 'c', long = "config-dir")]
    pub config_dir: PathBuf,

    /// Defines the run mode in {testing, dev, prod, ...}
    ///
    /// If no run mode is provided, a default behavior will be used.
    #[arg(short = 'm', long = "run-mode")]
    pub run_mode: Option<String>,

    /// Override settings values using key=value
    #[arg(short = 's', long = "setting")]
    pub settings: Vec<String>,

    #[clap(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Clone, clap::Parser)]
pub enum Command {
    /// Run the forum backend with the given configuration
    Run,
    /// Print the resolved configuration
    Config,
}

impl TryInto<Settings> for Opts {
    type Error = Error;

    fn try_into(self) -> Result<Settings, Self::Error> {
        config::merge_configuration(
            self.config_dir.as_ref(),
            &["service", "database", "email", "forum"],
            self.run_mode.as_deref(),
            "EMBERFORUM",
            self.settings,
        )
        .context("Could not merge configuration sources")?
        .try_deserialize()
        .context("Could not deserialize settings")
        .map_err(|err: ErrorContext<::config::ConfigError>| err.into())
    }
}
