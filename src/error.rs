use std::{io, path::PathBuf};
use thiserror::Error;

/// Problems loading or validating the timer configuration. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Raw mode, display or keyboard failures.
#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("failed to enable raw terminal mode: {0}")]
    RawMode(#[source] io::Error),

    #[error("failed to initialise the status display: {0}")]
    Display(#[source] io::Error),

    #[error("failed to spawn the keyboard thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("keyboard input failed: {0}")]
    Input(#[source] io::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
