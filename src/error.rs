// Typed failures the rest of the crate reacts to
// Startup errors abort the process, session errors end up in the status line

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no username configured (use --username or set `username` in config.toml)")]
    MissingCredentials,

    #[error("could not login: {0}")]
    LoginFailed(String),

    #[error("could not login: no connection after {0:?}")]
    LoginTimeout(Duration),

    #[error("cannot find cache dir")]
    CacheDir,

    #[error("bad configuration: {0}")]
    Config(String),

    #[error("session closed before login completed")]
    SessionClosed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to load '{uri}': {reason}")]
    Load { uri: String, reason: String },

    #[error("audio output error: {0}")]
    Output(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("login rejected: {0}")]
    Rejected(String),
}
