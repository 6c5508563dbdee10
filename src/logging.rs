// Logging setup - the terminal belongs to the UI, so logs go to a rolling file

use crate::config::APP_NAME;
use crate::error::StartupError;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// `<cache dir>/tuneloop/logs`
pub fn log_dir() -> Result<PathBuf, StartupError> {
    dirs::cache_dir()
        .map(|dir| dir.join(APP_NAME).join("logs"))
        .ok_or(StartupError::CacheDir)
}

pub fn init_logging(log_dir: &Path, dev: bool) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, format!("{}.log", APP_NAME));
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{}=debug", APP_NAME)));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if dev {
        eprintln!("Dev mode: logging to {}", log_dir.display());
    }

    // The writer thread must outlive main's scope.
    std::mem::forget(guard);

    Ok(())
}

/// Points stderr at /dev/null so audio-library chatter cannot scribble
/// over the TUI.
#[cfg(unix)]
pub fn redirect_stderr_to_null() -> Result<()> {
    unsafe {
        let null_fd = libc::open(b"/dev/null\0".as_ptr() as *const libc::c_char, libc::O_WRONLY);
        if null_fd == -1 {
            return Err(anyhow::anyhow!("Failed to open /dev/null"));
        }

        if libc::dup2(null_fd, libc::STDERR_FILENO) == -1 {
            libc::close(null_fd);
            return Err(anyhow::anyhow!("Failed to redirect stderr"));
        }

        libc::close(null_fd);
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn redirect_stderr_to_null() -> Result<()> {
    Ok(())
}
