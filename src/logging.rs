//! Tracing setup for the `pgpanel` binary
//!
//! Level and format come from `[logging]`; `PGPANEL_LOG` (an env-filter
//! directive) takes precedence over the configured level. Logs go to stderr
//! unless `logging.file` is set, in which case they are appended to that file
//! through a non-blocking writer.

use std::env;
use std::fs::OpenOptions;
use std::io;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

pub const LOG_ENV_VAR: &str = "PGPANEL_LOG";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Level directive in effect: `PGPANEL_LOG` if set and non-empty, else the config
pub fn effective_level(config: &LoggingConfig) -> String {
    env::var(LOG_ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}

/// Install the global subscriber. Calling it twice leaves the first one in place.
pub fn init_tracing(config: &LoggingConfig) -> io::Result<()> {
    let level = effective_level(config);
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = config.format.eq_ignore_ascii_case("json");

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);

            let base = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(non_blocking);
            if json {
                Box::new(base.json().finish())
            } else {
                Box::new(base.compact().finish())
            }
        }
        None => {
            let base = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr);
            if json {
                Box::new(base.json().finish())
            } else {
                Box::new(base.compact().finish())
            }
        }
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
    Ok(())
}
