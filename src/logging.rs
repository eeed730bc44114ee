//! Logging setup.
//!
//! Logs go to stderr; stdout stays clean for the terminal the filesystem
//! was mounted from. The level comes from the `TAGFUSE_LOG` environment
//! variable unless a level was given explicitly via config or flag.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(level: Option<&str>) -> Result<()> {
    let env_filter = match level {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("invalid log level {:?}", level))?
        }
        None => EnvFilter::try_from_env("TAGFUSE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
