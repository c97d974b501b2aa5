use crate::{errors::Error, Result};

/// Initialize logging/tracing for the bot.
///
/// Defaults to `info` for our crates; override with `RUST_LOG`.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("info,mdb=info,mdb_core=info,{service_name}=info"))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::Config(format!("logging init failed: {e}")))?;

    Ok(())
}
