use std::{sync::Arc, time::Duration};

use mdb_core::config::Config;
use mdb_fetch::DirectHttpClient;

#[tokio::main]
async fn main() -> Result<(), mdb_core::Error> {
    mdb_core::logging::init("mdb")?;

    let cfg = Arc::new(Config::load());
    if cfg.bot_token.trim().is_empty() {
        return Err(mdb_core::Error::Config(
            "BOT_TOKEN is required (env file or process environment)".to_string(),
        ));
    }

    for dir in cfg.storage_dirs() {
        std::fs::create_dir_all(dir)?;
    }

    spawn_janitor(cfg.clone());

    let downloader = Arc::new(DirectHttpClient::new());

    mdb_telegram::router::run_polling(cfg, downloader)
        .await
        .map_err(|e| mdb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}

/// Janitor cadence and minimum stale age, or `None` to disable.
///
/// Timing values coerce to 0 when set but non-numeric. A zero period panics
/// the interval constructor and a zero age sweeps files still being served,
/// so either zero turns the janitor off.
fn janitor_schedule(cfg: &Config) -> Option<(Duration, Duration)> {
    if cfg.session_cleanup_interval.is_zero() || cfg.session_timeout.is_zero() {
        return None;
    }
    Some((cfg.session_cleanup_interval, cfg.session_timeout))
}

fn spawn_janitor(cfg: Arc<Config>) {
    let Some((period, min_age)) = janitor_schedule(&cfg) else {
        tracing::warn!("janitor disabled: cleanup interval and stale age must be non-zero");
        return;
    };

    tokio::spawn(async move {
        // The first tick fires immediately; that initial sweep is intentional.
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            for dir in [&cfg.temp_dir, &cfg.downloads_dir] {
                match mdb_core::cleanup::sweep_stale_files(dir, min_age) {
                    Ok(0) => {}
                    Ok(n) => {
                        tracing::info!("janitor removed {n} stale files from {}", dir.display());
                    }
                    Err(e) => {
                        tracing::warn!("janitor sweep failed for {}: {e}", dir.display());
                    }
                }
            }
        }
    });
}
