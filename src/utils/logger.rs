use anyhow::Result;
use chrono::Local;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initializes the global tracing subscriber
///
/// Logs go to stderr; when `log_dir` is given, a timestamped log file is
/// written there instead. The filter honors `RUST_LOG` and defaults to
/// `info`.
pub fn init_logger(log_dir: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            if !Path::new(dir).exists() {
                fs::create_dir_all(dir)?;
            }
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            let log_file = format!("{}/proxy_herder_{}.log", dir, timestamp);

            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(fs::File::create(log_file)?)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    info!("Logger initialized");
    Ok(())
}
