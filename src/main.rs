use color_eyre::{eyre::eyre, Result};
use padreader::{ControllerReader, ReaderConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const PRINT_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ReaderConfig::load_or_default(config_path.as_deref())?;
    let settings = config.into_settings()?;

    info!("Opening gamepad #{}", settings.device_index);
    let reader = Arc::new(
        ControllerReader::new(settings).map_err(|e| eyre!("Failed to open controller: {}", e))?,
    );
    reader.start()?;

    let mut ticker = tokio::time::interval(PRINT_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = reader.read();
                let values = snapshot
                    .iter()
                    .map(|(control, value)| format!("{}={}", control, value))
                    .collect::<Vec<_>>()
                    .join(" ");
                info!("#{} {}", snapshot.sequence, values);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    // stop() joins the sampler thread
    let stopping = Arc::clone(&reader);
    tokio::task::spawn_blocking(move || stopping.stop()).await?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
