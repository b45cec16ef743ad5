use anyhow::Context;
use rollcall::{
    core::recognition::Sample,
    notify::LogSubscriber,
    utils::{config::Config, logging},
    Application,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::new().context("Failed to load configuration")?;

    let _log_guard = logging::init(&config.logging)?;
    info!("Starting Rollcall v{}", env!("CARGO_PKG_VERSION"));

    // Initialize application
    let app = Application::new(config).await.map_err(|e| {
        error!("Failed to initialize application: {}", e);
        e
    })?;
    app.broadcaster().subscribe(Arc::new(LogSubscriber::new("console")));

    let engine = app.engine();
    let feed = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut line_no = 0u64;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let sample: Sample = match serde_json::from_str(&line) {
                Ok(sample) => sample,
                Err(e) => {
                    warn!(line = line_no, "Skipping malformed sample: {}", e);
                    continue;
                }
            };

            if engine.observe(sample).await.is_err() {
                break;
            }
        }

        info!("Sample feed closed after {} lines", line_no);
        Ok::<_, std::io::Error>(())
    });

    tokio::select! {
        result = feed => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Failed to read samples: {}", e),
                Err(e) => error!("Sample feed task failed: {}", e),
            }
        }
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received shutdown signal"),
                Err(err) => error!("Failed to listen for shutdown signal: {}", err),
            }
        }
    }

    // Perform graceful shutdown
    if let Err(e) = app.shutdown().await {
        error!("Error during shutdown: {}", e);
    }

    Ok(())
}
