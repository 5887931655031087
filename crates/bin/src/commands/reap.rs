//! Expired object reclamation.
//!
//! Without `--interval` this is a one-shot sweep, suitable for cron. With it,
//! a background [`Reaper`](weavestore::expiry::Reaper) runs until SIGINT or
//! SIGTERM, after which the in-memory backend (if used) is saved.

use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};

use crate::backend::{backend_label, json_path, open_storage, persist};
use crate::cli::ReapArgs;
use crate::output::OutputFormat;

/// Run the reap command
pub async fn run(args: &ReapArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(&args.backend_config).await?;
    let json_path = json_path(&args.backend_config);

    let Some(secs) = args.interval else {
        let removed = storage.purge_expired().await?;
        persist(&storage, &json_path).await?;
        match format {
            OutputFormat::Human => println!("Removed {removed} expired objects"),
            OutputFormat::Json => {
                let value = serde_json::json!({ "removed": removed });
                println!("{}", serde_json::to_string(&value)?);
            }
        }
        return Ok(());
    };

    if secs == 0 {
        return Err("--interval must be at least 1 second".into());
    }

    println!(
        "Reaping {} every {secs}s",
        backend_label(&args.backend_config)
    );
    println!("Press Ctrl+C to shutdown");

    let reaper = storage.start_reaper(Duration::from_secs(secs));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
    }

    reaper.shutdown().await?;

    // Save database on shutdown (only needed for InMemory backend)
    if let Err(e) = persist(&storage, &json_path).await {
        tracing::error!("Failed to save database: {e:?}");
        return Err(e);
    }

    println!("Reaper shut down");
    Ok(())
}
