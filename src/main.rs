use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use htsgetr_reader::{Config, TicketClient, WorkerPool, output};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let request = config.request();
    let mut client = TicketClient::new()?;

    // The pool belongs to this binary, not the client
    let pool = if config.is_parallel() {
        tracing::info!("Initializing with {} threads", config.reader_threads);
        let pool = WorkerPool::new(usize::from(config.reader_threads))?;
        client = client.with_pool(Arc::new(pool.clone()));
        Some(pool)
    } else {
        None
    };

    let result = output::download_to_path(&client, &request, &config.output).await;

    if let Some(pool) = pool {
        pool.shutdown();
    }

    let download = result
        .with_context(|| format!("could not download {} to {:?}", config.id, config.output))?;

    if config.check_md5 {
        output::verify_md5(&config.output, download.md5.as_deref()).await?;
    }

    Ok(())
}
