use anyhow::Context;
use tracing::{Level, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` is optional; the process environment always wins.
    let dotenv = dotenvy::dotenv();

    ai_llm_service::telemetry::init("info", Level::INFO)
        .context("failed to install tracing subscriber")?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => info!("no .env file, using process environment"),
        Err(e) => warn!(error = %e, "ignoring unreadable .env"),
    }

    api::start().await.context("chat relay server failed")?;
    Ok(())
}
