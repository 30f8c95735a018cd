/// API сервер конвейера Adiwiyata

use anyhow::Context;

use adiwiyata_ml::{
    api::{self, AppState},
    Config, Pipeline,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    let bind_addr = config.bind_addr.clone();

    let pipeline = Pipeline::new(config);
    for status in pipeline.sources().iter().filter(|s| !s.exists) {
        tracing::warn!("Source {} missing at {}", status.source, status.path.display());
    }

    let app = api::router(AppState::new(pipeline));

    let listener = tokio::net::TcpListener::bind(bind_addr.as_str())
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("Server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
