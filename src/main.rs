use std::sync::Arc;

mod app;
mod auth;
mod config;
mod error;
mod mail;
mod state;
mod storage;
mod users;
mod verification;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "examtraining=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(config::AppConfig::from_env()?);
    let addr = config.listen_addr()?;
    let app_state = state::AppState::init(config).await?;
    let app = app::build_app(app_state);
    app::serve(app, addr).await
}
