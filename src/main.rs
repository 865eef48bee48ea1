use catalog::{app, state::AppState};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "catalog=debug,axum=info,tower_http=info";

/// `RUST_LOG` picks the filter, `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.with_target(false).json().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let state = AppState::init().await?;
    if let Err(e) = sqlx::migrate!("./migrations").run(&state.db).await {
        tracing::warn!(error = %e, "migration failed; continuing with the existing schema");
    }

    let config = state.config.clone();
    app::serve(app::build_app(state), &config).await
}
