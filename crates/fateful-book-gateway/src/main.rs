//! Fateful Book Gateway — HTTP boundary for diagnosis, counseling sessions and prescriptions.
//! Provider keys stay server-side; the text generator is chosen once at startup.

mod api;
mod error;
mod state;

use std::sync::Arc;
use std::time::Duration;

use fateful_book_core::{
    select_generator, CounselingService, CoverLookup, GatewayConfig, GoogleBooksCovers, NoCovers, PrescriptionLedger,
    ProviderKeys,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::state::{AppState, SessionTtl};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("[SYSTEM] Gateway stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::load()?;
    tracing::info!(
        "[SYSTEM] Fateful Book {} | turns {}..={}",
        fateful_book_core::version(),
        config.min_turns,
        config.max_turns
    );

    let generator = select_generator(&config, &ProviderKeys::from_env())?;

    let covers: Arc<dyn CoverLookup> = if config.covers_enabled {
        Arc::new(GoogleBooksCovers::new()?)
    } else {
        Arc::new(NoCovers)
    };

    let mut counsel = CounselingService::new(generator, covers, config.reply_shape());
    match PrescriptionLedger::open(&config.ledger_path) {
        Ok(ledger) => counsel = counsel.with_ledger(Arc::new(ledger)),
        Err(e) => tracing::warn!("[SYSTEM] Ledger at {} unavailable, history disabled: {}", config.ledger_path, e),
    }

    let ttl = SessionTtl {
        idle: config.session_idle_ttl(),
        finished: config.session_finished_ttl(),
    };
    let state = Arc::new(AppState::with_ttl(counsel, config.turn_limits(), ttl));
    state::spawn_sweeper(Arc::clone(&state), SESSION_SWEEP_INTERVAL);
    let app = api::router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("[SYSTEM] Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
