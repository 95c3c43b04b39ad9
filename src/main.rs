use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use qa_chat_relay::config::{Cli, Settings, API_KEY_ENV};
use qa_chat_relay::provider::groq::GroqClient;
use qa_chat_relay::server::api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "qa_chat_relay=debug,tower_http=debug"
    } else {
        "qa_chat_relay=info,tower_http=info"
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }

    info!("qa-chat-relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let settings = Arc::new(Settings::load(&cli.env_file));

    if settings.api_key.is_none() {
        warn!("{API_KEY_ENV} is not set; /chat will answer with a configuration error");
    }

    let provider = Arc::new(GroqClient::new(settings.api_url.clone()));

    info!(
        model = %settings.model,
        api_url = %provider.api_url(),
        "Configuration loaded"
    );

    // Build application state.
    let state = Arc::new(AppState { settings, provider });

    // Build the HTTP router.
    let app = build_router(state);

    // Start the server.
    let listen_addr = cli.listen;
    info!(addr = listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
