//! Worldsmith server
//!
//! Streams worldbuilding assistant turns over server-sent events.

use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worldsmith::api::{create_router, AppState};
use worldsmith::bridge::{CommandBridge, DemoBridge, TimeoutBridge, ToolBridge};
use worldsmith::config::ServerConfig;
use worldsmith::turn::{TurnConfig, TurnExecutor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worldsmith=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Tool bridge
    let bridge: Arc<dyn ToolBridge> =
        match config.tool_command.as_deref().and_then(CommandBridge::from_command_line) {
            Some(command) => {
                tracing::info!(command = ?config.tool_command, "Using external tool command");
                Arc::new(command)
            }
            None => {
                tracing::info!(worlds_dir = %config.worlds_dir.display(), "No tool command configured, using demo bridge");
                Arc::new(DemoBridge::new(config.worlds_dir.clone()))
            }
        };
    let bridge: Arc<dyn ToolBridge> = Arc::new(TimeoutBridge::new(bridge, config.tool_timeout));

    // LLM
    let llm = config.llm.connect()?;
    match &llm {
        Some(service) => tracing::info!(model = %service.model_id(), "LLM service initialized"),
        None => tracing::warn!("No LLM API key configured. Set ANTHROPIC_API_KEY or LLM_GATEWAY."),
    }

    let executor = TurnExecutor::new(
        llm,
        bridge,
        TurnConfig::default().with_max_tool_rounds(config.max_tool_rounds),
    );

    let cors = match &config.allowed_origins {
        Some(origins) => {
            let origins = origins
                .iter()
                .map(|origin| HeaderValue::from_str(origin))
                .collect::<Result<Vec<_>, _>>()?;
            CorsLayer::new().allow_origin(AllowOrigin::list(origins))
        }
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(AppState::new(executor))
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Stop accepting connections on ctrl-c; open turn streams are dropped
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
            }
            shutdown.cancel();
        }
    });

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Worldsmith server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    Ok(())
}
