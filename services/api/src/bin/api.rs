//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        FileStorageAdapter, OpenAiExtractionAdapter, OpenAiPlanAdapter, OpenAiRecallAdapter,
    },
    config::Config,
    error::ApiError,
    web::{build_router, rest::ApiDoc, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let mut openai_config = OpenAIConfig::new().with_api_key(config.require_openai_api_key()?);
    if let Some(base_url) = &config.openai_base_url {
        openai_config = openai_config.with_api_base(base_url);
    }
    let openai_client = Client::with_config(openai_config);

    let storage = Arc::new(FileStorageAdapter::new(config.data_dir.clone()));
    info!("Persisting state under {}", storage.data_dir().display());

    let extraction_adapter = Arc::new(OpenAiExtractionAdapter::new(
        openai_client.clone(),
        config.extraction_model.clone(),
    ));
    let recall_adapter = Arc::new(OpenAiRecallAdapter::new(
        openai_client.clone(),
        config.recall_model.clone(),
    ));
    let plan_adapter = Arc::new(OpenAiPlanAdapter::new(
        openai_client,
        config.plan_model.clone(),
    ));

    // --- 3. Build the Shared AppState (loads the persisted store) ---
    let app_state = Arc::new(
        AppState::new(
            config.clone(),
            storage,
            extraction_adapter,
            recall_adapter,
            plan_adapter,
        )
        .await,
    );

    // --- 4. Create the Web Router ---
    // The dashboard is served from the same machine; only local origins may call in.
    let dashboard_origin = format!("http://localhost:{}", config.bind_address.port())
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(dashboard_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let api_router = build_router(app_state, config.max_upload_bytes).layer(cors);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
