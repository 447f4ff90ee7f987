pub mod extractors;
pub mod handlers;
pub mod middleware;

use crate::models::Predictor;
use crate::prediction::triage::{
    ALERT_CONFIDENCE_THRESHOLD, CAUTION_MALIGNANT_THRESHOLD, TRIAGE_POLICY_VERSION,
};
use crate::prediction::ClassLabel;
use crate::utils::error::ClassifierError;
use crate::{Config, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

/// 所有处理器共享的状态，模型只加载一次
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(config: Config, predictor: Arc<Predictor>) -> Self {
        Self { config, predictor }
    }
}

pub async fn serve(config: Config, predictor: Arc<Predictor>) -> Result<()> {
    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        ClassifierError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    let app = create_app(AppState::new(config, Arc::clone(&predictor)));

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /predict        - Multipart image upload (field 'image')");
    tracing::info!("  POST /predict/base64 - JSON base64 upload");
    tracing::info!("  GET  /health         - Health check");
    tracing::info!("  GET  /api/info       - Service information");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        ClassifierError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ClassifierError::Internal(format!("Server failed: {}", e)))?;

    predictor.release();
    tracing::info!("Server stopped");
    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let server_config = state.config.server_config.clone();

    Router::new()
        .route("/predict", post(handlers::predict_upload_handler))
        .route("/predict/base64", post(handlers::predict_base64_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        // 由 RequestBodyLimitLayer 统一限制请求体大小
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(server_config.max_request_size))
        .layer(axum::middleware::from_fn_with_state(
            server_config.max_request_size,
            middleware::payload_too_large,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(server_config.request_timeout)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// 健康检查端点
///
/// 服务可达即返回200，模型是否就绪由 `model_loaded` 表示
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let model_loaded = state.predictor.health_check().is_ok();
    if !model_loaded {
        tracing::warn!("Health check: model not loaded");
    }

    Json(json!({
        "status": "healthy",
        "model_loaded": model_loaded,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 服务信息端点
async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.predictor.stats();
    let classes: Vec<&str> = ClassLabel::ALL.iter().map(|label| label.as_str()).collect();

    Json(json!({
        "service": "Skin Lesion Triage Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "model": stats,
        "classes": classes,
        "triage": {
            "policy_version": TRIAGE_POLICY_VERSION,
            "alert_confidence_threshold": ALERT_CONFIDENCE_THRESHOLD,
            "caution_malignant_threshold": CAUTION_MALIGNANT_THRESHOLD
        }
    }))
}
