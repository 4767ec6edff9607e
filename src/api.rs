//! REST API Server for the life insurance advisor
//!
//! Exposes the local estimate and the full recommendation cycle over HTTP.
//! API keys may be supplied per request; they are used for that request
//! only and never logged.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::advisor::Advisor;
use crate::audit::{profile_fingerprint, short_fingerprint};
use crate::config::{AdvisorConfig, Credentials};
use crate::coverage::calculate_coverage_at;
use crate::error::AdvisorError;
use crate::form::ProfileForm;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct CoverageRequest {
    pub profile: ProfileForm,
    pub discount_rate: Option<f64>,
}

#[derive(Deserialize)]
pub struct CredentialsPayload {
    pub openai_api_key: String,
    pub firecrawl_api_key: String,
    pub e2b_api_key: String,
}

#[derive(Deserialize)]
pub struct RecommendRequest {
    pub profile: ProfileForm,
    pub credentials: Option<CredentialsPayload>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn failure(err: AdvisorError) -> ApiResult {
    let status = match err {
        AdvisorError::InvalidForm { .. }
        | AdvisorError::InvalidDiscountRate(_)
        | AdvisorError::MissingCredential(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(err.to_string())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<AdvisorConfig>,
    /// Keys configured at server start, used when a request brings none
    pub credentials: Option<Arc<Credentials>>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Local Estimate Endpoint
/// =============================

async fn coverage_handler(
    State(state): State<ApiState>,
    Json(req): Json<CoverageRequest>,
) -> ApiResult {
    let profile = match req.profile.validate() {
        Ok(profile) => profile,
        Err(e) => return failure(e),
    };

    let rate = req.discount_rate.unwrap_or(state.config.discount_rate);
    match calculate_coverage_at(&profile, rate) {
        Ok(breakdown) => {
            let fingerprint = profile_fingerprint(&profile);
            info!(profile = %short_fingerprint(&fingerprint), "Coverage estimate served");
            (StatusCode::OK, Json(ApiResponse::success(breakdown)))
        }
        Err(e) => failure(e),
    }
}

/// =============================
/// Recommendation Endpoint
/// =============================

async fn recommend_handler(
    State(state): State<ApiState>,
    Json(req): Json<RecommendRequest>,
) -> ApiResult {
    let profile = match req.profile.validate() {
        Ok(profile) => profile,
        Err(e) => return failure(e),
    };

    let credentials = match (req.credentials, &state.credentials) {
        (Some(payload), _) => match Credentials::new(
            payload.openai_api_key,
            payload.firecrawl_api_key,
            payload.e2b_api_key,
        ) {
            Ok(credentials) => credentials,
            Err(e) => return failure(e),
        },
        (None, Some(configured)) => configured.as_ref().clone(),
        (None, None) => return failure(AdvisorError::MissingCredential("API keys")),
    };

    let advisor = match Advisor::with_credentials(&state.config, credentials) {
        Ok(advisor) => advisor,
        Err(e) => return failure(e),
    };

    match advisor.advise(&profile).await {
        Ok(report) => {
            let displayed = report.displayed_coverage();
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "coverage_amount": displayed,
                    "report": report,
                }))),
            )
        }
        Err(e) => failure(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(config: AdvisorConfig, credentials: Option<Credentials>) -> Router {
    let state = ApiState {
        config: Arc::new(config),
        credentials: credentials.map(Arc::new),
    };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/coverage", post(coverage_handler))
        .route("/api/recommend", post(recommend_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    config: AdvisorConfig,
    credentials: Option<Credentials>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let router = create_router(config, credentials);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
