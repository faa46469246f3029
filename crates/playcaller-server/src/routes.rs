//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use playcaller_core::ModelName;
use playcaller_models::{compose_defense, predict_situation, FeatureFamily, ModelStatus};
use serde_json::{json, Value};
use std::time::Instant;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{debug, warn};

use crate::access::{self, AccessDecision};
use crate::auth;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::schema::{parse_situation, DefenseResponse, DisciplineResponse, OffenseResponse};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let predictions = Router::new()
        .route("/offense", post(predict_offense))
        .route("/defense", post(predict_defense))
        .route("/defense/:discipline", post(predict_discipline))
        .route_layer(middleware::from_fn_with_state(state.clone(), access::require_access));

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/models", get(models))
        .nest("/predictions", predictions)
        .nest("/auth", auth_routes)
        .fallback(fallback)
        .layer(RequestBodyLimitLayer::new(state.config.server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.server))
        .with_state(state)
}

/// CORS from the configured allow-list; `*` allows any origin
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if config.allowed_origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Playcaller API running",
    }))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics_handle {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed".to_string()),
    }
}

async fn models(State(state): State<AppState>) -> Json<Vec<ModelStatus>> {
    Json(state.registry.status())
}

fn record_request(route: &'static str, access: Option<&AccessDecision>) {
    metrics::counter!("playcaller_requests_total", "route" => route).increment(1);
    if let Some(decision) = access {
        debug!(route, caller = decision.label(), "Prediction request");
    }
}

fn record_latency(route: &'static str, start: Instant) {
    metrics::histogram!("playcaller_inference_latency_us", "route" => route)
        .record(start.elapsed().as_micros() as f64);
}

/// POST /predictions/offense
async fn predict_offense(
    State(state): State<AppState>,
    access: Option<axum::Extension<AccessDecision>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<OffenseResponse>, ApiError> {
    record_request("offense", access.as_deref());
    let input = parse_situation(payload, FeatureFamily::Offense)?;

    let start = Instant::now();
    let prediction = predict_situation(&state.registry, ModelName::Offense, &input)?;
    record_latency("offense", start);

    Ok(Json(prediction.into()))
}

/// POST /predictions/defense
async fn predict_defense(
    State(state): State<AppState>,
    access: Option<axum::Extension<AccessDecision>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DefenseResponse>, ApiError> {
    record_request("defense", access.as_deref());
    let input = parse_situation(payload, FeatureFamily::Defense)?;

    let start = Instant::now();
    let recommendation = compose_defense(&state.registry, &input)?;
    record_latency("defense", start);

    Ok(Json(recommendation.into()))
}

/// POST /predictions/defense/{pressure,coverage,front}
async fn predict_discipline(
    State(state): State<AppState>,
    Path(discipline): Path<String>,
    access: Option<axum::Extension<AccessDecision>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DisciplineResponse>, ApiError> {
    let model = discipline
        .parse::<ModelName>()
        .ok()
        .filter(ModelName::is_defensive)
        .ok_or_else(|| ApiError::NotFound(format!("unknown defensive discipline '{}'", discipline)))?;

    let route = model.as_str();
    record_request(route, access.as_deref());
    let input = parse_situation(payload, FeatureFamily::Defense)?;

    let start = Instant::now();
    let prediction = predict_situation(&state.registry, model, &input)?;
    record_latency(route, start);

    Ok(Json(DisciplineResponse { prediction }))
}

async fn fallback() -> ApiError {
    ApiError::NotFound("route not found".to_string())
}
