//! Axum server and routes.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use social_recommend::{RecommendError, RecommenderRegistry, RegistryError};
use social_types::{
    AddUserRequest, Algorithm, FollowRequest, GraphResponse, GraphStore, GraphStoreError,
    InteractRequest, InteractResponse, InteractionEvent, InteractionKind, MessageResponse,
    RecommendResponse, SweepStatusResponse,
};
use social_weights::{DecayScheduler, WeightError, WeightModel};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub const DEFAULT_LIMIT: i64 = 10;

pub struct AppState {
    pub store: Arc<dyn GraphStore>,
    pub registry: Arc<RecommenderRegistry>,
    pub weights: Arc<WeightModel>,
    pub scheduler: Arc<dyn DecayScheduler>,
    pub default_algorithm: Algorithm,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/recommend/:user", get(handle_recommend))
        .route("/api/interact", post(handle_interact))
        .route("/api/follow", post(handle_follow))
        .route("/api/user", post(handle_add_user))
        .route("/api/graph", get(handle_graph))
        .route("/api/graph/decay", post(handle_decay))
        .route("/api/graph/decay/status", get(handle_decay_status))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn store_code(e: &GraphStoreError) -> i32 {
    if e.is_unavailable() {
        503
    } else {
        500
    }
}

fn weight_code(e: &WeightError) -> i32 {
    match e {
        WeightError::InvalidWeight(_) => 400,
        WeightError::Store(inner) => store_code(inner),
    }
}

fn registry_code(e: &RegistryError) -> i32 {
    match e {
        RegistryError::InvalidAlgorithm(_) | RegistryError::Unsupported { .. } => 400,
        RegistryError::Store(inner) => store_code(inner),
    }
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is required", field))
    } else {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

async fn handle_recommend(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    query: Result<Query<RecommendQuery>, QueryRejection>,
) -> Json<RecommendResponse> {
    let q = match query {
        Ok(Query(q)) => q,
        Err(e) => return Json(RecommendResponse::error(400, e.body_text())),
    };
    let recommender = match q.algorithm.as_deref() {
        Some(name) => state.registry.resolve(name),
        None => state.registry.get_recommender(state.default_algorithm),
    };
    let recommender = match recommender {
        Ok(r) => r,
        Err(e) => return Json(RecommendResponse::error(registry_code(&e), e.to_string())),
    };
    let limit = usize::try_from(q.limit.unwrap_or(DEFAULT_LIMIT)).unwrap_or(0);
    match recommender.recommend(&user, limit).await {
        Ok(list) => {
            tracing::info!(
                user = %user,
                algorithm = recommender.tag(),
                results = list.len(),
                "recommendations served"
            );
            Json(RecommendResponse::ok(list))
        }
        Err(RecommendError::Store(e)) => {
            tracing::warn!(user = %user, error = %e, "recommendation failed");
            Json(RecommendResponse::error(store_code(&e), e.to_string()))
        }
    }
}

async fn handle_interact(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InteractRequest>, JsonRejection>,
) -> Json<InteractResponse> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => return Json(InteractResponse::error(400, e.body_text())),
    };
    if let Err(msg) = require("from", &req.from).and_then(|_| require("to", &req.to)) {
        return Json(InteractResponse::error(400, msg));
    }
    let kind = match req.kind.parse::<InteractionKind>() {
        Ok(k) => k,
        Err(e) => return Json(InteractResponse::error(400, e.to_string())),
    };
    let event = InteractionEvent::new(req.from, req.to, kind);
    match state.weights.update_weight_based_on_interaction(&event).await {
        Ok(change) => Json(InteractResponse::ok(change)),
        Err(e) => Json(InteractResponse::error(weight_code(&e), e.to_string())),
    }
}

async fn handle_follow(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FollowRequest>, JsonRejection>,
) -> Json<MessageResponse> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => return Json(MessageResponse::error(400, e.body_text())),
    };
    if let Err(msg) = require("from", &req.from).and_then(|_| require("to", &req.to)) {
        return Json(MessageResponse::error(400, msg));
    }
    match state.weights.set_weight(&req.from, &req.to, req.weight).await {
        Ok(weight) => {
            tracing::info!(from = %req.from, to = %req.to, weight, "edge weight set");
            Json(MessageResponse::ok(serde_json::json!({
                "from": req.from,
                "to": req.to,
                "weight": weight,
            })))
        }
        Err(e) => Json(MessageResponse::error(weight_code(&e), e.to_string())),
    }
}

async fn handle_add_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddUserRequest>, JsonRejection>,
) -> Json<MessageResponse> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => return Json(MessageResponse::error(400, e.body_text())),
    };
    if let Err(msg) = require("name", &req.name) {
        return Json(MessageResponse::error(400, msg));
    }
    match state.store.add_user(&req.name).await {
        Ok(()) => Json(MessageResponse::ok(serde_json::json!({ "name": req.name }))),
        Err(e) => Json(MessageResponse::error(store_code(&e), e.to_string())),
    }
}

async fn handle_graph(State(state): State<Arc<AppState>>) -> Json<GraphResponse> {
    match state.store.export_edges().await {
        Ok(edges) => Json(GraphResponse::ok(edges)),
        Err(e) => Json(GraphResponse::error(store_code(&e), e.to_string())),
    }
}

async fn handle_decay(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    match state.scheduler.submit_sweep().await {
        Ok(task_id) => {
            tracing::info!(task_id = %task_id, "decay sweep submitted");
            Json(MessageResponse {
                code: 200,
                message: "Decay sweep submitted".to_string(),
                data: Some(serde_json::json!({ "task_id": task_id })),
            })
        }
        Err(e) => Json(MessageResponse::error(500, e.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct DecayStatusQuery {
    #[serde(default)]
    pub task_id: Option<String>,
}

async fn handle_decay_status(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DecayStatusQuery>, QueryRejection>,
) -> Json<SweepStatusResponse> {
    let q = match query {
        Ok(Query(q)) => q,
        Err(e) => return Json(SweepStatusResponse::error(400, e.body_text())),
    };
    let task_id = match &q.task_id {
        Some(t) if !t.trim().is_empty() => t.as_str(),
        _ => return Json(SweepStatusResponse::error(400, "task_id is required")),
    };
    match state.scheduler.get_status(task_id).await {
        Ok(Some(job)) => Json(SweepStatusResponse::ok(job)),
        Ok(None) => Json(SweepStatusResponse::error(404, "Job not found")),
        Err(e) => Json(SweepStatusResponse::error(500, e.to_string())),
    }
}

async fn handle_health() -> &'static str {
    "ok"
}
