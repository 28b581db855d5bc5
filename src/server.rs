use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;

use crate::api::{
    ApiCompareParams, ApiComparison, ApiHealth, ApiProductDetail, ApiProductList, ApiProductRow,
    ApiRecommendParams, ApiRecommendations, ApiReload, ApiSimulateRequest, ApiSimulation,
};
use catalog_intel::config::AppConfig;
use catalog_intel::insights::{build_report, DEFAULT_RISKY_LIMIT};
use catalog_intel::rules::{
    compare, explore, find_product, recommend, simulate_deal, ProductDetail, ProductFilter,
};
use catalog_intel::scoring::ScoringPipeline;
use catalog_intel::snapshot::{Snapshot, SnapshotStore};
use catalog_intel::Error;

type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    pipeline: Arc<ScoringPipeline>,
    store: Arc<SnapshotStore>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: ScoringPipeline, snapshot: Snapshot) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            store: Arc::new(SnapshotStore::new(snapshot)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/products", get(list_products))
        .route("/api/products/:id", get(product_detail))
        .route("/api/recommendations", get(recommendations))
        .route("/api/compare", get(compare_handler))
        .route("/api/simulate", post(simulate_handler))
        .route("/api/insights", get(insights))
        .route("/api/reload", post(reload))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, host: &str, port: u16) -> Result<(), Error> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|err| Error::Config(format!("invalid bind address: {}", err)))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| Error::io(addr.to_string(), err))?;
    tracing::info!(%addr, "serving catalog api");

    axum::serve(listener, router(state))
        .await
        .map_err(|err| Error::io(addr.to_string(), err))?;
    Ok(())
}

fn error_response(err: Error) -> ApiError {
    let status = match &err {
        Error::UnknownProduct(_) => StatusCode::NOT_FOUND,
        Error::InvalidSimulation(_) | Error::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (status, err.to_string())
}

async fn health(State(state): State<AppState>) -> Json<ApiHealth> {
    let snapshot = state.store.current().await;
    Json(ApiHealth {
        status: "ok",
        snapshot_id: snapshot.id.clone(),
        products: snapshot.products.len(),
    })
}

async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Json<ApiProductList> {
    let snapshot = state.store.current().await;
    let products: Vec<ApiProductRow> = explore(&snapshot.products, &filter)
        .into_iter()
        .map(ApiProductRow::from_product)
        .collect();
    Json(ApiProductList {
        snapshot_id: snapshot.id.clone(),
        count: products.len(),
        products,
    })
}

async fn product_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiProductDetail>, ApiError> {
    let snapshot = state.store.current().await;
    let product = find_product(&snapshot.products, &id)
        .ok_or_else(|| error_response(Error::UnknownProduct(id.clone())))?;
    Ok(Json(ApiProductDetail::from_detail(ProductDetail::new(product))))
}

async fn recommendations(
    State(state): State<AppState>,
    Query(params): Query<ApiRecommendParams>,
) -> Result<Json<ApiRecommendations>, ApiError> {
    let query = params
        .into_query()
        .map_err(|err| (StatusCode::BAD_REQUEST, err))?;
    let snapshot = state.store.current().await;
    let ranked = recommend(&snapshot.products, &query, &state.config.ranking);
    Ok(Json(ApiRecommendations::from_ranked(query.preference, &ranked)))
}

async fn compare_handler(
    State(state): State<AppState>,
    Query(params): Query<ApiCompareParams>,
) -> Result<Json<ApiComparison>, ApiError> {
    let snapshot = state.store.current().await;
    let lookup = |key: &str| {
        find_product(&snapshot.products, key)
            .ok_or_else(|| error_response(Error::UnknownProduct(key.to_string())))
    };
    let a = lookup(&params.a)?;
    let b = lookup(&params.b)?;
    let comparison = compare(a, b, &state.config.ranking.best_overall);
    Ok(Json(ApiComparison {
        a: ApiProductRow::from_product(a),
        b: ApiProductRow::from_product(b),
        comparison,
    }))
}

async fn simulate_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiSimulateRequest>,
) -> Result<Json<ApiSimulation>, ApiError> {
    let (product_id, input) = request.into_input();
    let snapshot = state.store.current().await;
    let product = find_product(&snapshot.products, &product_id)
        .ok_or_else(|| error_response(Error::UnknownProduct(product_id.clone())))?;
    let scaling = snapshot.value_scaling.as_ref().ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "catalog has no value bounds".to_string(),
        )
    })?;
    let outcome = simulate_deal(product, scaling, &input).map_err(error_response)?;
    Ok(Json(ApiSimulation {
        product: ApiProductRow::from_product(product),
        outcome,
    }))
}

#[derive(Debug, Deserialize)]
struct InsightsQuery {
    risky_limit: Option<usize>,
}

async fn insights(
    State(state): State<AppState>,
    Query(query): Query<InsightsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.store.current().await;
    let report = build_report(
        &snapshot.products,
        query.risky_limit.unwrap_or(DEFAULT_RISKY_LIMIT),
    );
    let payload = serde_json::to_value(&report)
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok(Json(payload))
}

/// Re-runs the pipeline over the configured input and swaps the result in.
/// Requests already holding the old snapshot finish against it.
async fn reload(State(state): State<AppState>) -> Result<Json<ApiReload>, ApiError> {
    let pipeline = Arc::clone(&state.pipeline);
    let input = state.config.pipeline.input.clone();
    let snapshot = tokio::task::spawn_blocking(move || Snapshot::build(&pipeline, &input))
        .await
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?
        .map_err(error_response)?;

    let snapshot_id = snapshot.id.clone();
    let products = snapshot.products.len();
    let report = snapshot.report.clone();
    let previous = state.store.replace(snapshot).await;
    Ok(Json(ApiReload {
        snapshot_id,
        previous_snapshot_id: previous.id.clone(),
        products,
        report,
    }))
}
