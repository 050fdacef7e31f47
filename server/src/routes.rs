use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use mitospace_shared::{DatasetListResponse, DatasetMetadataResponse, ErrorResponse};

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub datasets: Vec<String>,
}

fn not_found(id: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Dataset '{}' not found", id),
        }),
    )
}

/// GET /api/health - Health check with loaded dataset ids
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let datasets: Vec<String> = state.list_datasets().into_iter().map(|d| d.id).collect();

    Json(HealthResponse {
        status: "ok".to_string(),
        datasets,
    })
}

/// GET /api/datasets - List all loaded datasets
pub async fn list_datasets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let datasets = state.list_datasets();
    Json(DatasetListResponse { datasets })
}

/// GET /api/datasets/:id/info - Get dataset metadata
pub async fn get_dataset_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.get_dataset(&id) {
        Some(dataset) => Ok(Json(DatasetMetadataResponse {
            info: dataset.info.clone(),
        })),
        None => Err(not_found(&id)),
    }
}

/// GET /api/datasets/:id/points - Get the dataset document
pub async fn get_dataset_points(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.get_dataset(&id) {
        Some(dataset) => Ok((
            [(header::CONTENT_TYPE, "application/json")],
            dataset.body().to_string(),
        )),
        None => Err(not_found(&id)),
    }
}
