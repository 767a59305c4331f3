//! Webhook mapping handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shipyard_api::{DeletedResponse, MappingResponse, MappingsResponse};

use crate::errors::ShipyardError;
use crate::models::mapping::WebhookMapping;
use crate::server::state::ServerState;

pub async fn list_mappings(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, ShipyardError> {
    let mappings = state.registry.mappings.list().await?;
    Ok(Json(MappingsResponse { mappings }))
}

pub async fn create_mapping(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<WebhookMapping>, JsonRejection>,
) -> Result<impl IntoResponse, ShipyardError> {
    let Json(mapping) = body.map_err(|e| ShipyardError::invalid(e.body_text()))?;
    let mapping = state.registry.mappings.create(mapping).await?;
    Ok((StatusCode::CREATED, Json(MappingResponse { mapping })))
}

pub async fn update_mapping(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    body: Result<Json<WebhookMapping>, JsonRejection>,
) -> Result<impl IntoResponse, ShipyardError> {
    let Json(mapping) = body.map_err(|e| ShipyardError::invalid(e.body_text()))?;
    let mapping = state.registry.mappings.update(&id, mapping).await?;
    Ok(Json(MappingResponse { mapping }))
}

pub async fn delete_mapping(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ShipyardError> {
    state.registry.mappings.delete(&id).await?;
    Ok(Json(DeletedResponse { deleted: true, id }))
}
