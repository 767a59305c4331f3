//! Channel registry handlers
//!
//! One set of handlers serves both channel types; the type parameter picks
//! the collection.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shipyard_api::{ChannelResponse, ChannelsResponse, DeletedResponse};

use crate::errors::ShipyardError;
use crate::registry::Registered;
use crate::server::state::ServerState;

pub async fn list_channels<C: Registered>(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, ShipyardError> {
    let channels = C::collection(&state.registry).list().await?;
    Ok(Json(ChannelsResponse { channels }))
}

pub async fn create_channel<C: Registered>(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<C>, JsonRejection>,
) -> Result<impl IntoResponse, ShipyardError> {
    let Json(channel) = body.map_err(|e| ShipyardError::invalid(e.body_text()))?;
    let channel = C::collection(&state.registry).create(channel).await?;
    Ok((StatusCode::CREATED, Json(ChannelResponse { channel })))
}

pub async fn update_channel<C: Registered>(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    body: Result<Json<C>, JsonRejection>,
) -> Result<impl IntoResponse, ShipyardError> {
    let Json(channel) = body.map_err(|e| ShipyardError::invalid(e.body_text()))?;
    let channel = C::collection(&state.registry).update(&id, channel).await?;
    Ok(Json(ChannelResponse { channel }))
}

pub async fn delete_channel<C: Registered>(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ShipyardError> {
    C::collection(&state.registry).delete(&id).await?;
    Ok(Json(DeletedResponse { deleted: true, id }))
}
