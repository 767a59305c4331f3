//! Job handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shipyard_api::{
    ClearQueueQuery, ItemsRemovedResponse, JobResponse, JobsResponse, SubmitJobRequest,
};

use crate::errors::ShipyardError;
use crate::queue::QueueName;
use crate::server::state::ServerState;

/// Submit a filesystem job
pub async fn create_job(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ShipyardError> {
    let Json(request) = body.map_err(|e| ShipyardError::invalid(e.body_text()))?;
    let job = state.gateway.submit(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(JobResponse {
            job: job.into_summary(),
        }),
    ))
}

/// All four queues
pub async fn list_jobs(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, ShipyardError> {
    let jobs = state.queues.list_all().await?;
    Ok(Json(JobsResponse { jobs }))
}

/// Remove every job from one queue
pub async fn clear_queue(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ClearQueueQuery>,
) -> Result<impl IntoResponse, ShipyardError> {
    let queue: QueueName = query
        .queue
        .as_deref()
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ShipyardError::invalid("Queue name is required"))?
        .parse()?;
    let items_removed = state.queues.clear(queue).await?;
    Ok(Json(ItemsRemovedResponse { items_removed }))
}
