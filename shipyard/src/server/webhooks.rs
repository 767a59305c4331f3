//! CI webhook handler

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use shipyard_api::JobResponse;
use tracing::{debug, warn};

use crate::errors::ShipyardError;
use crate::server::state::ServerState;

/// Accept a CI build notification
///
/// With a webhook secret configured, a request carrying an `Authorization`
/// header is authenticated by its signature alone. Anything else falls back
/// to the normal API credentials.
pub async fn build_webhook_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ShipyardError> {
    let signature = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match (&state.verifier, signature) {
        (Some(verifier), Some(signature)) => {
            if !verifier.verify(&body, signature) {
                warn!("Rejected webhook with invalid signature");
                return Err(ShipyardError::Unauthorized);
            }
            debug!("Webhook signature verified");
        }
        _ => state.auth.authenticate(&headers).await?,
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| ShipyardError::invalid(format!("Invalid JSON payload: {}", e)))?;
    let job = state.webhooks.accept(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(JobResponse {
            job: job.into_summary(),
        }),
    ))
}
