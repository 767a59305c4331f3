//! Authentication middleware

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::errors::ShipyardError;
use crate::server::state::ServerState;

/// Reject requests without a valid API key or session
pub async fn require_auth(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ShipyardError> {
    state.auth.authenticate(request.headers()).await?;
    Ok(next.run(request).await)
}
