/// Access control middleware
///
/// Attached with `route_layer` to every protected route. It maps the matched
/// route template and method to an [`Operation`], runs the gate, and on
/// success stores the resulting [`AuthContext`] in request extensions for
/// handlers to pick up with `Extension<AuthContext>`.
///
/// A protected route with no entry in the operation table is refused with
/// 403 rather than let through.
///
/// [`AuthContext`]: tasktrack_shared::auth::gate::AuthContext

use axum::{
    extract::{MatchedPath, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tasktrack_shared::auth::gate::Operation;
use tracing::{debug, warn};

use crate::{app::AppState, error::ApiError};

pub async fn access_gate_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let operation = req
        .extensions()
        .get::<MatchedPath>()
        .and_then(|route| Operation::resolve(req.method().as_str(), route.as_str()))
        .ok_or_else(|| {
            warn!(method = %req.method(), uri = %req.uri(), "No access rule for route");
            ApiError::Forbidden("No access rule for this route".to_string())
        })?;

    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let ctx = state.gate.authorize(authorization, operation).await?;
    debug!(user_id = %ctx.user_id, %operation, "Request authorized");

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
