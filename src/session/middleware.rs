use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::extract::extract_bearer;
use crate::shared::{AppError, AppState};

/// Access token authentication middleware - validates the Authorization header
/// statelessly and adds AccessClaims to the request.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), session::jwt_auth))
/// Handlers can then extract Extension(claims): Extension<AccessClaims>.
#[instrument(skip(state, req, next))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer(req.headers());
    if token.is_empty() {
        warn!(uri = %req.uri(), "Missing or malformed Authorization header");
        return Err(AppError::Unauthorized(
            "Missing authorization header".to_string(),
        ));
    }

    let claims = state.session_service.validate(&token).map_err(|e| {
        warn!("Access token authentication failed: {}", e);
        AppError::Unauthorized("Invalid or expired access token".to_string())
    })?;

    debug!(
        user_id = %claims.user_id,
        access_id = %claims.access_id,
        "Authentication successful, adding claims to request"
    );

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
