use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::session;
use crate::shared::AppState;

/// Builds the HTTP router with all session routes
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/session", get(session::current_session))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::jwt_auth,
        ));

    Router::new()
        .route("/login", post(session::login))
        .route("/refresh", post(session::refresh))
        .route("/logout", post(session::logout))
        .route("/logout-all", post(session::logout_all))
        // Mixed-case aliases used by older clients
        .route("/Login", post(session::login))
        .route("/Refresh", post(session::refresh))
        .route("/Logout", post(session::logout))
        .route("/LogoutAll", post(session::logout_all))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
