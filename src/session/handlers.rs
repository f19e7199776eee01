use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use tracing::{info, instrument, warn};

use super::{
    errors::SessionError,
    extract::{extract_bearer, extract_cookie, REFRESH_COOKIE_NAME},
    types::{AccessClaims, LoginRequest, TokenPair, TokenResponse},
};
use crate::shared::{AppError, AppState};

const LOGOUT_MESSAGE: &str = "Successfully logged out";

/// Builds the success response shared by login and refresh: the access
/// token goes into the Authorization header, the refresh token into an
/// HTTP-only cookie, and both into the JSON body.
fn token_response(status: StatusCode, pair: &TokenPair, cookie_ttl: chrono::Duration) -> Response {
    let cookie_expires = Utc::now() + cookie_ttl;
    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; Expires={}; HttpOnly",
        REFRESH_COOKIE_NAME,
        pair.refresh_token,
        cookie_ttl.num_seconds(),
        cookie_expires.format("%a, %d %b %Y %H:%M:%S GMT"),
    );

    (
        status,
        [
            (header::AUTHORIZATION, format!("Bearer {}", pair.access_token)),
            (header::SET_COOKIE, cookie),
        ],
        Json(TokenResponse::from(pair)),
    )
        .into_response()
}

/// HTTP handler for creating a session
///
/// POST /login
/// Body `{"id": "<user id>"}`; returns a fresh token pair
#[instrument(name = "login", skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected login request body");
        AppError::BadRequest(rejection.body_text())
    })?;

    info!(user_id = %request.user_id, "Creating new session");

    let pair = state
        .session_service
        .login(&request.user_id)
        .await
        .map_err(|e| match e {
            SessionError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            other => AppError::UnprocessableEntity(other.to_string()),
        })?;

    info!(
        user_id = %pair.user_id,
        access_id = %pair.access_id,
        "Session created successfully"
    );

    Ok(token_response(StatusCode::OK, &pair, state.refresh_cookie_ttl))
}

/// HTTP handler for rotating a token pair
///
/// POST /refresh
/// Reads the refresh token from the `refresh_token` cookie
#[instrument(name = "refresh", skip(state, headers))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let refresh_token = extract_cookie(&headers, REFRESH_COOKIE_NAME);

    let pair = state
        .session_service
        .refresh(&refresh_token)
        .await
        .map_err(AppError::from)?;

    info!(user_id = %pair.user_id, "Session refreshed successfully");

    Ok(token_response(StatusCode::CREATED, &pair, state.refresh_cookie_ttl))
}

fn revocation_error(err: SessionError) -> AppError {
    match err {
        SessionError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
        other => AppError::Unauthorized(other.to_string()),
    }
}

/// HTTP handler for revoking the presented session
///
/// POST /logout
/// Needs the access token as bearer and the refresh token cookie
#[instrument(name = "logout", skip(state, headers))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<&'static str, AppError> {
    let access_token = extract_bearer(&headers);
    let refresh_token = extract_cookie(&headers, REFRESH_COOKIE_NAME);

    state
        .session_service
        .logout(&access_token, &refresh_token)
        .await
        .map_err(revocation_error)?;

    Ok(LOGOUT_MESSAGE)
}

/// HTTP handler for revoking every session of the caller
///
/// POST /logout-all
#[instrument(name = "logout_all", skip(state, headers))]
pub async fn logout_all(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<&'static str, AppError> {
    let access_token = extract_bearer(&headers);
    let refresh_token = extract_cookie(&headers, REFRESH_COOKIE_NAME);

    let deleted = state
        .session_service
        .logout_all(&access_token, &refresh_token)
        .await
        .map_err(revocation_error)?;

    info!(deleted, "Logged out of all sessions");
    Ok(LOGOUT_MESSAGE)
}

/// HTTP handler returning the claims of the validated access token
///
/// GET /session (behind `jwt_auth`)
pub async fn current_session(Extension(claims): Extension<AccessClaims>) -> Json<AccessClaims> {
    Json(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_router;
    use crate::session::repository::InMemorySessionRepository;
    use crate::session::token::tests::test_keys;
    use crate::session::types::RefreshClaims;
    use crate::shared::test_utils::{AppStateBuilder, FailingSessionRepository, SlowSessionRepository};
    use axum::{body::Body, http::Request, Router};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    fn test_app() -> Router {
        build_router(AppStateBuilder::new().build())
    }

    async fn login_request(app: &Router, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn read_tokens(response: Response) -> TokenResponse {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_with_tokens(uri: &str, access: Option<&str>, refresh: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(access) = access {
            builder = builder.header("authorization", format!("Bearer {}", access));
        }
        if let Some(refresh) = refresh {
            builder = builder.header("cookie", format!("refresh_token={}", refresh));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_login_handler() {
        let app = test_app();

        let response = login_request(&app, r#"{"id": "123123"}"#).await;
        assert_eq!(response.status(), StatusCode::OK);

        let auth_header = response.headers()[header::AUTHORIZATION]
            .to_str()
            .unwrap()
            .to_string();
        let cookie = response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("refresh_token="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));

        let tokens = read_tokens(response).await;
        assert_eq!(auth_header, format!("Bearer {}", tokens.access_token));
        assert!(cookie.contains(&tokens.refresh_token));
    }

    #[tokio::test]
    async fn test_login_invalid_payload() {
        let app = test_app();

        let response = login_request(&app, r#""invalid""#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_empty_user_id() {
        let app = test_app();

        let response = login_request(&app, r#"{"id": ""}"#).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_refresh_handler_rotates_once() {
        let app = test_app();
        let tokens = read_tokens(login_request(&app, r#"{"id": "u1"}"#).await).await;

        let response = app
            .clone()
            .oneshot(post_with_tokens("/refresh", None, Some(&tokens.refresh_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let rotated = read_tokens(response).await;
        assert_ne!(rotated.refresh_token, tokens.refresh_token);

        let replay = app
            .clone()
            .oneshot(post_with_tokens("/refresh", None, Some(&tokens.refresh_token)))
            .await
            .unwrap();
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_with_unusable_claims_is_422() {
        let app = test_app();
        let now = Utc::now();
        let claims = RefreshClaims {
            refresh_id: "not-a-uuid".to_string(),
            user_id: "u1".to_string(),
            exp: (now + chrono::Duration::days(1)).timestamp(),
            iat: now.timestamp(),
        };
        let token = test_keys().refresh.issue(&claims).unwrap();

        let response = app
            .clone()
            .oneshot(post_with_tokens("/refresh", None, Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let empty_user = RefreshClaims {
            refresh_id: uuid::Uuid::new_v4().to_string(),
            user_id: String::new(),
            ..claims
        };
        let token = test_keys().refresh.issue(&empty_user).unwrap();

        let response = app
            .oneshot(post_with_tokens("/refresh", None, Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_refresh_without_cookie() {
        let app = test_app();

        let response = app
            .oneshot(post_with_tokens("/refresh", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_store_timeout_is_503() {
        let state = AppStateBuilder::new()
            .with_session_repository(Arc::new(SlowSessionRepository::new(Duration::from_secs(5))))
            .with_store_timeout(Duration::from_millis(50))
            .build();
        let pair = state.session_service.create("u1").unwrap();
        let app = build_router(state);

        let response = app
            .oneshot(post_with_tokens("/refresh", None, Some(&pair.refresh_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_logout_handler() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let app = build_router(
            AppStateBuilder::new()
                .with_session_repository(repo.clone())
                .build(),
        );
        let tokens = read_tokens(login_request(&app, r#"{"id": "u1"}"#).await).await;
        assert_eq!(repo.session_count(), 1);

        let response = app
            .clone()
            .oneshot(post_with_tokens(
                "/logout",
                Some(&tokens.access_token),
                Some(&tokens.refresh_token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], LOGOUT_MESSAGE.as_bytes());
        assert_eq!(repo.session_count(), 0);

        let again = app
            .oneshot(post_with_tokens(
                "/logout",
                Some(&tokens.access_token),
                Some(&tokens.refresh_token),
            ))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_missing_bearer() {
        let app = test_app();
        let tokens = read_tokens(login_request(&app, r#"{"id": "u1"}"#).await).await;

        let response = app
            .oneshot(post_with_tokens("/logout", None, Some(&tokens.refresh_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_store_failure_is_503() {
        let state = AppStateBuilder::new()
            .with_session_repository(Arc::new(FailingSessionRepository))
            .build();
        let pair = state.session_service.create("u1").unwrap();
        let app = build_router(state);

        let response = app
            .oneshot(post_with_tokens(
                "/logout",
                Some(&pair.access_token),
                Some(&pair.refresh_token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_logout_all_handler() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let app = build_router(
            AppStateBuilder::new()
                .with_session_repository(repo.clone())
                .build(),
        );
        let first = read_tokens(login_request(&app, r#"{"id": "alice"}"#).await).await;
        let _second = read_tokens(login_request(&app, r#"{"id": "alice"}"#).await).await;
        let bob = read_tokens(login_request(&app, r#"{"id": "bob"}"#).await).await;

        let response = app
            .clone()
            .oneshot(post_with_tokens(
                "/logout-all",
                Some(&first.access_token),
                Some(&first.refresh_token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(repo.session_count(), 1);

        let bob_refresh = app
            .oneshot(post_with_tokens("/refresh", None, Some(&bob.refresh_token)))
            .await
            .unwrap();
        assert_eq!(bob_refresh.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_mixed_case_aliases_are_routed() {
        let app = test_app();

        let request = Request::builder()
            .method("POST")
            .uri("/Login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"id": "u1"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
