//! Bearer-token session verification with an explicit allow-list of
//! unauthenticated routes.

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use super::{jwt, storage, storage::UserRecord};
use crate::{api::handlers::MessageResponse, cli::config::Config};

/// Routes reachable without a session token. Everything else requires a
/// valid bearer token.
pub const PUBLIC_ROUTES: &[&str] = &["/", "/health", "/auth/login", "/auth/register", "/subscribe"];

/// The authenticated principal, injected as a request extension once the
/// bearer token has been verified.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub email_verified: bool,
}

impl From<UserRecord> for AuthUser {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_active: user.is_active,
            email_verified: user.email_verified,
        }
    }
}

fn is_public(path: &str) -> bool {
    PUBLIC_ROUTES.contains(&path)
        || path.starts_with("/swagger-ui")
        || path.starts_with("/api-docs")
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(MessageResponse {
            success: false,
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Verify the bearer token, load the user behind it, and reject
/// deactivated accounts before the handler runs.
///
/// Runs before routing, so unmatched paths also get 401 rather than the
/// router's 404 unless they are on the allow-list.
pub async fn require_auth(mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if is_public(&path) {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(request.headers()) else {
        return unauthorized("Missing bearer token");
    };

    let (Some(config), Some(pool)) = (
        request.extensions().get::<Arc<Config>>().cloned(),
        request.extensions().get::<PgPool>().cloned(),
    ) else {
        error!("Auth middleware is missing config or pool extension");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let claims = match jwt::verify(&token, config.jwt_secret.expose_secret()) {
        Ok(claims) => claims,
        Err(err) => {
            warn!("Session token rejected: {err}");
            return unauthorized("Invalid or expired token");
        }
    };

    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        warn!("Session token carries a malformed subject");
        return unauthorized("Invalid or expired token");
    };

    match storage::find_user_by_id(&pool, user_id).await {
        Ok(Some(user)) if user.is_active => {
            request.extensions_mut().insert(AuthUser::from(user));
            next.run(request).await
        }
        Ok(Some(_)) => unauthorized("Account is deactivated"),
        Ok(None) => unauthorized("Invalid or expired token"),
        Err(err) => {
            error!("Failed to load user for session: {err:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse {
                    success: false,
                    message: "Authentication failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_public_allow_list() {
        assert!(is_public("/"));
        assert!(is_public("/health"));
        assert!(is_public("/auth/login"));
        assert!(is_public("/auth/register"));
        assert!(is_public("/subscribe"));
        assert!(is_public("/swagger-ui/index.html"));
        assert!(is_public("/api-docs/openapi.json"));

        assert!(!is_public("/auth/verify"));
        assert!(!is_public("/nope"));
        assert!(!is_public("/auth/refresh"));
        assert!(!is_public("/auth/logout"));
        assert!(!is_public("/auth/invite-tokens"));
        assert!(!is_public("/subscribe/subscribers"));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
