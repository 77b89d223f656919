//! Registration, login, and session endpoints.
//!
//! Registration is gated by an invite token. The token is validated before
//! any account work happens and consumed only after the account row exists,
//! so a failed registration never burns a use.

pub mod guard;
pub mod jwt;
pub mod password;
pub(crate) mod storage;
pub mod types;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

use self::{
    guard::AuthUser,
    storage::RegistrationOutcome,
    types::{
        LoginRequest, LoginResponse, RefreshResponse, RegisterRequest, RegisterResponse,
        UserSummary, VerifiedUser, VerifyResponse,
    },
};
use super::{client_error, invites, MessageResponse};
use crate::{api::email, cli::config::Config};

/// Authenticate with email and password, returning an access/refresh
/// token pair.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing payload", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse),
        (status = 500, description = "Login failed", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<Config>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        return client_error(StatusCode::BAD_REQUEST, "Missing payload");
    };

    let user = match storage::find_user_by_email(&pool, &payload.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return client_error(StatusCode::UNAUTHORIZED, "Invalid email or password");
        }
        Err(err) => {
            error!("Login lookup failed: {err:?}");
            return client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed. Please try again.",
            );
        }
    };

    if !password::verify_password(&payload.password, &user.password_hash) {
        return client_error(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }

    if !user.is_active {
        return client_error(StatusCode::UNAUTHORIZED, "Account is deactivated");
    }

    let secret = config.jwt_secret.expose_secret();
    let access = jwt::SessionClaims::new(user.id, &user.email, jwt::ACCESS_TOKEN_TTL_SECONDS);
    let refresh = jwt::SessionClaims::new(user.id, &user.email, jwt::REFRESH_TOKEN_TTL_SECONDS);

    match (jwt::sign(&access, secret), jwt::sign(&refresh, secret)) {
        (Ok(access_token), Ok(refresh_token)) => (
            StatusCode::OK,
            Json(LoginResponse {
                success: true,
                access_token,
                refresh_token,
                user: UserSummary {
                    id: user.id.to_string(),
                    email: user.email,
                },
            }),
        )
            .into_response(),
        (Err(err), _) | (_, Err(err)) => {
            error!("Failed to sign session tokens: {err}");
            client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed. Please try again.",
            )
        }
    }
}

/// Create an account. Requires a usable invite token.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid input, invite token, or duplicate account", body = MessageResponse),
        (status = 500, description = "Registration failed", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(pool): Extension<PgPool>,
    payload: Option<Json<RegisterRequest>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        return client_error(StatusCode::BAD_REQUEST, "Missing payload");
    };

    if !email::valid_email(&payload.email) {
        return client_error(
            StatusCode::BAD_REQUEST,
            "Please provide a valid email address",
        );
    }

    if email::is_disposable_email(&payload.email) {
        return client_error(
            StatusCode::BAD_REQUEST,
            "Disposable email addresses are not allowed",
        );
    }

    match invites::storage::validate_token(&pool, &payload.token).await {
        Ok(true) => {}
        Ok(false) => {
            return client_error(StatusCode::BAD_REQUEST, "Invalid or expired invite token");
        }
        Err(err) => {
            error!("Invite token validation failed: {err:?}");
            return client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed. Please try again.",
            );
        }
    }

    match storage::find_user_by_email(&pool, &payload.email).await {
        Ok(None) => {}
        Ok(Some(_)) => {
            return client_error(
                StatusCode::BAD_REQUEST,
                "An account with this email already exists",
            );
        }
        Err(err) => {
            error!("Registration lookup failed: {err:?}");
            return client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed. Please try again.",
            );
        }
    }

    if !password::is_password_strong(&payload.password) {
        return client_error(
            StatusCode::BAD_REQUEST,
            "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character",
        );
    }

    let password_hash = match password::hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Password hashing failed: {err:?}");
            return client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed. Please try again.",
            );
        }
    };

    let normalized = email::normalize_email(&payload.email);
    match storage::register_user(&pool, &normalized, &password_hash, &payload.token).await {
        Ok(outcome) => registration_response(outcome),
        Err(err) => {
            error!("Registration transaction failed: {err:?}");
            client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed. Please try again.",
            )
        }
    }
}

/// Map the transactional registration outcome to a response. Both failure
/// arms roll the user row back in storage, so they report client errors.
fn registration_response(outcome: RegistrationOutcome) -> Response {
    match outcome {
        RegistrationOutcome::Registered(user) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                success: true,
                message: "Account created successfully".to_string(),
                user: UserSummary {
                    id: user.id.to_string(),
                    email: user.email,
                },
            }),
        )
            .into_response(),
        // Two requests raced past the existence check; the unique index is
        // the authority.
        RegistrationOutcome::DuplicateEmail => client_error(
            StatusCode::BAD_REQUEST,
            "An account with this email already exists",
        ),
        RegistrationOutcome::TokenUnavailable => {
            warn!("Invite token became unusable during registration");
            client_error(StatusCode::BAD_REQUEST, "Invalid or expired invite token")
        }
    }
}

/// Report the user behind the presented bearer token.
#[utoipa::path(
    post,
    path = "/auth/verify",
    responses(
        (status = 200, description = "Token is valid", body = VerifyResponse),
        (status = 401, description = "Invalid or expired token", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn verify(Extension(user): Extension<AuthUser>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user: VerifiedUser {
            id: user.id.to_string(),
            email: user.email,
            is_active: user.is_active,
            email_verified: user.email_verified,
        },
    })
}

/// Mint a fresh access token from a still-valid session token.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Invalid or expired token", body = MessageResponse),
        (status = 500, description = "Refresh failed", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn refresh(
    Extension(config): Extension<Arc<Config>>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    let claims = jwt::SessionClaims::new(user.id, &user.email, jwt::ACCESS_TOKEN_TTL_SECONDS);
    match jwt::sign(&claims, config.jwt_secret.expose_secret()) {
        Ok(access_token) => (
            StatusCode::OK,
            Json(RefreshResponse {
                success: true,
                access_token,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to sign refreshed access token: {err}");
            client_error(StatusCode::INTERNAL_SERVER_ERROR, "Token refresh failed")
        }
    }
}

/// Acknowledge logout. Tokens are stateless and simply age out; clients
/// drop their copies.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Invalid or expired token", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(Extension(_user): Extension<AuthUser>) -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::UserRecord;
    use uuid::Uuid;

    fn user() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            password_hash: "hash".to_string(),
            is_active: true,
            email_verified: false,
        }
    }

    #[test]
    fn test_registration_success_is_created() {
        let response = registration_response(RegistrationOutcome::Registered(user()));
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_registration_duplicate_email_is_bad_request() {
        let response = registration_response(RegistrationOutcome::DuplicateEmail);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // A registration that loses the race for a token's last use must be
    // rejected, not admitted with a warning.
    #[test]
    fn test_registration_lost_token_race_is_rejected() {
        let response = registration_response(RegistrationOutcome::TokenUnavailable);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
