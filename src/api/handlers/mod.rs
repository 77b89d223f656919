//! Route handlers and the shared response/error plumbing they use.

pub mod auth;
pub mod health;
pub mod invites;
pub mod subscribe;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Generic success/failure envelope shared by endpoints that only need to
/// report a message.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// A client-facing error with a stable message. Also used for 5xx responses
/// so internals never leak into the body.
pub(crate) fn client_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(MessageResponse {
            success: false,
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// axum handler for the root route
pub async fn root() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_root_names_the_service() {
        let body = root().await;
        assert!(body.starts_with(env!("CARGO_PKG_NAME")));
    }

    #[test]
    fn test_client_error_status() {
        let response = client_error(StatusCode::BAD_REQUEST, "Missing payload");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
