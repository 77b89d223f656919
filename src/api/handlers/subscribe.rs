//! Mailing-list subscribe endpoint plus a guarded listing of subscribers.

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{error, Instrument};
use utoipa::ToSchema;

use super::{client_error, MessageResponse};
use crate::api::email;

#[derive(ToSchema, Deserialize, Debug)]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct Subscriber {
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct SubscriberListResponse {
    pub success: bool,
    pub subscribers: Vec<Subscriber>,
}

/// Add an email to the mailing list. Re-subscribing is not an error.
#[utoipa::path(
    post,
    path = "/subscribe",
    request_body = SubscribeRequest,
    responses(
        (status = 200, description = "Subscribed (or already subscribed)", body = MessageResponse),
        (status = 400, description = "Invalid email", body = MessageResponse),
        (status = 500, description = "Subscription failed", body = MessageResponse)
    ),
    tag = "subscribe"
)]
pub async fn subscribe(
    Extension(pool): Extension<PgPool>,
    payload: Option<Json<SubscribeRequest>>,
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
            "Disposable email addresses are not allowed.",
        );
    }

    let normalized = email::normalize_email(&payload.email);
    match insert_subscriber(&pool, &normalized).await {
        Ok(true) => (
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "Subscription confirmed".to_string(),
            }),
        )
            .into_response(),
        Ok(false) => (
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "Already subscribed".to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Subscription insert failed: {err:?}");
            client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Subscription failed. Please try again.",
            )
        }
    }
}

/// List subscribers, newest first. Guarded route.
#[utoipa::path(
    get,
    path = "/subscribe/subscribers",
    responses(
        (status = 200, description = "Current subscribers", body = SubscriberListResponse),
        (status = 401, description = "Invalid or expired token", body = MessageResponse),
        (status = 500, description = "Listing failed", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "subscribe"
)]
pub async fn subscribers(Extension(pool): Extension<PgPool>) -> Response {
    match list_subscribers(&pool).await {
        Ok(subscribers) => (
            StatusCode::OK,
            Json(SubscriberListResponse {
                success: true,
                subscribers,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Subscriber listing failed: {err:?}");
            client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list subscribers",
            )
        }
    }
}

/// Insert a subscriber; false when the email was already on the list.
async fn insert_subscriber(pool: &PgPool, email: &str) -> Result<bool> {
    let query = r"
        INSERT INTO subscribers (email)
        VALUES ($1)
        ON CONFLICT DO NOTHING
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(email)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert subscriber")?;

    Ok(result.rows_affected() > 0)
}

async fn list_subscribers(pool: &PgPool) -> Result<Vec<Subscriber>> {
    let query = r"
        SELECT email, created_at
        FROM subscribers
        WHERE confirmed
        ORDER BY created_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list subscribers")?;

    Ok(rows
        .iter()
        .map(|row| Subscriber {
            email: row.get("email"),
            subscribed_at: row.get("created_at"),
        })
        .collect())
}
