//! Database helpers for user records.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use crate::api::handlers::invites;

/// A persisted user. The password hash never leaves this layer except for
/// credential verification.
#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) is_active: bool,
    pub(crate) email_verified: bool,
}

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(crate) enum CreateUserOutcome {
    Created(UserRecord),
    Conflict,
}

/// Outcome of the registration transaction.
#[derive(Debug)]
pub(crate) enum RegistrationOutcome {
    Registered(UserRecord),
    DuplicateEmail,
    /// The invite token was deactivated, exhausted, or consumed by a
    /// concurrent registration after validation.
    TokenUnavailable,
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        is_active: row.get("is_active"),
        email_verified: row.get("email_verified"),
    }
}

/// Case-insensitive lookup; the stored email keeps its original case.
pub(crate) async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = r"
        SELECT id, email, password_hash, is_active, email_verified
        FROM users
        WHERE LOWER(email) = LOWER($1)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.as_ref().map(record_from_row))
}

pub(crate) async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
    let query = r"
        SELECT id, email, password_hash, is_active, email_verified
        FROM users
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.as_ref().map(record_from_row))
}

/// Insert a new user. The caller must have hashed the password already.
///
/// A unique violation on the email maps to `Conflict` so the registration
/// race (two requests passing the existence check) surfaces as a duplicate
/// account rather than an internal error.
pub(crate) async fn create_user<'e, E>(
    executor: E,
    email: &str,
    password_hash: &str,
) -> Result<CreateUserOutcome>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = r"
        INSERT INTO users (email, password_hash)
        VALUES ($1, $2)
        RETURNING id, email, password_hash, is_active, email_verified
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .fetch_one(executor)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(CreateUserOutcome::Created(record_from_row(&row))),
        Err(err) => {
            if is_unique_violation(&err) {
                return Ok(CreateUserOutcome::Conflict);
            }
            Err(err).context("failed to insert user")
        }
    }
}

/// Create the user and consume one use of the invite token in a single
/// transaction.
///
/// The conditional token update takes a row lock, so of two concurrent
/// registrations racing for the last use of a token exactly one commits;
/// the other rolls back its user row and reports `TokenUnavailable`. A
/// failed registration never leaves a consumed token behind.
pub(crate) async fn register_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    invite_token: &str,
) -> Result<RegistrationOutcome> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to begin registration transaction")?;

    let user = match create_user(&mut *tx, email, password_hash).await? {
        CreateUserOutcome::Created(user) => user,
        CreateUserOutcome::Conflict => {
            tx.rollback()
                .await
                .context("failed to roll back registration")?;
            return Ok(RegistrationOutcome::DuplicateEmail);
        }
    };

    if !invites::storage::mark_used(&mut *tx, invite_token).await? {
        tx.rollback()
            .await
            .context("failed to roll back registration")?;
        return Ok(RegistrationOutcome::TokenUnavailable);
    }

    tx.commit()
        .await
        .context("failed to commit registration")?;

    Ok(RegistrationOutcome::Registered(user))
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unique_violation_ignores_other_errors() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolClosed));
    }
}
