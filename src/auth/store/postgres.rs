//! PostgreSQL credential store (see `sql/schema.sql`).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{CredentialStore, RefreshTokenUpdate, StoreFuture, UserCredential};

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> UserCredential {
    UserCredential {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        email_confirmed: row.get("email_confirmed"),
        roles: row.get("roles"),
        refresh_token_hash: row.get("refresh_token_hash"),
        refresh_token_expires_at: row.get("refresh_token_expires_at"),
    }
}

impl CredentialStore for PgCredentialStore {
    fn find_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<UserCredential>> {
        Box::pin(async move {
            let query = r"
                SELECT id, email, password_hash, email_confirmed, roles,
                       refresh_token_hash, refresh_token_expires_at
                FROM users
                WHERE email = $1
            ";
            let row = sqlx::query(query)
                .bind(email)
                .fetch_optional(&self.pool)
                .instrument(db_span("SELECT", query))
                .await
                .context("failed to lookup user by email")?;

            Ok(row.as_ref().map(user_from_row))
        })
    }

    fn set_refresh_token<'a>(
        &'a self,
        user_id: Uuid,
        token_hash: &'a [u8],
        expires_at: DateTime<Utc>,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let query = r"
                UPDATE users
                SET refresh_token_hash = $2,
                    refresh_token_expires_at = $3,
                    updated_at = NOW()
                WHERE id = $1
            ";
            let result = sqlx::query(query)
                .bind(user_id)
                .bind(token_hash)
                .bind(expires_at)
                .execute(&self.pool)
                .instrument(db_span("UPDATE", query))
                .await
                .context("failed to store refresh token")?;

            Ok(result.rows_affected() == 1)
        })
    }

    fn rotate_refresh_token<'a>(
        &'a self,
        update: RefreshTokenUpdate<'a>,
    ) -> StoreFuture<'a, Option<UserCredential>> {
        Box::pin(async move {
            // Check and set in one statement: a concurrent rotation of the same token
            // re-evaluates the WHERE clause after the first commits and matches nothing.
            let query = r"
                UPDATE users
                SET refresh_token_hash = $2,
                    refresh_token_expires_at = $3,
                    updated_at = NOW()
                WHERE refresh_token_hash = $1
                  AND refresh_token_expires_at > $4
                RETURNING id, email, password_hash, email_confirmed, roles,
                          refresh_token_hash, refresh_token_expires_at
            ";
            let row = sqlx::query(query)
                .bind(update.presented_hash)
                .bind(update.new_hash)
                .bind(update.new_expires_at)
                .bind(update.now)
                .fetch_optional(&self.pool)
                .instrument(db_span("UPDATE", query))
                .await
                .context("failed to rotate refresh token")?;

            Ok(row.as_ref().map(user_from_row))
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self
                .pool
                .acquire()
                .instrument(tracing::info_span!(
                    "db.acquire",
                    db.system = "postgresql",
                    db.operation = "ACQUIRE"
                ))
                .await
                .context("failed to acquire database connection")?;
            conn.ping()
                .instrument(tracing::info_span!(
                    "db.ping",
                    db.system = "postgresql",
                    db.operation = "PING"
                ))
                .await
                .context("failed to ping database")?;
            Ok(())
        })
    }
}
