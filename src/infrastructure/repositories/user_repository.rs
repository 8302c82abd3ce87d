//! User Directory Implementation
//!
//! PostgreSQL implementation of the UserDirectory trait. Reads the forum's
//! `users` table; never writes it.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::UserDirectory;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// PostgreSQL user directory.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Create a new PgUserDirectory with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn display_name(&self, user_id: i64) -> Result<Option<String>, AppError> {
        let timer = metrics::DbTimer::start("select_username", "users");
        let username = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        timer.finish();

        Ok(username)
    }

    async fn display_names(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let timer = metrics::DbTimer::start("select_usernames", "users");
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, username FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        timer.finish();

        Ok(rows.into_iter().collect())
    }
}
