use crate::error::{DatabaseError, Result};
use gymdesk_models::{NewSession, Session};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new session
    pub async fn create(&self, new_session: &NewSession) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (
                id, user_id, refresh_token_hash,
                ip_address, user_agent, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new_session.id)
        .bind(new_session.user_id)
        .bind(&new_session.refresh_token_hash)
        .bind(&new_session.ip_address)
        .bind(&new_session.user_agent)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::map_unique(e, "Session", "refresh token"))?;

        Ok(session)
    }

    /// Find session by its identifier. Validity (expiry, invalidation) is the
    /// caller's concern; this returns the row as stored.
    pub async fn find_by_id(&self, id: &str) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Session", id))?;

        Ok(session)
    }

    /// Find session by refresh token hash
    pub async fn find_by_refresh_hash(&self, refresh_token_hash: &str) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE refresh_token_hash = $1",
        )
        .bind(refresh_token_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Session not found".to_string()))?;

        Ok(session)
    }

    /// Mark a session unusable without deleting the row
    pub async fn invalidate(&self, id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE sessions SET invalidated_at = NOW() WHERE id = $1 AND invalidated_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Invalidate every live session a user holds (password change, forced
    /// logout). Returns how many sessions were revoked.
    pub async fn invalidate_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET invalidated_at = NOW() WHERE user_id = $1 AND invalidated_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Clean up expired sessions
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
