use crate::error::{AuthError, Result};
use chrono::{DateTime, Duration, Utc};
use gymdesk_database::Database;
use gymdesk_models::User;
use uuid::Uuid;

/// Tracks failed password attempts on the user row and applies temporary
/// locks once the configured threshold is hit.
pub struct AccountLockoutService {
    db: Database,
}

impl AccountLockoutService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a failed password attempt. The increment happens in a single
    /// statement so concurrent failures cannot drop a count.
    pub async fn record_failure(&self, user_id: Uuid) -> Result<i32> {
        let attempts: i32 = sqlx::query_scalar(
            r#"
            UPDATE users
            SET failed_login_attempts = failed_login_attempts + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING failed_login_attempts
            "#,
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(attempts)
    }

    /// Lock the account for the given duration and zero the counter so the
    /// next window starts fresh after the lock expires.
    pub async fn lock(&self, user_id: Uuid, duration_minutes: i64) -> Result<DateTime<Utc>> {
        let locked_until = Utc::now() + Duration::minutes(duration_minutes);

        sqlx::query(
            r#"
            UPDATE users
            SET locked_until = $2,
                failed_login_attempts = 0,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(locked_until)
        .execute(self.db.pool())
        .await?;

        tracing::warn!(
            "Account locked: user_id={}, until={}",
            user_id,
            locked_until
        );

        Ok(locked_until)
    }

    /// Clear the failure counter and any lock. Called on successful login.
    pub async fn reset(&self, user_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = 0,
                locked_until = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Manually unlock an account (admin action)
    pub async fn unlock(&self, user_id: Uuid) -> Result<()> {
        self.reset(user_id).await?;
        tracing::info!("Account unlocked: user_id={}", user_id);
        Ok(())
    }

    /// Record a failed attempt and lock the account once the threshold is
    /// reached. Returns `AccountLocked` at the moment the lock is applied.
    pub async fn handle_failed_login(
        &self,
        user: &User,
        max_attempts: i32,
        lockout_duration_minutes: i64,
    ) -> Result<()> {
        let failures = self.record_failure(user.id).await?;

        if failures >= max_attempts {
            let locked_until = self.lock(user.id, lockout_duration_minutes).await?;
            return Err(AuthError::AccountLocked { locked_until });
        }

        Ok(())
    }
}

/// Remaining-lockout message shown to the user, rounded up to whole minutes.
pub fn lockout_message(locked_until: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (locked_until - now).num_seconds().max(0);
    let minutes = ((seconds + 59) / 60).max(1);

    if minutes == 1 {
        "Account is temporarily locked. Try again in 1 minute.".to_string()
    } else {
        format!(
            "Account is temporarily locked. Try again in {} minutes.",
            minutes
        )
    }
}
