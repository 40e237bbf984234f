use crate::error::{DatabaseError, Result};
use gymdesk_models::user::{UpdateUser, UserProfile, UserRole};
use gymdesk_models::User;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::map_unique(e, "User", "username or email"))?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("User", &id.to_string()))?;

        Ok(user)
    }

    /// Find user by username
    pub async fn find_by_username(&self, username: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("User", username))?;

        Ok(user)
    }

    /// List all users (paginated)
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<UserProfile>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    /// Count all users
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    /// Count users holding a given role
    pub async fn count_by_role(&self, role: UserRole) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    /// Update user
    pub async fn update(&self, id: Uuid, update: &UpdateUser) -> Result<User> {
        let mut query_builder = sqlx::QueryBuilder::new("UPDATE users SET updated_at = NOW()");

        let mut has_updates = false;

        if let Some(ref email) = update.email {
            query_builder.push(", email = ");
            query_builder.push_bind(email);
            has_updates = true;
        }

        if let Some(role) = update.role {
            query_builder.push(", role = ");
            query_builder.push_bind(role);
            has_updates = true;
        }

        if let Some(is_active) = update.is_active {
            query_builder.push(", is_active = ");
            query_builder.push_bind(is_active);
            has_updates = true;
        }

        if !has_updates {
            return self.find_by_id(id).await;
        }

        query_builder.push(" WHERE id = ");
        query_builder.push_bind(id);
        query_builder.push(" RETURNING *");

        let user = query_builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::map_unique(e, "User", "email"))?
            .ok_or_else(|| DatabaseError::not_found("User", &id.to_string()))?;

        Ok(user)
    }

    /// Update password hash
    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Update last login timestamp
    pub async fn update_last_login(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deactivate a user. Accounts are never hard-deleted so audit history
    /// keeps a resolvable user id.
    pub async fn deactivate(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET is_active = false, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("User", &id.to_string()));
        }

        Ok(())
    }
}
