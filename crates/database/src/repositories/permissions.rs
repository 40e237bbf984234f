use crate::error::Result;
use gymdesk_models::{NewPermission, Permission, UserRole};
use sqlx::PgPool;

#[derive(Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a catalog entry. Names are stable identifiers, so
    /// conflicts only update category and description.
    pub async fn upsert(&self, permission: &NewPermission) -> Result<Permission> {
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (name, category, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
                SET category = EXCLUDED.category,
                    description = EXCLUDED.description
            RETURNING *
            "#,
        )
        .bind(&permission.name)
        .bind(&permission.category)
        .bind(&permission.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(permission)
    }

    /// Grant a named permission to a role
    pub async fn grant_to_role(&self, role: UserRole, permission_name: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role, permission_id)
            SELECT $1, id FROM permissions WHERE name = $2
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role)
        .bind(permission_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All permission names granted to a role
    pub async fn names_for_role(&self, role: UserRole) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.name FROM permissions p
            JOIN role_permissions rp ON p.id = rp.permission_id
            WHERE rp.role = $1
            ORDER BY p.name
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }
}
