use crate::error::Result;
use gymdesk_models::{NewSecurityEvent, SecurityEvent, SecurityEventQuery};
use sqlx::{PgPool, Postgres, QueryBuilder};

#[derive(Clone)]
pub struct SecurityEventRepository {
    pool: PgPool,
}

impl SecurityEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a security event (immutable log, no updates)
    pub async fn record(&self, event: &NewSecurityEvent) -> Result<SecurityEvent> {
        let event = sqlx::query_as::<_, SecurityEvent>(
            r#"
            INSERT INTO security_events (
                user_id, event_type, ip_address, user_agent, description, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(event.user_id)
        .bind(&event.event_type)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(&event.description)
        .bind(&event.metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Query security events with filters, most recent first
    pub async fn query(&self, query: &SecurityEventQuery) -> Result<Vec<SecurityEvent>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM security_events WHERE 1=1");

        if let Some(user_id) = query.user_id {
            builder.push(" AND user_id = ");
            builder.push_bind(user_id);
        }

        if let Some(ref event_type) = query.event_type {
            builder.push(" AND event_type = ");
            builder.push_bind(event_type);
        }

        builder.push(" ORDER BY created_at DESC");

        builder.push(" LIMIT ");
        builder.push_bind(query.limit.unwrap_or(100));

        builder.push(" OFFSET ");
        builder.push_bind(query.offset.unwrap_or(0));

        let events = builder
            .build_query_as::<SecurityEvent>()
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }
}
