use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OnlineUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
}

pub async fn count_users(db: &PgPool) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await
        .context("count users")?;
    Ok(n)
}

pub async fn online_users(db: &PgPool, since: OffsetDateTime) -> anyhow::Result<Vec<OnlineUser>> {
    let rows = sqlx::query_as::<_, OnlineUser>(
        r#"
        SELECT id, username, name
          FROM users
         WHERE last_active >= $1
         ORDER BY last_active DESC
        "#,
    )
    .bind(since)
    .fetch_all(db)
    .await
    .context("list online users")?;
    Ok(rows)
}
