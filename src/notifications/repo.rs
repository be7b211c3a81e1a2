use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::repo_types::Notification;

pub async fn insert(
    conn: &mut PgConnection,
    user_id: Uuid,
    message: &str,
    link: Option<&str>,
) -> anyhow::Result<Notification> {
    let row = sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (user_id, message, link)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, message, link, is_read, created_at
        "#,
    )
    .bind(user_id)
    .bind(message)
    .bind(link)
    .fetch_one(&mut *conn)
    .await
    .context("insert notification")?;
    Ok(row)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Notification>> {
    let row = sqlx::query_as::<_, Notification>(
        "SELECT id, user_id, message, link, is_read, created_at FROM notifications WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find notification")?;
    Ok(row)
}

pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, message, link, is_read, created_at
          FROM notifications
         WHERE user_id = $1
         ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list notifications")?;
    Ok(rows)
}

pub async fn unread_count(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("count unread notifications")?;
    Ok(n)
}

/// The `user_id` guard keeps the write scoped to the recipient.
pub async fn set_read(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("mark notification read")?;
    Ok(())
}

pub async fn set_all_read(db: &PgPool, user_id: Uuid) -> anyhow::Result<u64> {
    let done = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
        .bind(user_id)
        .execute(db)
        .await
        .context("mark all notifications read")?;
    Ok(done.rows_affected())
}
