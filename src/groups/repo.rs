use anyhow::Context;
use sqlx::{PgConnection, PgExecutor, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{membership::RequestStatus, repo_types::*};
use crate::error::is_unique_violation;

// ---- groups ----

/// Case-insensitive substring match on the name; `None` lists everything.
pub async fn list_groups(db: &PgPool, q: Option<&str>) -> anyhow::Result<Vec<GroupSummary>> {
    let rows = sqlx::query_as::<_, GroupSummary>(
        r#"
        SELECT g.id, g.name, g.description, g.owner_id,
               (SELECT COUNT(*) FROM group_members m
                 WHERE m.group_id = g.id AND m.is_approved) AS member_count
          FROM groups g
         WHERE ($1::text IS NULL OR g.name ILIKE '%' || $1 || '%')
         ORDER BY g.created_at DESC
        "#,
    )
    .bind(q)
    .fetch_all(db)
    .await
    .context("list groups")?;
    Ok(rows)
}

pub async fn find_group<'e, E>(db: E, id: Uuid) -> anyhow::Result<Option<Group>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Group>(
        "SELECT id, name, description, owner_id, created_at FROM groups WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find group")?;
    Ok(row)
}

pub async fn insert_group(
    conn: &mut PgConnection,
    owner_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> anyhow::Result<Group> {
    let row = sqlx::query_as::<_, Group>(
        r#"
        INSERT INTO groups (name, description, owner_id)
        VALUES ($1, $2, $3)
        RETURNING id, name, description, owner_id, created_at
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(owner_id)
    .fetch_one(&mut *conn)
    .await
    .context("insert group")?;
    Ok(row)
}

// ---- members ----

/// Adds an approved member. Returns false when the pair already exists.
pub async fn insert_member(
    conn: &mut PgConnection,
    user_id: Uuid,
    group_id: Uuid,
) -> anyhow::Result<bool> {
    let done = sqlx::query(
        r#"
        INSERT INTO group_members (user_id, group_id, is_approved)
        VALUES ($1, $2, TRUE)
        ON CONFLICT (user_id, group_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(group_id)
    .execute(&mut *conn)
    .await
    .context("insert group member")?;
    Ok(done.rows_affected() == 1)
}

pub async fn find_member(
    db: &PgPool,
    user_id: Uuid,
    group_id: Uuid,
) -> anyhow::Result<Option<GroupMember>> {
    let row = sqlx::query_as::<_, GroupMember>(
        r#"
        SELECT id, user_id, group_id, is_approved, joined_at
          FROM group_members
         WHERE user_id = $1 AND group_id = $2
        "#,
    )
    .bind(user_id)
    .bind(group_id)
    .fetch_optional(db)
    .await
    .context("find group member")?;
    Ok(row)
}

pub async fn delete_member(db: &PgPool, user_id: Uuid, group_id: Uuid) -> anyhow::Result<bool> {
    let done = sqlx::query("DELETE FROM group_members WHERE user_id = $1 AND group_id = $2")
        .bind(user_id)
        .bind(group_id)
        .execute(db)
        .await
        .context("delete group member")?;
    Ok(done.rows_affected() > 0)
}

pub async fn member_count(db: &PgPool, group_id: Uuid) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM group_members WHERE group_id = $1 AND is_approved",
    )
    .bind(group_id)
    .fetch_one(db)
    .await
    .context("count group members")?;
    Ok(n)
}

pub async fn approved_member_ids(
    conn: &mut PgConnection,
    group_id: Uuid,
) -> anyhow::Result<Vec<Uuid>> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT user_id FROM group_members WHERE group_id = $1 AND is_approved",
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await
    .context("list group member ids")?;
    Ok(ids)
}

/// Members of `group_id` whose `last_active` is at or after `since`.
pub async fn online_members(
    db: &PgPool,
    group_id: Uuid,
    since: OffsetDateTime,
) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
          FROM group_members m
          JOIN users u ON u.id = m.user_id
         WHERE m.group_id = $1 AND u.last_active >= $2
        "#,
    )
    .bind(group_id)
    .bind(since)
    .fetch_one(db)
    .await
    .context("count online members")?;
    Ok(n)
}

pub async fn count_joined(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM group_members WHERE user_id = $1 AND is_approved",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("count joined groups")?;
    Ok(n)
}

pub async fn recently_joined(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<JoinedGroup>> {
    let rows = sqlx::query_as::<_, JoinedGroup>(
        r#"
        SELECT g.id, g.name, m.joined_at
          FROM group_members m
          JOIN groups g ON g.id = m.group_id
         WHERE m.user_id = $1 AND m.is_approved
         ORDER BY m.joined_at DESC
         LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("list recently joined groups")?;
    Ok(rows)
}

// ---- join requests ----

pub async fn pending_request_for(
    db: &PgPool,
    user_id: Uuid,
    group_id: Uuid,
) -> anyhow::Result<Option<JoinRequest>> {
    let row = sqlx::query_as::<_, JoinRequest>(
        r#"
        SELECT id, user_id, group_id, status, created_at
          FROM group_join_requests
         WHERE user_id = $1 AND group_id = $2 AND status = 'pending'
        "#,
    )
    .bind(user_id)
    .bind(group_id)
    .fetch_optional(db)
    .await
    .context("find pending join request")?;
    Ok(row)
}

/// `Ok(None)` when the pair already has a pending request.
pub async fn insert_request(
    conn: &mut PgConnection,
    user_id: Uuid,
    group_id: Uuid,
) -> anyhow::Result<Option<JoinRequest>> {
    let res = sqlx::query_as::<_, JoinRequest>(
        r#"
        INSERT INTO group_join_requests (user_id, group_id, status)
        VALUES ($1, $2, 'pending')
        RETURNING id, user_id, group_id, status, created_at
        "#,
    )
    .bind(user_id)
    .bind(group_id)
    .fetch_one(&mut *conn)
    .await;
    match res {
        Ok(r) => Ok(Some(r)),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e).context("insert join request"),
    }
}

/// Locks the request row for the rest of the transaction.
pub async fn lock_request(
    conn: &mut PgConnection,
    id: Uuid,
) -> anyhow::Result<Option<JoinRequest>> {
    let row = sqlx::query_as::<_, JoinRequest>(
        r#"
        SELECT id, user_id, group_id, status, created_at
          FROM group_join_requests
         WHERE id = $1
         FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .context("lock join request")?;
    Ok(row)
}

pub async fn set_request_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: RequestStatus,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE group_join_requests SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(&mut *conn)
        .await
        .context("update join request status")?;
    Ok(())
}

pub async fn pending_requests(db: &PgPool, group_id: Uuid) -> anyhow::Result<Vec<PendingRequest>> {
    let rows = sqlx::query_as::<_, PendingRequest>(
        r#"
        SELECT r.id, r.user_id, u.username, u.name, r.created_at
          FROM group_join_requests r
          JOIN users u ON u.id = r.user_id
         WHERE r.group_id = $1 AND r.status = 'pending'
         ORDER BY r.created_at
        "#,
    )
    .bind(group_id)
    .fetch_all(db)
    .await
    .context("list pending join requests")?;
    Ok(rows)
}

// ---- discussion ----

pub async fn insert_message(
    conn: &mut PgConnection,
    group_id: Uuid,
    user_id: Uuid,
    message: &str,
) -> anyhow::Result<DiscussionMessage> {
    let row = sqlx::query_as::<_, DiscussionMessage>(
        r#"
        WITH m AS (
            INSERT INTO discussion_messages (group_id, user_id, message)
            VALUES ($1, $2, $3)
            RETURNING id, group_id, user_id, message, created_at
        )
        SELECT m.id, m.group_id, m.user_id, u.username, m.message, m.created_at
          FROM m
          JOIN users u ON u.id = m.user_id
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .bind(message)
    .fetch_one(&mut *conn)
    .await
    .context("insert discussion message")?;
    Ok(row)
}

/// Oldest first.
pub async fn messages(db: &PgPool, group_id: Uuid) -> anyhow::Result<Vec<DiscussionMessage>> {
    let rows = sqlx::query_as::<_, DiscussionMessage>(
        r#"
        SELECT m.id, m.group_id, m.user_id, u.username, m.message, m.created_at
          FROM discussion_messages m
          JOIN users u ON u.id = m.user_id
         WHERE m.group_id = $1
         ORDER BY m.created_at, m.id
        "#,
    )
    .bind(group_id)
    .fetch_all(db)
    .await
    .context("list discussion messages")?;
    Ok(rows)
}

/// Latest messages across every group, newest first.
pub async fn recent_activity(db: &PgPool, limit: i64) -> anyhow::Result<Vec<Activity>> {
    let rows = sqlx::query_as::<_, Activity>(
        r#"
        SELECT u.username, g.id AS group_id, g.name AS group_name, m.created_at
          FROM discussion_messages m
          JOIN users u ON u.id = m.user_id
          JOIN groups g ON g.id = m.group_id
         ORDER BY m.created_at DESC
         LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await
    .context("list recent discussion activity")?;
    Ok(rows)
}
