use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    membership::{self, MembershipError, RequestStatus},
    repo,
    repo_types::{DiscussionMessage, Group, JoinRequest},
};
use crate::{
    app::API_PREFIX,
    auth::User,
    error::{AppError, AppResult},
    notifications::notify,
};

pub fn group_link(group_id: Uuid) -> String {
    format!("{API_PREFIX}/groups/{group_id}")
}

fn required(value: &str, what: &str) -> AppResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::validation(format!("{what} is required")));
    }
    Ok(v.to_string())
}

async fn load_group(db: &PgPool, group_id: Uuid) -> AppResult<Group> {
    repo::find_group(db, group_id)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))
}

async fn load_user(db: &PgPool, user_id: Uuid) -> AppResult<User> {
    User::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))
}

async fn is_approved_member(db: &PgPool, user_id: Uuid, group_id: Uuid) -> AppResult<bool> {
    Ok(repo::find_member(db, user_id, group_id)
        .await?
        .map(|m| m.is_approved)
        .unwrap_or(false))
}

/// Creates the group and seats the owner as its first approved member.
#[instrument(skip(db, description))]
pub async fn create_group(
    db: &PgPool,
    owner_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> AppResult<Group> {
    let name = required(name, "Group name")?;
    let description = description.map(str::trim).filter(|d| !d.is_empty());

    let mut tx = db.begin().await?;
    let group = repo::insert_group(&mut tx, owner_id, &name, description).await?;
    repo::insert_member(&mut tx, owner_id, group.id).await?;
    tx.commit().await?;

    info!(group_id = %group.id, %owner_id, "group created");
    Ok(group)
}

#[instrument(skip(db))]
pub async fn request_join(db: &PgPool, group_id: Uuid, user_id: Uuid) -> AppResult<JoinRequest> {
    let group = load_group(db, group_id).await?;
    let is_member = repo::find_member(db, user_id, group_id).await?.is_some();
    let has_pending = repo::pending_request_for(db, user_id, group_id).await?.is_some();
    membership::check_can_request(is_member, has_pending)?;

    let requester = load_user(db, user_id).await?;

    let mut tx = db.begin().await?;
    let request = repo::insert_request(&mut tx, user_id, group_id)
        .await?
        .ok_or(MembershipError::AlreadyPending)?;
    notify(
        &mut tx,
        group.owner_id,
        &format!("{} requested to join {}", requester.name, group.name),
        Some(&group_link(group.id)),
    )
    .await?;
    tx.commit().await?;

    info!(request_id = %request.id, %group_id, %user_id, "join request sent");
    Ok(request)
}

/// Approves or rejects a pending request on behalf of the group owner.
#[instrument(skip(db))]
pub async fn decide(
    db: &PgPool,
    request_id: Uuid,
    actor: Uuid,
    approve: bool,
) -> AppResult<JoinRequest> {
    let mut tx = db.begin().await?;

    let mut request = repo::lock_request(&mut tx, request_id)
        .await?
        .ok_or_else(|| AppError::not_found("Join request not found"))?;
    let group = repo::find_group(&mut *tx, request.group_id)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))?;

    if let Err(e) = membership::check_can_decide(group.owner_id, actor, request.status) {
        warn!(%request_id, %actor, error = %e, "join request decision refused");
        return Err(e.into());
    }

    let (status, verdict) = if approve {
        repo::insert_member(&mut tx, request.user_id, group.id).await?;
        (RequestStatus::Approved, "approved")
    } else {
        (RequestStatus::Rejected, "rejected")
    };
    repo::set_request_status(&mut tx, request.id, status).await?;
    notify(
        &mut tx,
        request.user_id,
        &format!("Your request to join {} was {}", group.name, verdict),
        Some(&group_link(group.id)),
    )
    .await?;
    tx.commit().await?;

    request.status = status;
    info!(%request_id, group_id = %group.id, verdict, "join request decided");
    Ok(request)
}

#[instrument(skip(db))]
pub async fn leave(db: &PgPool, group_id: Uuid, user_id: Uuid) -> AppResult<()> {
    if !repo::delete_member(db, user_id, group_id).await? {
        return Err(MembershipError::NotMember.into());
    }
    info!(%group_id, %user_id, "left group");
    Ok(())
}

/// Appends a message and notifies every other approved member.
#[instrument(skip(db, text))]
pub async fn post_message(
    db: &PgPool,
    group_id: Uuid,
    user_id: Uuid,
    text: &str,
) -> AppResult<DiscussionMessage> {
    let group = load_group(db, group_id).await?;
    membership::check_member(is_approved_member(db, user_id, group_id).await?)?;
    let text = required(text, "Message")?;
    let author = load_user(db, user_id).await?;

    let mut tx = db.begin().await?;
    let message = repo::insert_message(&mut tx, group_id, user_id, &text).await?;
    let recipients = repo::approved_member_ids(&mut tx, group_id).await?;
    let body = format!("New message in {} from {}", group.name, author.name);
    let link = group_link(group_id);
    let mut notified = 0usize;
    for recipient in recipients.into_iter().filter(|id| *id != user_id) {
        notify(&mut tx, recipient, &body, Some(&link)).await?;
        notified += 1;
    }
    tx.commit().await?;

    info!(message_id = %message.id, %group_id, notified, "discussion message posted");
    Ok(message)
}

/// Messages in order plus how many members were active within `window`.
/// Reading counts as activity for the reader.
#[instrument(skip(db))]
pub async fn read_messages(
    db: &PgPool,
    group_id: Uuid,
    user_id: Uuid,
    window: Duration,
) -> AppResult<(Vec<DiscussionMessage>, i64)> {
    load_group(db, group_id).await?;
    membership::check_member(is_approved_member(db, user_id, group_id).await?)?;

    let messages = repo::messages(db, group_id).await?;
    User::touch(db, user_id).await?;
    let since = OffsetDateTime::now_utc() - window;
    let online = repo::online_members(db, group_id, since).await?;
    Ok((messages, online))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_point_at_group() {
        let id = Uuid::new_v4();
        assert_eq!(group_link(id), format!("/api/v1/groups/{id}"));
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("  Physics Club ", "Group name").unwrap(), "Physics Club");
        let err = required("   ", "Group name").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Group name is required"));
    }

    #[tokio::test]
    async fn blank_group_name_fails_before_touching_the_database() {
        let state = crate::state::AppState::fake();
        let err = create_group(&state.db, Uuid::new_v4(), "", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    mod with_database {
        use super::super::*;
        use crate::{notifications, test_support::insert_user};

        async fn club(db: &PgPool) -> (Group, User) {
            let owner = insert_user(db, "adjoa").await;
            let group = create_group(db, owner.id, "Physics Club", Some("Mechanics revision"))
                .await
                .unwrap();
            (group, owner)
        }

        fn conflict_message(err: AppError) -> String {
            match err {
                AppError::Conflict(m) => m,
                other => panic!("expected conflict, got {other:?}"),
            }
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn second_request_while_pending_is_a_conflict(pool: PgPool) {
            let (group, owner) = club(&pool).await;
            let kojo = insert_user(&pool, "kojo").await;

            request_join(&pool, group.id, kojo.id).await.unwrap();
            let err = request_join(&pool, group.id, kojo.id).await.unwrap_err();
            assert_eq!(conflict_message(err), "Join request already sent.");

            // the owner heard about it once
            assert_eq!(notifications::repo::unread_count(&pool, owner.id).await.unwrap(), 1);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn concurrent_requests_leave_one_pending(pool: PgPool) {
            let (group, _) = club(&pool).await;
            let esi = insert_user(&pool, "esi").await;

            let (a, b) = tokio::join!(
                request_join(&pool, group.id, esi.id),
                request_join(&pool, group.id, esi.id),
            );
            assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
            assert_eq!(repo::pending_requests(&pool, group.id).await.unwrap().len(), 1);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn request_is_decided_once(pool: PgPool) {
            let (group, owner) = club(&pool).await;
            let kofi = insert_user(&pool, "kofi").await;
            let request = request_join(&pool, group.id, kofi.id).await.unwrap();

            // only the owner decides
            let err = decide(&pool, request.id, kofi.id, true).await.unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));

            let rejected = decide(&pool, request.id, owner.id, false).await.unwrap();
            assert_eq!(rejected.status, RequestStatus::Rejected);

            let err = decide(&pool, request.id, owner.id, true).await.unwrap_err();
            assert_eq!(conflict_message(err), "This request has already been decided.");
            assert!(repo::find_member(&pool, kofi.id, group.id).await.unwrap().is_none());
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn member_can_rejoin_after_leaving(pool: PgPool) {
            let (group, owner) = club(&pool).await;
            let ama = insert_user(&pool, "ama").await;

            let first = request_join(&pool, group.id, ama.id).await.unwrap();
            decide(&pool, first.id, owner.id, true).await.unwrap();
            assert!(is_approved_member(&pool, ama.id, group.id).await.unwrap());

            let err = request_join(&pool, group.id, ama.id).await.unwrap_err();
            assert_eq!(conflict_message(err), "You are already a member.");

            leave(&pool, group.id, ama.id).await.unwrap();
            assert!(matches!(
                leave(&pool, group.id, ama.id).await,
                Err(AppError::Forbidden(_))
            ));

            let second = request_join(&pool, group.id, ama.id).await.unwrap();
            assert_ne!(second.id, first.id);
            let approved = decide(&pool, second.id, owner.id, true).await.unwrap();
            assert_eq!(approved.status, RequestStatus::Approved);
            assert!(is_approved_member(&pool, ama.id, group.id).await.unwrap());
        }
    }
}
