use sqlx::{PgConnection, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{repo, repo_types::Notification};
use crate::error::{AppError, AppResult};

/// Queues a notification on the caller's transaction.
pub async fn notify(
    conn: &mut PgConnection,
    user_id: Uuid,
    message: &str,
    link: Option<&str>,
) -> anyhow::Result<Notification> {
    let n = repo::insert(conn, user_id, message, link).await?;
    debug!(notification_id = %n.id, %user_id, "notification queued");
    Ok(n)
}

/// Only the recipient may change a notification.
pub fn ensure_recipient(notification: &Notification, actor: Uuid) -> AppResult<()> {
    if notification.user_id != actor {
        warn!(notification_id = %notification.id, %actor, "foreign notification");
        return Err(AppError::forbidden("You cannot modify this notification."));
    }
    Ok(())
}

pub async fn mark_read(db: &PgPool, id: Uuid, actor: Uuid) -> AppResult<Notification> {
    let mut notification = repo::find(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Notification not found"))?;
    ensure_recipient(&notification, actor)?;
    if !notification.is_read {
        repo::set_read(db, id, actor).await?;
        notification.is_read = true;
    }
    Ok(notification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn notification_for(user_id: Uuid) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id,
            message: "Your request to join Physics Club was approved".into(),
            link: Some("/groups/1".into()),
            is_read: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn recipient_may_mark_read() {
        let owner = Uuid::new_v4();
        assert!(ensure_recipient(&notification_for(owner), owner).is_ok());
    }

    #[test]
    fn stranger_is_denied_and_flag_untouched() {
        let n = notification_for(Uuid::new_v4());
        let err = ensure_recipient(&n, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(!n.is_read);
    }
}
