use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    access,
    repo,
    repo_types::{Catalog, Purchase, ResourceRow},
};
use crate::error::{AppError, AppResult};

#[derive(Debug)]
pub enum PurchaseOutcome {
    AlreadyOwned,
    Free,
    Purchased(Purchase),
}

/// What a purchase request should do, before touching the purchases table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PurchaseDecision {
    AlreadyOwned,
    Free,
    Charge { amount: f64 },
}

pub fn decide(resource: &ResourceRow) -> PurchaseDecision {
    if resource.owned {
        PurchaseDecision::AlreadyOwned
    } else if access::effectively_free(resource.position, resource.is_free) {
        PurchaseDecision::Free
    } else {
        PurchaseDecision::Charge {
            amount: resource.price.max(0.0),
        }
    }
}

/// Records a purchase of `resource_id` by `user_id`. Safe to call twice: the
/// unique (user, resource) constraint turns a concurrent duplicate into
/// `AlreadyOwned`.
#[instrument(skip(db))]
pub async fn purchase(
    db: &PgPool,
    catalog: Catalog,
    user_id: Uuid,
    resource_id: Uuid,
) -> AppResult<(ResourceRow, PurchaseOutcome)> {
    let mut tx = db.begin().await?;

    let resource = repo::find_resource(&mut *tx, catalog, resource_id, Some(user_id))
        .await?
        .ok_or_else(|| AppError::not_found("Resource not found"))?;

    let outcome = match decide(&resource) {
        PurchaseDecision::AlreadyOwned => PurchaseOutcome::AlreadyOwned,
        PurchaseDecision::Free => PurchaseOutcome::Free,
        PurchaseDecision::Charge { amount } => {
            match repo::insert_purchase(&mut tx, catalog, user_id, resource_id, amount).await? {
                Some(p) => {
                    tx.commit().await?;
                    info!(purchase_id = %p.id, %user_id, %resource_id, amount, "resource purchased");
                    PurchaseOutcome::Purchased(p)
                }
                None => PurchaseOutcome::AlreadyOwned,
            }
        }
    };

    Ok((resource, outcome))
}
