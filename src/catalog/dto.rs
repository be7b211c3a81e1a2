use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    access::{self, Access},
    repo_types::{Level, Purchase, ResourceRow, Subject},
    services::PurchaseOutcome,
};

/// A resource as a given viewer sees it.
#[derive(Debug, Serialize)]
pub struct ResourceView {
    pub id: Uuid,
    pub title: String,
    pub resource_type: Option<String>,
    pub author: Option<String>,
    pub access: Access,
    pub can_access: bool,
    /// Effective flag, including the free preview window.
    pub is_free: bool,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<ResourceRow> for ResourceView {
    fn from(r: ResourceRow) -> Self {
        let access = access::evaluate(r.position, r.is_free, r.owned);
        let is_free = access::effectively_free(r.position, r.is_free);
        Self {
            id: r.id,
            title: r.title,
            resource_type: r.resource_type,
            author: r.author,
            access,
            can_access: access.granted(),
            is_free,
            price: r.price,
            file_url: if access.granted() { r.file_url } else { None },
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CourseFilter {
    pub category_id: Option<Uuid>,
}

/// One node of the browse hierarchy with its direct children.
#[derive(Debug, Serialize)]
pub struct Children<P, C> {
    pub parent: P,
    pub items: Vec<C>,
}

#[derive(Debug, Serialize)]
pub struct SubjectsOfLevel {
    pub level: Level,
    pub core: Vec<Subject>,
    pub elective: Vec<Subject>,
}

impl SubjectsOfLevel {
    /// Splits on `subject_type`; anything that is not "elective" counts as core.
    pub fn split(level: Level, subjects: Vec<Subject>) -> Self {
        let (elective, core) = subjects
            .into_iter()
            .partition(|s| s.subject_type.as_deref() == Some("elective"));
        Self { level, core, elective }
    }
}

#[derive(Debug, Serialize)]
pub struct ResourceListing<P> {
    pub parent: P,
    pub resources: Vec<ResourceView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    AlreadyOwned,
    Free,
    Purchased,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub status: PurchaseStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase: Option<Purchase>,
}

impl PurchaseResponse {
    pub fn new(title: &str, outcome: PurchaseOutcome) -> Self {
        match outcome {
            PurchaseOutcome::AlreadyOwned => Self {
                status: PurchaseStatus::AlreadyOwned,
                message: "You already have access to this resource.".into(),
                purchase: None,
            },
            PurchaseOutcome::Free => Self {
                status: PurchaseStatus::Free,
                message: "This resource is free. You can access it directly.".into(),
                purchase: None,
            },
            PurchaseOutcome::Purchased(p) => Self {
                status: PurchaseStatus::Purchased,
                message: format!("You have purchased {title}."),
                purchase: Some(p),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(position: i64, is_free: bool, owned: bool) -> ResourceRow {
        ResourceRow {
            id: Uuid::new_v4(),
            title: "BECE Maths 2019".into(),
            resource_type: Some("pdf".into()),
            file_url: Some("/files/bece-2019.pdf".into()),
            author: Some("WAEC".into()),
            is_free,
            price: 15.0,
            created_at: OffsetDateTime::now_utc(),
            listing_id: Uuid::new_v4(),
            position,
            owned,
        }
    }

    #[test]
    fn preview_position_is_reported_free_with_its_stored_price() {
        let v = ResourceView::from(row(1, false, false));
        assert_eq!(v.access, Access::Free);
        assert!(v.is_free);
        assert_eq!(v.price, 15.0);
        assert!(v.file_url.is_some());
    }

    #[test]
    fn locked_resource_hides_file_url() {
        let v = ResourceView::from(row(4, false, false));
        assert_eq!(v.access, Access::Denied);
        assert!(!v.can_access);
        assert_eq!(v.price, 15.0);
        assert!(v.file_url.is_none());
        let json = serde_json::to_string(&v).unwrap();
        assert!(!json.contains("file_url"));
    }

    #[test]
    fn owned_resource_is_purchased() {
        let v = ResourceView::from(row(4, false, true));
        assert_eq!(v.access, Access::Purchased);
        assert_eq!(v.file_url.as_deref(), Some("/files/bece-2019.pdf"));
    }

    #[test]
    fn subjects_split_into_core_and_elective() {
        let level = Level {
            id: Uuid::new_v4(),
            name: "JHS 1".into(),
            position: 1,
            course_id: Uuid::new_v4(),
        };
        let subject = |name: &str, kind: Option<&str>| Subject {
            id: Uuid::new_v4(),
            name: name.into(),
            subject_type: kind.map(str::to_string),
        };
        let out = SubjectsOfLevel::split(
            level,
            vec![
                subject("Maths", Some("core")),
                subject("French", Some("elective")),
                subject("English", None),
            ],
        );
        assert_eq!(out.core.len(), 2);
        assert_eq!(out.elective.len(), 1);
        assert_eq!(out.elective[0].name, "French");
    }

    #[test]
    fn purchase_messages() {
        let r = PurchaseResponse::new("Physics Notes", PurchaseOutcome::Free);
        assert_eq!(r.message, "This resource is free. You can access it directly.");
        let r = PurchaseResponse::new("Physics Notes", PurchaseOutcome::AlreadyOwned);
        assert_eq!(r.message, "You already have access to this resource.");
        let p = Purchase {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            resource_id: Uuid::new_v4(),
            amount_paid: 5.0,
            purchased_at: OffsetDateTime::now_utc(),
        };
        let r = PurchaseResponse::new("Physics Notes", PurchaseOutcome::Purchased(p));
        assert_eq!(r.message, "You have purchased Physics Notes.");
        assert!(serde_json::to_string(&r).unwrap().contains("\"status\":\"purchased\""));
    }
}
