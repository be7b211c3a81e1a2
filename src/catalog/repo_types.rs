use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// The two resource catalogs share one access and purchase model but live in
/// separate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Course,
    Library,
}

impl Catalog {
    pub(crate) fn resources_table(self) -> &'static str {
        match self {
            Catalog::Course => "resources",
            Catalog::Library => "library_resources",
        }
    }

    pub(crate) fn purchases_table(self) -> &'static str {
        match self {
            Catalog::Course => "purchases",
            Catalog::Library => "library_purchases",
        }
    }

    /// Column grouping resources into one listing.
    pub(crate) fn listing_column(self) -> &'static str {
        match self {
            Catalog::Course => "level_subject_id",
            Catalog::Library => "subject_id",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CourseCategory {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Level {
    pub id: Uuid,
    pub name: String,
    pub position: i32,
    pub course_id: Uuid,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub subject_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LibraryCategory {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LibraryLevel {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LibrarySubject {
    pub id: Uuid,
    pub name: String,
    pub level_id: Uuid,
}

/// A resource together with its place in its listing and the viewer's
/// ownership.
#[derive(Debug, Clone, FromRow)]
pub struct ResourceRow {
    pub id: Uuid,
    pub title: String,
    pub resource_type: Option<String>,
    pub file_url: Option<String>,
    pub author: Option<String>,
    pub is_free: bool,
    pub price: f64,
    pub created_at: OffsetDateTime,
    pub listing_id: Uuid,
    /// Zero-based index in display order.
    pub position: i64,
    pub owned: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resource_id: Uuid,
    pub amount_paid: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub purchased_at: OffsetDateTime,
}
