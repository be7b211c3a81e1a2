use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category: Option<String>,
    pub published: bool,
    pub image: Option<String>,
    pub video: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validated fields for an insert or a full update.
#[derive(Debug, Clone)]
pub struct PostFields {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category: Option<String>,
    pub published: bool,
    pub image: Option<String>,
    pub video: Option<String>,
}
