use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::PostRequest,
    repo::{self, Saved},
    repo_types::{BlogPost, PostFields},
};
use crate::error::{AppError, AppResult};

/// Lowercase ASCII letters and digits, runs joined by single dashes.
pub fn slugify(title: &str) -> String {
    lazy_static! {
        static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    }
    NON_ALNUM
        .replace_all(&title.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

fn blank_to_none(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn validate(req: PostRequest) -> AppResult<PostFields> {
    let title = req.title.trim().to_string();
    let content = req.content.trim().to_string();
    if title.is_empty() || content.is_empty() {
        return Err(AppError::validation("Title and content are required."));
    }
    let slug = slugify(&title);
    if slug.is_empty() {
        return Err(AppError::validation("Title must contain letters or digits."));
    }
    Ok(PostFields {
        title,
        slug,
        content,
        category: blank_to_none(req.category),
        published: req.published,
        image: blank_to_none(req.image),
        video: blank_to_none(req.video),
    })
}

fn saved(result: Saved, slug: &str) -> AppResult<BlogPost> {
    match result {
        Saved::Ok(post) => Ok(post),
        Saved::SlugTaken => {
            warn!(%slug, "slug already in use");
            Err(AppError::conflict("A post with this title already exists."))
        }
        Saved::Missing => Err(AppError::not_found("Post not found")),
    }
}

#[instrument(skip(db, req))]
pub async fn create(db: &PgPool, req: PostRequest) -> AppResult<BlogPost> {
    let fields = validate(req)?;
    let post = saved(repo::insert(db, &fields).await?, &fields.slug)?;
    info!(post_id = %post.id, slug = %post.slug, "blog post created");
    Ok(post)
}

#[instrument(skip(db, req))]
pub async fn edit(db: &PgPool, id: Uuid, req: PostRequest) -> AppResult<BlogPost> {
    let fields = validate(req)?;
    let post = saved(repo::update(db, id, &fields).await?, &fields.slug)?;
    info!(post_id = %post.id, slug = %post.slug, "blog post updated");
    Ok(post)
}

#[instrument(skip(db))]
pub async fn delete(db: &PgPool, id: Uuid) -> AppResult<()> {
    if !repo::delete(db, id).await? {
        return Err(AppError::not_found("Post not found"));
    }
    info!(post_id = %id, "blog post deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, content: &str) -> PostRequest {
        PostRequest {
            title: title.into(),
            content: content.into(),
            category: Some("  ".into()),
            published: true,
            image: None,
            video: Some("https://cdn.example.com/v.mp4".into()),
        }
    }

    #[test]
    fn slug_is_lowercase_ascii_with_single_dashes() {
        assert_eq!(slugify("Top 10 BECE Tips!"), "top-10-bece-tips");
        assert_eq!(slugify("  --Hello,   World--  "), "hello-world");
        assert_eq!(slugify("Café résumé"), "caf-r-sum");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn slug_is_stable() {
        let once = slugify("WASSCE 2024: What Changed?");
        assert_eq!(slugify(&once), once);
        assert!(once.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn validate_requires_title_and_content() {
        assert!(matches!(validate(request("", "body")), Err(AppError::Validation(_))));
        assert!(matches!(validate(request("Title", "  ")), Err(AppError::Validation(_))));
        assert!(matches!(validate(request("!!!", "body")), Err(AppError::Validation(_))));
    }

    #[test]
    fn validate_fills_slug_and_drops_blank_optionals() {
        let f = validate(request(" Study Smarter ", "body")).unwrap();
        assert_eq!(f.title, "Study Smarter");
        assert_eq!(f.slug, "study-smarter");
        assert!(f.category.is_none());
        assert!(f.video.is_some());
    }

    #[test]
    fn slug_collision_is_a_conflict() {
        let err = saved(Saved::SlugTaken, "x").unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let err = saved(Saved::Missing, "x").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
