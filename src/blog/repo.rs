use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{BlogPost, PostFields};
use crate::error::is_unique_violation;

const POST_COLUMNS: &str =
    "id, title, slug, content, category, published, image, video, created_at";

/// Outcome of a write that may hit the slug constraint.
pub enum Saved {
    Ok(BlogPost),
    SlugTaken,
    Missing,
}

pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<BlogPost>> {
    let rows = sqlx::query_as::<_, BlogPost>(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts ORDER BY created_at DESC"
    ))
    .fetch_all(db)
    .await
    .context("list blog posts")?;
    Ok(rows)
}

pub async fn latest_published(db: &PgPool, limit: i64) -> anyhow::Result<Vec<BlogPost>> {
    let rows = sqlx::query_as::<_, BlogPost>(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts WHERE published ORDER BY created_at DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(db)
    .await
    .context("list latest posts")?;
    Ok(rows)
}

pub async fn find_published_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<BlogPost>> {
    let row = sqlx::query_as::<_, BlogPost>(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = $1 AND published"
    ))
    .bind(slug)
    .fetch_optional(db)
    .await
    .context("find post by slug")?;
    Ok(row)
}

pub async fn insert(db: &PgPool, f: &PostFields) -> anyhow::Result<Saved> {
    let res = sqlx::query_as::<_, BlogPost>(&format!(
        r#"
        INSERT INTO blog_posts (title, slug, content, category, published, image, video)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(&f.title)
    .bind(&f.slug)
    .bind(&f.content)
    .bind(&f.category)
    .bind(f.published)
    .bind(&f.image)
    .bind(&f.video)
    .fetch_one(db)
    .await;
    match res {
        Ok(p) => Ok(Saved::Ok(p)),
        Err(e) if is_unique_violation(&e) => Ok(Saved::SlugTaken),
        Err(e) => Err(e).context("insert blog post"),
    }
}

/// Media columns keep their value when the new one is `None`.
pub async fn update(db: &PgPool, id: Uuid, f: &PostFields) -> anyhow::Result<Saved> {
    let res = sqlx::query_as::<_, BlogPost>(&format!(
        r#"
        UPDATE blog_posts
           SET title = $2, slug = $3, content = $4, category = $5, published = $6,
               image = COALESCE($7, image), video = COALESCE($8, video)
         WHERE id = $1
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&f.title)
    .bind(&f.slug)
    .bind(&f.content)
    .bind(&f.category)
    .bind(f.published)
    .bind(&f.image)
    .bind(&f.video)
    .fetch_optional(db)
    .await;
    match res {
        Ok(Some(p)) => Ok(Saved::Ok(p)),
        Ok(None) => Ok(Saved::Missing),
        Err(e) if is_unique_violation(&e) => Ok(Saved::SlugTaken),
        Err(e) => Err(e).context("update blog post"),
    }
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let done = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete blog post")?;
    Ok(done.rows_affected() > 0)
}
