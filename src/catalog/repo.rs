use anyhow::Context;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use super::repo_types::*;
use crate::error::is_unique_violation;

// ---- Course hierarchy ----

pub async fn categories(db: &PgPool) -> anyhow::Result<Vec<CourseCategory>> {
    let rows = sqlx::query_as::<_, CourseCategory>(
        "SELECT id, name FROM course_categories ORDER BY name",
    )
    .fetch_all(db)
    .await
    .context("list course categories")?;
    Ok(rows)
}

pub async fn category(db: &PgPool, id: Uuid) -> anyhow::Result<Option<CourseCategory>> {
    let row = sqlx::query_as::<_, CourseCategory>(
        "SELECT id, name FROM course_categories WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find course category")?;
    Ok(row)
}

pub async fn courses(db: &PgPool, category_id: Option<Uuid>) -> anyhow::Result<Vec<Course>> {
    let rows = sqlx::query_as::<_, Course>(
        r#"
        SELECT id, name, category_id
          FROM courses
         WHERE ($1::uuid IS NULL OR category_id = $1)
         ORDER BY name
        "#,
    )
    .bind(category_id)
    .fetch_all(db)
    .await
    .context("list courses")?;
    Ok(rows)
}

pub async fn course(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Course>> {
    let row = sqlx::query_as::<_, Course>("SELECT id, name, category_id FROM courses WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find course")?;
    Ok(row)
}

pub async fn count_courses(db: &PgPool) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
        .fetch_one(db)
        .await
        .context("count courses")?;
    Ok(n)
}

pub async fn levels(db: &PgPool, course_id: Uuid) -> anyhow::Result<Vec<Level>> {
    let rows = sqlx::query_as::<_, Level>(
        r#"
        SELECT id, name, position, course_id
          FROM levels
         WHERE course_id = $1
         ORDER BY position, name
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await
    .context("list levels")?;
    Ok(rows)
}

pub async fn level(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Level>> {
    let row = sqlx::query_as::<_, Level>(
        "SELECT id, name, position, course_id FROM levels WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find level")?;
    Ok(row)
}

pub async fn subjects_of_level(db: &PgPool, level_id: Uuid) -> anyhow::Result<Vec<Subject>> {
    let rows = sqlx::query_as::<_, Subject>(
        r#"
        SELECT s.id, s.name, s.subject_type
          FROM level_subjects ls
          JOIN subjects s ON s.id = ls.subject_id
         WHERE ls.level_id = $1
         ORDER BY s.name
        "#,
    )
    .bind(level_id)
    .fetch_all(db)
    .await
    .context("list subjects of level")?;
    Ok(rows)
}

pub async fn subject(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Subject>> {
    let row = sqlx::query_as::<_, Subject>(
        "SELECT id, name, subject_type FROM subjects WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find subject")?;
    Ok(row)
}

pub async fn level_subject_id(
    db: &PgPool,
    level_id: Uuid,
    subject_id: Uuid,
) -> anyhow::Result<Option<Uuid>> {
    let id: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM level_subjects WHERE level_id = $1 AND subject_id = $2",
    )
    .bind(level_id)
    .bind(subject_id)
    .fetch_optional(db)
    .await
    .context("find level subject")?;
    Ok(id)
}

// ---- Library hierarchy ----

pub async fn library_categories(db: &PgPool) -> anyhow::Result<Vec<LibraryCategory>> {
    let rows = sqlx::query_as::<_, LibraryCategory>(
        "SELECT id, name FROM library_categories ORDER BY name",
    )
    .fetch_all(db)
    .await
    .context("list library categories")?;
    Ok(rows)
}

pub async fn library_category(db: &PgPool, id: Uuid) -> anyhow::Result<Option<LibraryCategory>> {
    let row = sqlx::query_as::<_, LibraryCategory>(
        "SELECT id, name FROM library_categories WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find library category")?;
    Ok(row)
}

pub async fn library_levels(db: &PgPool, category_id: Uuid) -> anyhow::Result<Vec<LibraryLevel>> {
    let rows = sqlx::query_as::<_, LibraryLevel>(
        "SELECT id, name, category_id FROM library_levels WHERE category_id = $1 ORDER BY name",
    )
    .bind(category_id)
    .fetch_all(db)
    .await
    .context("list library levels")?;
    Ok(rows)
}

pub async fn library_level(db: &PgPool, id: Uuid) -> anyhow::Result<Option<LibraryLevel>> {
    let row = sqlx::query_as::<_, LibraryLevel>(
        "SELECT id, name, category_id FROM library_levels WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find library level")?;
    Ok(row)
}

pub async fn library_subjects(db: &PgPool, level_id: Uuid) -> anyhow::Result<Vec<LibrarySubject>> {
    let rows = sqlx::query_as::<_, LibrarySubject>(
        "SELECT id, name, level_id FROM library_subjects WHERE level_id = $1 ORDER BY name",
    )
    .bind(level_id)
    .fetch_all(db)
    .await
    .context("list library subjects")?;
    Ok(rows)
}

pub async fn library_subject(db: &PgPool, id: Uuid) -> anyhow::Result<Option<LibrarySubject>> {
    let row = sqlx::query_as::<_, LibrarySubject>(
        "SELECT id, name, level_id FROM library_subjects WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find library subject")?;
    Ok(row)
}

// ---- Resources & purchases ----

/// All resources of one listing in display order, annotated with position and
/// `viewer` ownership (`None` never owns anything).
pub async fn list_resources(
    db: &PgPool,
    catalog: Catalog,
    listing_id: Uuid,
    viewer: Option<Uuid>,
) -> anyhow::Result<Vec<ResourceRow>> {
    let sql = format!(
        r#"
        SELECT r.id, r.title, r.resource_type, r.file_url, r.author, r.is_free, r.price,
               r.created_at, r.{listing} AS listing_id,
               ROW_NUMBER() OVER (ORDER BY r.created_at, r.id) - 1 AS position,
               EXISTS (
                   SELECT 1 FROM {purchases} p
                    WHERE p.resource_id = r.id AND p.user_id = $2
               ) AS owned
          FROM {resources} r
         WHERE r.{listing} = $1
         ORDER BY r.created_at, r.id
        "#,
        listing = catalog.listing_column(),
        purchases = catalog.purchases_table(),
        resources = catalog.resources_table(),
    );
    let rows = sqlx::query_as::<_, ResourceRow>(&sql)
        .bind(listing_id)
        .bind(viewer)
        .fetch_all(db)
        .await
        .with_context(|| format!("list {}", catalog.resources_table()))?;
    Ok(rows)
}

/// One resource with its position inside its own listing.
pub async fn find_resource<'e, E>(
    db: E,
    catalog: Catalog,
    resource_id: Uuid,
    viewer: Option<Uuid>,
) -> anyhow::Result<Option<ResourceRow>>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        SELECT ranked.*,
               EXISTS (
                   SELECT 1 FROM {purchases} p
                    WHERE p.resource_id = ranked.id AND p.user_id = $2
               ) AS owned
          FROM (
                SELECT r.id, r.title, r.resource_type, r.file_url, r.author, r.is_free, r.price,
                       r.created_at, r.{listing} AS listing_id,
                       ROW_NUMBER() OVER (ORDER BY r.created_at, r.id) - 1 AS position
                  FROM {resources} r
                 WHERE r.{listing} = (SELECT {listing} FROM {resources} WHERE id = $1)
               ) ranked
         WHERE ranked.id = $1
        "#,
        listing = catalog.listing_column(),
        purchases = catalog.purchases_table(),
        resources = catalog.resources_table(),
    );
    let row = sqlx::query_as::<_, ResourceRow>(&sql)
        .bind(resource_id)
        .bind(viewer)
        .fetch_optional(db)
        .await
        .with_context(|| format!("find {}", catalog.resources_table()))?;
    Ok(row)
}

/// `Ok(None)` when the (user, resource) pair already has a purchase.
pub async fn insert_purchase(
    conn: &mut PgConnection,
    catalog: Catalog,
    user_id: Uuid,
    resource_id: Uuid,
    amount_paid: f64,
) -> anyhow::Result<Option<Purchase>> {
    let sql = format!(
        r#"
        INSERT INTO {} (user_id, resource_id, amount_paid)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, resource_id, amount_paid, purchased_at
        "#,
        catalog.purchases_table()
    );
    let res = sqlx::query_as::<_, Purchase>(&sql)
        .bind(user_id)
        .bind(resource_id)
        .bind(amount_paid)
        .fetch_one(&mut *conn)
        .await;
    match res {
        Ok(p) => Ok(Some(p)),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e).context("insert purchase"),
    }
}

pub async fn count_purchases(db: &PgPool, catalog: Catalog, user_id: Uuid) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = $1",
        catalog.purchases_table()
    ))
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("count purchases")?;
    Ok(n)
}
