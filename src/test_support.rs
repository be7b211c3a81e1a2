//! Fixtures for tests that run against a migrated database.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{credentials::hash_password, repo::NewUser, User};

pub const PASSWORD: &str = "past-questions-2024";

pub async fn insert_user(db: &PgPool, username: &str) -> User {
    let email = format!("{username}@studyhub.test");
    let hash = hash_password(PASSWORD).unwrap();
    let token = Uuid::new_v4().to_string();
    User::create(
        db,
        NewUser {
            username,
            name: username,
            email: &email,
            password_hash: &hash,
            verification_token: &token,
        },
    )
    .await
    .unwrap()
    .expect("fresh username")
}

/// A course listing of `count` paid resources, returned in display order.
pub async fn paid_course_listing(db: &PgPool, count: i32, price: f64) -> Vec<Uuid> {
    let category: Uuid =
        sqlx::query_scalar("INSERT INTO course_categories (name) VALUES ('JHS') RETURNING id")
            .fetch_one(db)
            .await
            .unwrap();
    let course: Uuid = sqlx::query_scalar(
        "INSERT INTO courses (name, category_id) VALUES ('General Science', $1) RETURNING id",
    )
    .bind(category)
    .fetch_one(db)
    .await
    .unwrap();
    let level: Uuid = sqlx::query_scalar(
        "INSERT INTO levels (name, position, course_id) VALUES ('JHS 2', 2, $1) RETURNING id",
    )
    .bind(course)
    .fetch_one(db)
    .await
    .unwrap();
    let subject: Uuid = sqlx::query_scalar(
        "INSERT INTO subjects (name, subject_type) VALUES ('Integrated Science', 'core') RETURNING id",
    )
    .fetch_one(db)
    .await
    .unwrap();
    let listing: Uuid = sqlx::query_scalar(
        "INSERT INTO level_subjects (level_id, subject_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(level)
    .bind(subject)
    .fetch_one(db)
    .await
    .unwrap();

    let mut ids = Vec::new();
    for i in 0..count {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO resources (title, file_url, is_free, price, created_at, level_subject_id)
            VALUES ($1, $2, FALSE, $3, now() + make_interval(secs => $4), $5)
            RETURNING id
            "#,
        )
        .bind(format!("Past Questions {}", 2015 + i))
        .bind(format!("/files/pq-{i}.pdf"))
        .bind(price)
        .bind(f64::from(i))
        .bind(listing)
        .fetch_one(db)
        .await
        .unwrap();
        ids.push(id);
    }
    ids
}
