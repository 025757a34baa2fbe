use sqlx::PgPool;
use uuid::Uuid;
use crate::models::User;

pub async fn insert(pool: &PgPool, user: User) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, hashed_password, full_name, is_active, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id, email, hashed_password, full_name, is_active, created_at"
    )
        .bind(user.id)
        .bind(user.email)
        .bind(user.hashed_password)
        .bind(user.full_name)
        .bind(user.is_active)
        .bind(user.created_at)
        .fetch_one(pool)
        .await
}

pub async fn fetch_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, email, hashed_password, full_name, is_active, created_at
         FROM users
         WHERE email = $1"
    )
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, email, hashed_password, full_name, is_active, created_at
         FROM users
         WHERE id = $1"
    )
        .bind(id)
        .fetch_optional(pool)
        .await
}
