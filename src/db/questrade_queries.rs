use sqlx::PgPool;
use uuid::Uuid;
use crate::models::QuestradeConnection;

const CONNECTION_COLUMNS: &str =
    "id, user_id, access_token, refresh_token, api_server, token_expires_at,
     last_sync_at, created_at, updated_at";

pub async fn fetch_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<QuestradeConnection>, sqlx::Error> {
    sqlx::query_as::<_, QuestradeConnection>(&format!(
        "SELECT {CONNECTION_COLUMNS} FROM questrade_connections WHERE user_id = $1"
    ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

// One connection per user; token refreshes overwrite in place.
pub async fn upsert(
    pool: &PgPool,
    user_id: Uuid,
    access_token: &str,
    refresh_token: &str,
    api_server: &str,
    token_expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<QuestradeConnection, sqlx::Error> {
    sqlx::query_as::<_, QuestradeConnection>(&format!(
        "INSERT INTO questrade_connections
             (id, user_id, access_token, refresh_token, api_server, token_expires_at, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, NOW())
         ON CONFLICT (user_id)
         DO UPDATE SET access_token = EXCLUDED.access_token,
                       refresh_token = EXCLUDED.refresh_token,
                       api_server = EXCLUDED.api_server,
                       token_expires_at = EXCLUDED.token_expires_at,
                       updated_at = NOW()
         RETURNING {CONNECTION_COLUMNS}"
    ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(api_server)
        .bind(token_expires_at)
        .fetch_one(pool)
        .await
}

pub async fn record_sync(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE questrade_connections SET last_sync_at = NOW(), updated_at = NOW() WHERE user_id = $1"
    )
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_by_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questrade_connections WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
