use std::future::Future;

use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::external::questrade::{QuestradeApiError, QuestradeClient};
use crate::models::{QtAccount, QtActivity, QtBalances, QtPosition, QuestradeConnection};

// Refresh proactively when the access token has less than this left.
const TOKEN_EXPIRY_MARGIN_MINUTES: i64 = 5;

pub async fn get_connection(pool: &PgPool, user_id: Uuid) -> Result<QuestradeConnection, AppError> {
    db::questrade_queries::fetch_by_user(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Questrade not connected".to_string()))
}

/// Exchange a user-supplied refresh token and persist the connection.
pub async fn connect(
    pool: &PgPool,
    client: &QuestradeClient,
    user_id: Uuid,
    refresh_token: &str,
) -> Result<QuestradeConnection, AppError> {
    if refresh_token.trim().is_empty() {
        return Err(AppError::Validation("Refresh token cannot be empty".into()));
    }

    let auth = client
        .exchange_refresh_token(refresh_token.trim())
        .await
        .map_err(|e| match e {
            QuestradeApiError::Unauthorized => {
                AppError::Validation("Invalid Questrade refresh token".to_string())
            }
            other => AppError::External(format!("Questrade authentication failed: {other}")),
        })?;

    let connection = save_auth(pool, user_id, &auth).await?;
    info!("Connected Questrade for user {}", user_id);
    Ok(connection)
}

pub async fn disconnect(pool: &PgPool, user_id: Uuid) -> Result<bool, AppError> {
    let deleted = db::questrade_queries::delete_by_user(pool, user_id).await?;
    Ok(deleted > 0)
}

async fn save_auth(
    pool: &PgPool,
    user_id: Uuid,
    auth: &crate::models::QtAuthResponse,
) -> Result<QuestradeConnection, AppError> {
    let expires_at = Utc::now() + Duration::seconds(auth.expires_in);
    let connection = db::questrade_queries::upsert(
        pool,
        user_id,
        &auth.access_token,
        &auth.refresh_token,
        &auth.api_server,
        expires_at,
    )
    .await?;
    Ok(connection)
}

/// Rotate the stored tokens. Questrade refresh tokens are single-use, so the
/// new pair must be persisted before anything else happens.
async fn refresh_connection(
    pool: &PgPool,
    client: &QuestradeClient,
    connection: &QuestradeConnection,
) -> Result<QuestradeConnection, AppError> {
    let auth = client
        .exchange_refresh_token(&connection.refresh_token)
        .await
        .map_err(|e| match e {
            QuestradeApiError::Unauthorized => AppError::DataUnavailable(
                "Questrade session expired; please reconnect".to_string(),
            ),
            other => AppError::External(format!("Failed to refresh Questrade token: {other}")),
        })?;
    save_auth(pool, connection.user_id, &auth).await
}

async fn ensure_valid_token(
    pool: &PgPool,
    client: &QuestradeClient,
    connection: QuestradeConnection,
) -> Result<QuestradeConnection, AppError> {
    if connection.token_expires_at < Utc::now() + Duration::minutes(TOKEN_EXPIRY_MARGIN_MINUTES) {
        info!("Questrade token near expiry for user {}, refreshing", connection.user_id);
        return refresh_connection(pool, client, &connection).await;
    }
    Ok(connection)
}

fn map_api_error(e: QuestradeApiError) -> AppError {
    match e {
        QuestradeApiError::Unauthorized => {
            AppError::DataUnavailable("Questrade session expired; please reconnect".to_string())
        }
        other => AppError::External(format!("Questrade API error: {other}")),
    }
}

// Runs an authenticated call; on a 401 the token is refreshed exactly once
// and the call retried before the failure propagates.
async fn call_with_refresh<T, F, Fut>(
    pool: &PgPool,
    client: &QuestradeClient,
    connection: QuestradeConnection,
    call: F,
) -> Result<T, AppError>
where
    F: Fn(String, String) -> Fut,
    Fut: Future<Output = Result<T, QuestradeApiError>>,
{
    let connection = ensure_valid_token(pool, client, connection).await?;

    match call(connection.api_server.clone(), connection.access_token.clone()).await {
        Ok(value) => Ok(value),
        Err(QuestradeApiError::Unauthorized) => {
            warn!("Questrade rejected access token for user {}, retrying after refresh", connection.user_id);
            let refreshed = refresh_connection(pool, client, &connection).await?;
            call(refreshed.api_server.clone(), refreshed.access_token.clone())
                .await
                .map_err(map_api_error)
        }
        Err(e) => Err(map_api_error(e)),
    }
}

pub async fn get_accounts(
    pool: &PgPool,
    client: &QuestradeClient,
    user_id: Uuid,
) -> Result<Vec<QtAccount>, AppError> {
    let connection = get_connection(pool, user_id).await?;
    let list = call_with_refresh(pool, client, connection, |server, token| async move {
        client.get_accounts(&server, &token).await
    })
    .await?;
    Ok(list.accounts)
}

pub async fn get_positions(
    pool: &PgPool,
    client: &QuestradeClient,
    user_id: Uuid,
    account_id: &str,
) -> Result<Vec<QtPosition>, AppError> {
    let connection = get_connection(pool, user_id).await?;
    let list = call_with_refresh(pool, client, connection, |server, token| async move {
        client.get_positions(&server, &token, account_id).await
    })
    .await?;
    Ok(list.positions)
}

pub async fn get_balances(
    pool: &PgPool,
    client: &QuestradeClient,
    user_id: Uuid,
    account_id: &str,
) -> Result<QtBalances, AppError> {
    let connection = get_connection(pool, user_id).await?;
    call_with_refresh(pool, client, connection, |server, token| async move {
        client.get_balances(&server, &token, account_id).await
    })
    .await
}

pub async fn get_activities(
    pool: &PgPool,
    client: &QuestradeClient,
    user_id: Uuid,
    account_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<QtActivity>, AppError> {
    let connection = get_connection(pool, user_id).await?;
    let list = call_with_refresh(pool, client, connection, |server, token| async move {
        client.get_activities(&server, &token, account_id, start, end).await
    })
    .await?;
    Ok(list.activities)
}
