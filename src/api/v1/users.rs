use axum::extract::State;
use axum::Json;
use chrono::NaiveDateTime;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::api::common::ApiResponse;
use crate::api::v1::login::{jwt_secret, Claims};
use crate::errors::AppError;
use crate::InnerState;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub image: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub image: Option<String>,
}

/// Looks up the account for a name pair, creating it on first login. A
/// concurrent first login for the same pair loses the insert race on the
/// `(first_name, last_name)` unique constraint and falls back to the row the
/// winner created.
#[tracing::instrument(name = "Find or create user", skip(pool, user), fields(first_name = %user.first_name, last_name = %user.last_name))]
pub async fn find_or_create_user(pool: &PgPool, user: NewUser) -> Result<User, AppError> {
    if let Some(existing) = find_user_by_name(pool, &user.first_name, &user.last_name).await? {
        tracing::debug!("Found existing user {}", existing.id);
        return Ok(existing);
    }

    let uuid = Uuid::new_v4().to_string();
    tracing::info!("Creating user with id {}", uuid);

    let inserted = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (id, first_name, last_name, email, image)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING *"#,
    )
    .bind(&uuid)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .bind(&user.image)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(created) => Ok(created),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
            tracing::debug!("Lost insert race for name pair, re-fetching");
            find_user_by_name(pool, &user.first_name, &user.last_name)
                .await?
                .ok_or_else(|| {
                    AppError::Database(anyhow::anyhow!(
                        "User vanished after unique violation on name pair"
                    ))
                })
        }
        Err(e) => Err(AppError::Database(
            anyhow::Error::from(e).context("Failed to create user"),
        )),
    }
}

pub async fn find_user_by_name(
    pool: &PgPool,
    first_name: &str,
    last_name: &str,
) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, User>(
        r#"SELECT * FROM users WHERE first_name = $1 AND last_name = $2"#,
    )
    .bind(first_name)
    .bind(last_name)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to look up user by name")))?;

    Ok(row)
}

pub async fn find_user_by_id(pool: &PgPool, user_id: &str) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to look up user by id")))?;

    Ok(row)
}

/// Decodes a session token down to the user id. Used where authentication is
/// optional and the middleware is not in front of the route.
pub fn get_user_id_from_token(token: &str) -> Result<String, AppError> {
    let secret = jwt_secret()?;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| AppError::Authentication(anyhow::anyhow!(e).context("Failed to decode token")))?;

    Ok(token_data.claims.user_id)
}

/// Directory listing backing the performer-tagging picker.
#[tracing::instrument(name = "List all users", skip(inner))]
pub async fn all_users(
    State(inner): State<InnerState>,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    let InnerState { db, .. } = inner;

    let users = sqlx::query_as::<_, User>(
        r#"SELECT * FROM users ORDER BY first_name, last_name"#,
    )
    .fetch_all(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to list users")))?;

    tracing::debug!("Returning {} users", users.len());
    Ok(Json(ApiResponse::success(users)))
}
