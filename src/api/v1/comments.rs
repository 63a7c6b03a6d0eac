use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::api::common::ApiResponse;
use crate::api::v1::login::Claims;
use crate::api::v1::videos::find_video_by_id;
use crate::errors::AppError;
use crate::InnerState;

/// Comments are capped at tweet length; the store enforces the same bound
/// with a CHECK constraint.
const MAX_COMMENT_CHARS: usize = 140;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub user_id: String,
    pub video_id: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithAuthor {
    pub id: String,
    pub content: String,
    pub user_id: String,
    pub video_id: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: String,
}

/// Trims and bounds comment content. Counted in characters, not bytes, so
/// multi-byte text gets the same 140 the UI promises.
fn validate_content(raw: &str) -> Result<String, AppError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::Validation(String::from("Comment cannot be empty")));
    }
    let chars = content.chars().count();
    if chars > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment is {} characters, the limit is {}",
            chars, MAX_COMMENT_CHARS
        )));
    }
    Ok(content.to_string())
}

#[tracing::instrument(name = "Create comment", skip(inner, claims, payload), fields(video_id = %video_id, user_id = %claims.user_id))]
pub async fn create_comment(
    Extension(claims): Extension<Claims>,
    State(inner): State<InnerState>,
    Path(video_id): Path<String>,
    Json(payload): Json<CommentBody>,
) -> Result<(StatusCode, Json<ApiResponse<Comment>>), AppError> {
    let InnerState { db, .. } = inner;

    let content = validate_content(&payload.content)?;

    let video = find_video_by_id(&db, &video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video '{}' not found", video_id)))?;

    let uuid = Uuid::new_v4().to_string();
    let comment = sqlx::query_as::<_, Comment>(
        r#"INSERT INTO comments (id, content, user_id, video_id)
           VALUES ($1, $2, $3, $4)
           RETURNING *"#,
    )
    .bind(&uuid)
    .bind(&content)
    .bind(&claims.user_id)
    .bind(&video.id)
    .fetch_one(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to create comment")))?;

    tracing::info!("Created comment {} on video {}", comment.id, video.id);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(comment))))
}

/// Loads the comment and enforces that the caller created it. Ownership is
/// absolute: there is no moderator override in this rule set.
async fn find_owned_comment(
    pool: &PgPool,
    comment_id: &str,
    acting_user_id: &str,
) -> Result<Comment, AppError> {
    let comment = sqlx::query_as::<_, Comment>(r#"SELECT * FROM comments WHERE id = $1"#)
        .bind(comment_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to look up comment")))?
        .ok_or_else(|| AppError::NotFound(format!("Comment '{}' not found", comment_id)))?;

    if comment.user_id != acting_user_id {
        tracing::warn!(
            "User {} attempted to modify comment {} owned by {}",
            acting_user_id,
            comment_id,
            comment.user_id
        );
        return Err(AppError::Permission(anyhow::anyhow!(
            "You can only modify your own comments"
        )));
    }

    Ok(comment)
}

#[tracing::instrument(name = "Update comment", skip(inner, claims, payload), fields(comment_id = %comment_id, user_id = %claims.user_id))]
pub async fn update_comment(
    Extension(claims): Extension<Claims>,
    State(inner): State<InnerState>,
    Path(comment_id): Path<String>,
    Json(payload): Json<CommentBody>,
) -> Result<Json<ApiResponse<Comment>>, AppError> {
    let InnerState { db, .. } = inner;

    let content = validate_content(&payload.content)?;
    let comment = find_owned_comment(&db, &comment_id, &claims.user_id).await?;

    let updated = sqlx::query_as::<_, Comment>(
        r#"UPDATE comments SET content = $2, updated_at = CURRENT_TIMESTAMP
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(&comment.id)
    .bind(&content)
    .fetch_one(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to update comment")))?;

    tracing::info!("Updated comment {}", updated.id);
    Ok(Json(ApiResponse::success(updated)))
}

#[tracing::instrument(name = "Delete comment", skip(inner, claims), fields(comment_id = %comment_id, user_id = %claims.user_id))]
pub async fn delete_comment(
    Extension(claims): Extension<Claims>,
    State(inner): State<InnerState>,
    Path(comment_id): Path<String>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let InnerState { db, .. } = inner;

    let comment = find_owned_comment(&db, &comment_id, &claims.user_id).await?;

    sqlx::query(r#"DELETE FROM comments WHERE id = $1"#)
        .bind(&comment.id)
        .execute(&db)
        .await
        .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to delete comment")))?;

    tracing::info!("Deleted comment {}", comment.id);
    Ok(Json(ApiResponse::success(format!(
        "Comment '{}' deleted",
        comment.id
    ))))
}

pub(crate) async fn comments_for_video(
    pool: &PgPool,
    video_id: &str,
) -> Result<Vec<CommentWithAuthor>, AppError> {
    let rows = sqlx::query_as::<_, CommentWithAuthor>(
        r#"SELECT c.id, c.content, c.user_id, c.video_id,
                  u.first_name, u.last_name, u.image,
                  c.created_at, c.updated_at
           FROM comments c
           INNER JOIN users u ON u.id = c.user_id
           WHERE c.video_id = $1
           ORDER BY c.created_at"#,
    )
    .bind(video_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to list comments")))?;

    Ok(rows)
}

/// GET /videos/:video_id/comments
#[tracing::instrument(name = "List video comments", skip(inner), fields(video_id = %video_id))]
pub async fn video_comments(
    State(inner): State<InnerState>,
    Path(video_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<CommentWithAuthor>>>, AppError> {
    let InnerState { db, .. } = inner;

    let video = find_video_by_id(&db, &video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video '{}' not found", video_id)))?;

    let comments = comments_for_video(&db, &video.id).await?;
    Ok(Json(ApiResponse::success(comments)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_content_at_the_cap() {
        let content = "a".repeat(140);
        assert_eq!(validate_content(&content).unwrap(), content);
    }

    #[test]
    fn rejects_content_over_the_cap() {
        let content = "a".repeat(141);
        assert!(matches!(
            validate_content(&content),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rejects_blank_content() {
        assert!(matches!(
            validate_content("   "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 140 multi-byte characters are within the cap even though the byte
        // length is far larger.
        let content = "é".repeat(140);
        assert!(validate_content(&content).is_ok());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(validate_content("  nice aerial  ").unwrap(), "nice aerial");
    }
}
