use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::api::common::utils::timeout_query;
use crate::api::common::{ApiResponse, PaginatedResponse, PaginationInfo, PaginationParams};
use crate::api::v1::acts::Act;
use crate::api::v1::comments::{comments_for_video, CommentWithAuthor};
use crate::api::v1::performers::{performers_for_video, VideoPerformerEntry};
use crate::api::v1::users::get_user_id_from_token;
use crate::api::v1::votes::{voters_for_video, VideoVoter};
use crate::api::v1::youtube::extract_youtube_id;
use crate::errors::AppError;
use crate::InnerState;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub youtube_url: String,
    pub youtube_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub act_id: String,
    pub submitted_by: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoRequest {
    pub youtube_url: String,
    pub title: String,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub act_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoWithAct {
    #[serde(flatten)]
    pub video: Video,
    pub act: Act,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    #[serde(flatten)]
    pub video: Video,
    pub act: Act,
    pub performers: Vec<VideoPerformerEntry>,
    pub voters: Vec<VideoVoter>,
    pub comments: Vec<CommentWithAuthor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListParams {
    pub act_id: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Validated insert shared by direct submission and the review-queue push.
#[derive(Debug)]
pub struct NewVideo {
    pub youtube_url: String,
    pub youtube_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub act_id: String,
    pub submitted_by: Option<String>,
}

pub(crate) async fn insert_video(pool: &PgPool, video: NewVideo) -> Result<Video, AppError> {
    let uuid = Uuid::new_v4().to_string();

    let inserted = sqlx::query_as::<_, Video>(
        r#"INSERT INTO videos (id, youtube_url, youtube_id, title, year, description, act_id, submitted_by)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
           RETURNING *"#,
    )
    .bind(&uuid)
    .bind(&video.youtube_url)
    .bind(&video.youtube_id)
    .bind(&video.title)
    .bind(video.year)
    .bind(&video.description)
    .bind(&video.act_id)
    .bind(&video.submitted_by)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(created) => Ok(created),
        // Act existence is enforced by the foreign key, not pre-checked.
        Err(sqlx::Error::Database(db_err))
            if db_err.code().as_deref() == Some("23503")
                && db_err.constraint() == Some("videos_act_id_fkey") =>
        {
            Err(AppError::Validation(format!(
                "Act '{}' does not exist",
                video.act_id
            )))
        }
        Err(e) => Err(AppError::Database(
            anyhow::Error::from(e).context("Failed to create video"),
        )),
    }
}

pub(crate) async fn find_video_by_id(
    pool: &PgPool,
    video_id: &str,
) -> Result<Option<Video>, AppError> {
    let row = sqlx::query_as::<_, Video>(r#"SELECT * FROM videos WHERE id = $1"#)
        .bind(video_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to look up video")))?;

    Ok(row)
}

pub(crate) async fn videos_for_act(pool: &PgPool, act_id: &str) -> Result<Vec<Video>, AppError> {
    let rows = sqlx::query_as::<_, Video>(
        r#"SELECT * FROM videos WHERE act_id = $1 ORDER BY created_at DESC"#,
    )
    .bind(act_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to list act videos")))?;

    Ok(rows)
}

async fn act_for_video(pool: &PgPool, act_id: &str) -> Result<Act, AppError> {
    let act = sqlx::query_as::<_, Act>(r#"SELECT * FROM acts WHERE id = $1"#)
        .bind(act_id)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to load act for video")))?;

    Ok(act)
}

/// Submission endpoint. Works with or without a session; a session only
/// determines whether `submittedBy` is recorded.
#[tracing::instrument(name = "Create video", skip(cookies, inner, payload))]
pub async fn create_video(
    cookies: Cookies,
    State(inner): State<InnerState>,
    Json(payload): Json<CreateVideoRequest>,
) -> Result<(StatusCode, Json<ApiResponse<VideoWithAct>>), AppError> {
    let InnerState { db, .. } = inner;

    let submitted_by = cookies
        .get("auth-token")
        .and_then(|c| get_user_id_from_token(c.value()).ok());

    let title = payload.title.trim();
    if title.is_empty() {
        tracing::warn!("Rejected video submission with empty title");
        return Err(AppError::Validation(String::from("Title is required")));
    }

    let act_id = match payload.act_id.as_deref().map(str::trim) {
        Some(act_id) if !act_id.is_empty() => act_id.to_string(),
        _ => {
            tracing::warn!("Rejected video submission without an act");
            return Err(AppError::Validation(String::from("An act is required")));
        }
    };

    let youtube_id = extract_youtube_id(&payload.youtube_url)?;
    tracing::debug!("Extracted youtube id {} for submission", youtube_id);

    let video = insert_video(
        &db,
        NewVideo {
            youtube_url: payload.youtube_url,
            youtube_id,
            title: title.to_string(),
            year: payload.year,
            description: payload.description,
            act_id,
            submitted_by,
        },
    )
    .await?;

    let act = act_for_video(&db, &video.act_id).await?;

    tracing::info!("Created video {} under act {}", video.id, act.name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(VideoWithAct { video, act })),
    ))
}

/// Catalog listing with act filter, free-text search and pagination.
#[tracing::instrument(name = "List videos", skip(inner, params))]
pub async fn all_videos(
    State(inner): State<InnerState>,
    Query(params): Query<VideoListParams>,
) -> Result<Json<PaginatedResponse<VideoWithAct>>, AppError> {
    let InnerState { db, .. } = inner;
    let fetch_timeout = tokio::time::Duration::from_millis(10000);

    let (page, limit, offset) = PaginationParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve();
    let act_filter = params.act_id.filter(|a| !a.trim().is_empty());
    let search = params
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let total = timeout_query(
        fetch_timeout,
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM videos v
               WHERE ($1::text IS NULL OR v.act_id = $1)
                 AND ($2::text IS NULL
                      OR v.title ILIKE '%' || $2 || '%'
                      OR v.description ILIKE '%' || $2 || '%')"#,
        )
        .bind(&act_filter)
        .bind(&search)
        .fetch_one(&db),
    )
    .await?;

    let videos = timeout_query(
        fetch_timeout,
        sqlx::query_as::<_, Video>(
            r#"SELECT v.* FROM videos v
               WHERE ($1::text IS NULL OR v.act_id = $1)
                 AND ($2::text IS NULL
                      OR v.title ILIKE '%' || $2 || '%'
                      OR v.description ILIKE '%' || $2 || '%')
               ORDER BY v.created_at DESC
               LIMIT $3 OFFSET $4"#,
        )
        .bind(&act_filter)
        .bind(&search)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&db),
    )
    .await?;

    let mut items = Vec::with_capacity(videos.len());
    for video in videos {
        let act = act_for_video(&db, &video.act_id).await?;
        items.push(VideoWithAct { video, act });
    }

    tracing::debug!("Returning {} of {} videos", items.len(), total);
    Ok(Json(PaginatedResponse::new(
        items,
        PaginationInfo::new(page, limit, total),
    )))
}

/// Video detail with everything the watch page needs: act, performer tags,
/// weighted voters and comments.
#[tracing::instrument(name = "Get video by id", skip(inner), fields(video_id = %video_id))]
pub async fn get_video(
    State(inner): State<InnerState>,
    Path(video_id): Path<String>,
) -> Result<Json<ApiResponse<VideoDetail>>, AppError> {
    let InnerState { db, .. } = inner;

    let video = find_video_by_id(&db, &video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video '{}' not found", video_id)))?;

    let act = act_for_video(&db, &video.act_id).await?;
    let performers = performers_for_video(&db, &video_id).await?;
    let voters = voters_for_video(&db, &video_id).await?;
    let comments = comments_for_video(&db, &video_id).await?;

    Ok(Json(ApiResponse::success(VideoDetail {
        video,
        act,
        performers,
        voters,
        comments,
    })))
}
