use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::common::{PaginatedResponse, PaginationInfo, PaginationParams};
use crate::api::common::ApiResponse;
use crate::api::v1::videos::{insert_video, NewVideo, Video};
use crate::api::v1::youtube::extract_youtube_id;
use crate::errors::AppError;
use crate::InnerState;

/// Review states of a scraped candidate. Every transition is an explicit
/// operator action; nothing in the system advances a status on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveredStatus {
    Pending,
    Approved,
    Rejected,
    Pushed,
}

impl DiscoveredStatus {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "PUSHED" => Ok(Self::Pushed),
            other => Err(AppError::Validation(format!(
                "Unknown status '{}', expected PENDING, APPROVED, REJECTED or PUSHED",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Pushed => "PUSHED",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredVideo {
    pub id: String,
    pub youtube_url: String,
    pub youtube_id: String,
    pub title: Option<String>,
    pub channel_name: Option<String>,
    pub act_hint: Option<String>,
    pub status: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestDiscoveredRequest {
    pub youtube_url: String,
    pub title: Option<String>,
    pub channel_name: Option<String>,
    pub act_hint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiscoveredListParams {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushDiscoveredRequest {
    pub act_id: String,
    pub title: Option<String>,
}

/// Ingest surface for the discovery scraper. Re-running the scraper over the
/// same channel is safe: duplicates land on the youtube_id unique index.
#[tracing::instrument(name = "Ingest discovered video", skip(inner, payload))]
pub async fn ingest_discovered(
    State(inner): State<InnerState>,
    Json(payload): Json<IngestDiscoveredRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DiscoveredVideo>>), AppError> {
    let InnerState { db, .. } = inner;

    let youtube_id = extract_youtube_id(&payload.youtube_url)?;
    let uuid = Uuid::new_v4().to_string();

    let inserted = sqlx::query_as::<_, DiscoveredVideo>(
        r#"INSERT INTO discovered_videos (id, youtube_url, youtube_id, title, channel_name, act_hint, status)
           VALUES ($1, $2, $3, $4, $5, $6, 'PENDING')
           RETURNING *"#,
    )
    .bind(&uuid)
    .bind(&payload.youtube_url)
    .bind(&youtube_id)
    .bind(&payload.title)
    .bind(&payload.channel_name)
    .bind(&payload.act_hint)
    .fetch_one(&db)
    .await;

    let item = match inserted {
        Ok(item) => item,
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
            tracing::debug!("Video {} already in the review queue", youtube_id);
            return Err(AppError::Conflict(format!(
                "Video '{}' is already in the review queue",
                youtube_id
            )));
        }
        Err(e) => {
            return Err(AppError::Database(
                anyhow::Error::from(e).context("Failed to ingest discovered video"),
            ))
        }
    };

    tracing::info!("Queued discovered video {} ({})", item.id, youtube_id);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

/// Review queue listing, newest first, filtered to PENDING unless another
/// status is requested.
#[tracing::instrument(name = "List discovered videos", skip(inner, params))]
pub async fn all_discovered(
    State(inner): State<InnerState>,
    Query(params): Query<DiscoveredListParams>,
) -> Result<Json<PaginatedResponse<DiscoveredVideo>>, AppError> {
    let InnerState { db, .. } = inner;

    let status = match params.status.as_deref() {
        Some(raw) => DiscoveredStatus::parse(raw)?,
        None => DiscoveredStatus::Pending,
    };
    let (page, limit, offset) = PaginationParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve();

    let total = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM discovered_videos WHERE status = $1"#,
    )
    .bind(status.as_str())
    .fetch_one(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to count review queue")))?;

    let items = sqlx::query_as::<_, DiscoveredVideo>(
        r#"SELECT * FROM discovered_videos
           WHERE status = $1
           ORDER BY created_at DESC
           LIMIT $2 OFFSET $3"#,
    )
    .bind(status.as_str())
    .bind(limit as i64)
    .bind(offset)
    .fetch_all(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to list review queue")))?;

    Ok(Json(PaginatedResponse::new(
        items,
        PaginationInfo::new(page, limit, total),
    )))
}

/// Manual review decision. The status field only ever moves because someone
/// called this (or the push below); there is no automatic transition logic.
#[tracing::instrument(name = "Update discovered status", skip(inner, payload), fields(id = %id))]
pub async fn update_discovered_status(
    State(inner): State<InnerState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<DiscoveredVideo>>, AppError> {
    let InnerState { db, .. } = inner;

    let status = DiscoveredStatus::parse(&payload.status)?;

    let updated = sqlx::query_as::<_, DiscoveredVideo>(
        r#"UPDATE discovered_videos
           SET status = $2, updated_at = CURRENT_TIMESTAMP
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(&id)
    .bind(status.as_str())
    .fetch_optional(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to update review status")))?
    .ok_or_else(|| AppError::NotFound(format!("Discovered video '{}' not found", id)))?;

    tracing::info!("Marked discovered video {} as {}", updated.id, status.as_str());
    Ok(Json(ApiResponse::success(updated)))
}

/// Promotes a reviewed item into the catalog through the same validation
/// path as a direct submission, then marks it PUSHED.
#[tracing::instrument(name = "Push discovered video", skip(inner, payload), fields(id = %id))]
pub async fn push_discovered(
    State(inner): State<InnerState>,
    Path(id): Path<String>,
    Json(payload): Json<PushDiscoveredRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Video>>), AppError> {
    let InnerState { db, .. } = inner;

    let item = sqlx::query_as::<_, DiscoveredVideo>(
        r#"SELECT * FROM discovered_videos WHERE id = $1"#,
    )
    .bind(&id)
    .fetch_optional(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to look up discovered video")))?
    .ok_or_else(|| AppError::NotFound(format!("Discovered video '{}' not found", id)))?;

    if DiscoveredStatus::parse(&item.status)? == DiscoveredStatus::Pushed {
        return Err(AppError::Conflict(format!(
            "Discovered video '{}' was already pushed",
            id
        )));
    }

    let act_id = payload.act_id.trim();
    if act_id.is_empty() {
        return Err(AppError::Validation(String::from("An act is required")));
    }

    let title = payload
        .title
        .as_deref()
        .or(item.title.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation(String::from("Title is required")))?;

    // Same validator as a direct submission, including the id re-extraction.
    let youtube_id = extract_youtube_id(&item.youtube_url)?;

    let video = insert_video(
        &db,
        NewVideo {
            youtube_url: item.youtube_url.clone(),
            youtube_id,
            title,
            year: None,
            description: None,
            act_id: act_id.to_string(),
            submitted_by: None,
        },
    )
    .await?;

    sqlx::query(
        r#"UPDATE discovered_videos
           SET status = 'PUSHED', updated_at = CURRENT_TIMESTAMP
           WHERE id = $1"#,
    )
    .bind(&item.id)
    .execute(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to mark item as pushed")))?;

    tracing::info!(
        "Pushed discovered video {} into the catalog as {}",
        item.id,
        video.id
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::success(video))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_known_statuses() {
        for raw in ["PENDING", "APPROVED", "REJECTED", "PUSHED"] {
            let status = DiscoveredStatus::parse(raw).unwrap();
            assert_eq!(status.as_str(), raw);
        }
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(matches!(
            DiscoveredStatus::parse("ARCHIVED"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rejects_lowercase_status() {
        assert!(matches!(
            DiscoveredStatus::parse("pending"),
            Err(AppError::Validation(_))
        ));
    }
}
