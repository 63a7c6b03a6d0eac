use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::api::common::ApiResponse;
use crate::api::v1::login::Claims;
use crate::api::v1::videos::find_video_by_id;
use crate::errors::AppError;
use crate::InnerState;

/// A performer tag joined with the tagged user's directory entry.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VideoPerformerEntry {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub tagged_by_id: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPerformersRequest {
    pub performer_ids: Vec<String>,
}

/// Tagging only ever adds links. Ids that are already tagged are skipped by
/// the conflict clause, and there is deliberately no removal endpoint: the
/// performer set of a video is a one-way record.
#[tracing::instrument(name = "Add video performers", skip(inner, claims, payload), fields(video_id = %video_id, acting_user = %claims.user_id))]
pub async fn add_performers(
    Extension(claims): Extension<Claims>,
    State(inner): State<InnerState>,
    Path(video_id): Path<String>,
    Json(payload): Json<AddPerformersRequest>,
) -> Result<Json<ApiResponse<Vec<VideoPerformerEntry>>>, AppError> {
    let InnerState { db, .. } = inner;

    let video = find_video_by_id(&db, &video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video '{}' not found", video_id)))?;

    let mut tx = db
        .begin()
        .await
        .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to begin transaction")))?;

    let mut inserted = 0_u64;
    for performer_id in &payload.performer_ids {
        let result = sqlx::query(
            r#"INSERT INTO video_performers (video_id, user_id, tagged_by_id)
               VALUES ($1, $2, $3)
               ON CONFLICT (video_id, user_id) DO NOTHING"#,
        )
        .bind(&video.id)
        .bind(performer_id)
        .bind(&claims.user_id)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(res) => inserted += res.rows_affected(),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23503") => {
                tx.rollback().await.ok();
                return Err(AppError::Validation(format!(
                    "User '{}' does not exist",
                    performer_id
                )));
            }
            Err(e) => {
                tx.rollback().await.ok();
                return Err(AppError::Database(
                    anyhow::Error::from(e).context("Failed to tag performer"),
                ));
            }
        }
    }

    tx.commit()
        .await
        .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to commit performer tags")))?;

    tracing::info!(
        "Tagged {} new performers on video {} ({} submitted)",
        inserted,
        video.id,
        payload.performer_ids.len()
    );

    // Callers want the whole current set, not just the delta.
    let performers = performers_for_video(&db, &video.id).await?;
    Ok(Json(ApiResponse::success(performers)))
}

pub(crate) async fn performers_for_video(
    pool: &PgPool,
    video_id: &str,
) -> Result<Vec<VideoPerformerEntry>, AppError> {
    let rows = sqlx::query_as::<_, VideoPerformerEntry>(
        r#"SELECT vp.user_id, u.first_name, u.last_name, u.image,
                  vp.tagged_by_id, vp.created_at
           FROM video_performers vp
           INNER JOIN users u ON u.id = vp.user_id
           WHERE vp.video_id = $1
           ORDER BY vp.created_at"#,
    )
    .bind(video_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to list performers")))?;

    Ok(rows)
}

/// GET /videos/:video_id/performers
#[tracing::instrument(name = "List video performers", skip(inner), fields(video_id = %video_id))]
pub async fn video_performers(
    State(inner): State<InnerState>,
    Path(video_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<VideoPerformerEntry>>>, AppError> {
    let InnerState { db, .. } = inner;

    let video = find_video_by_id(&db, &video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video '{}' not found", video_id)))?;

    let performers = performers_for_video(&db, &video.id).await?;
    Ok(Json(ApiResponse::success(performers)))
}
