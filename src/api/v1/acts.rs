use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::common::utils::timeout_query;
use crate::api::common::ApiResponse;
use crate::api::v1::videos::{videos_for_act, Video};
use crate::errors::AppError;
use crate::InnerState;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Act {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertActRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActWithVideos {
    #[serde(flatten)]
    pub act: Act,
    pub videos: Vec<Video>,
}

/// One tally line of an act's results: weighted points plus the raw ballot
/// count, recomputed from votes and performer links on every read.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActResultEntry {
    pub video_id: String,
    pub title: String,
    pub youtube_id: String,
    pub points: i64,
    pub ballots: i64,
}

#[tracing::instrument(name = "List all acts", skip(inner))]
pub async fn all_acts(
    State(inner): State<InnerState>,
) -> Result<Json<ApiResponse<Vec<Act>>>, AppError> {
    let InnerState { db, .. } = inner;
    let fetch_timeout = tokio::time::Duration::from_millis(10000);

    let acts = timeout_query(
        fetch_timeout,
        sqlx::query_as::<_, Act>(r#"SELECT * FROM acts ORDER BY name"#).fetch_all(&db),
    )
    .await?;

    Ok(Json(ApiResponse::success(acts)))
}

/// Acts are addressed by name: seeding the same name twice refreshes the
/// description instead of failing or duplicating.
#[tracing::instrument(name = "Upsert act", skip(inner, payload))]
pub async fn upsert_act(
    State(inner): State<InnerState>,
    Json(payload): Json<UpsertActRequest>,
) -> Result<Json<ApiResponse<Act>>, AppError> {
    let InnerState { db, .. } = inner;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(String::from("Act name is required")));
    }

    let uuid = Uuid::new_v4().to_string();
    let act = sqlx::query_as::<_, Act>(
        r#"INSERT INTO acts (id, name, description)
           VALUES ($1, $2, $3)
           ON CONFLICT (name)
           DO UPDATE
           SET description = EXCLUDED.description,
               updated_at = CURRENT_TIMESTAMP
           RETURNING *"#,
    )
    .bind(&uuid)
    .bind(name)
    .bind(&payload.description)
    .fetch_one(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to upsert act")))?;

    tracing::info!("Upserted act '{}' ({})", act.name, act.id);
    Ok(Json(ApiResponse::success(act)))
}

#[tracing::instrument(name = "Get act by id", skip(inner), fields(act_id = %act_id))]
pub async fn get_act(
    State(inner): State<InnerState>,
    Path(act_id): Path<String>,
) -> Result<Json<ApiResponse<ActWithVideos>>, AppError> {
    let InnerState { db, .. } = inner;

    let act = sqlx::query_as::<_, Act>(r#"SELECT * FROM acts WHERE id = $1"#)
        .bind(&act_id)
        .fetch_optional(&db)
        .await
        .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to look up act")))?
        .ok_or_else(|| AppError::NotFound(format!("Act '{}' not found", act_id)))?;

    let videos = videos_for_act(&db, &act.id).await?;

    Ok(Json(ApiResponse::success(ActWithVideos { act, videos })))
}

/// Weighted standings for an act. A ballot counts double when its voter is
/// tagged as a performer of the video it points at; nothing here is stored.
#[tracing::instrument(name = "Get act results", skip(inner), fields(act_id = %act_id))]
pub async fn act_results(
    State(inner): State<InnerState>,
    Path(act_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ActResultEntry>>>, AppError> {
    let InnerState { db, .. } = inner;

    let act_exists = sqlx::query_scalar::<_, String>(r#"SELECT id FROM acts WHERE id = $1"#)
        .bind(&act_id)
        .fetch_optional(&db)
        .await
        .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to look up act")))?;

    if act_exists.is_none() {
        return Err(AppError::NotFound(format!("Act '{}' not found", act_id)));
    }

    let results = sqlx::query_as::<_, ActResultEntry>(
        r#"SELECT v.id AS video_id, v.title, v.youtube_id,
                  SUM(CASE WHEN vp.user_id IS NOT NULL THEN 2 ELSE 1 END) AS points,
                  COUNT(*) AS ballots
           FROM votes vo
           INNER JOIN videos v ON v.id = vo.video_id
           LEFT JOIN video_performers vp
                  ON vp.video_id = vo.video_id AND vp.user_id = vo.user_id
           WHERE vo.act_id = $1
           GROUP BY v.id, v.title, v.youtube_id
           ORDER BY points DESC, ballots DESC, v.title"#,
    )
    .bind(&act_id)
    .fetch_all(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to compute act results")))?;

    tracing::debug!("Computed results for {} videos", results.len());
    Ok(Json(ApiResponse::success(results)))
}
