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

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub user_id: String,
    pub act_id: String,
    pub video_id: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub video_id: String,
}

#[derive(Debug, Serialize)]
pub struct CastVoteResponse {
    pub success: bool,
    pub outcome: &'static str,
    pub data: Vote,
}

/// A voter as shown on a video page. The weight is derived at read time and
/// never stored: 2 when the voter is tagged as a performer of this video,
/// 1 otherwise.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoVoter {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub weight: i32,
}

#[derive(Debug, FromRow)]
pub(crate) struct VoterRow {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub is_performer: bool,
}

pub(crate) fn vote_weight(is_performer: bool) -> i32 {
    if is_performer {
        2
    } else {
        1
    }
}

pub(crate) fn weigh_voters(rows: Vec<VoterRow>) -> Vec<VideoVoter> {
    rows.into_iter()
        .map(|row| VideoVoter {
            weight: vote_weight(row.is_performer),
            user_id: row.user_id,
            first_name: row.first_name,
            last_name: row.last_name,
            image: row.image,
        })
        .collect()
}

/// A vote is keyed by `(user, act)`, not `(user, video)`: voting for a second
/// video of the same act repoints the existing vote instead of adding one.
#[tracing::instrument(name = "Cast vote", skip(inner, claims, payload), fields(user_id = %claims.user_id))]
pub async fn cast_vote(
    Extension(claims): Extension<Claims>,
    State(inner): State<InnerState>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<(StatusCode, Json<CastVoteResponse>), AppError> {
    let InnerState { db, .. } = inner;

    let video = find_video_by_id(&db, &payload.video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video '{}' not found", payload.video_id)))?;

    tracing::debug!(
        "Vote targets video {} under act {}",
        video.id,
        video.act_id
    );

    let existing = sqlx::query_as::<_, Vote>(
        r#"SELECT * FROM votes WHERE user_id = $1 AND act_id = $2"#,
    )
    .bind(&claims.user_id)
    .bind(&video.act_id)
    .fetch_optional(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to look up existing vote")))?;

    if let Some(existing) = existing {
        let updated = sqlx::query_as::<_, Vote>(
            r#"UPDATE votes SET video_id = $2, updated_at = CURRENT_TIMESTAMP
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(&existing.id)
        .bind(&video.id)
        .fetch_one(&db)
        .await
        .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to repoint vote")))?;

        tracing::info!(
            "Repointed vote {} from video {} to {}",
            updated.id,
            existing.video_id,
            video.id
        );
        return Ok((
            StatusCode::OK,
            Json(CastVoteResponse {
                success: true,
                outcome: "updated",
                data: updated,
            }),
        ));
    }

    let uuid = Uuid::new_v4().to_string();
    let inserted = sqlx::query_as::<_, Vote>(
        r#"INSERT INTO votes (id, user_id, act_id, video_id)
           VALUES ($1, $2, $3, $4)
           RETURNING *"#,
    )
    .bind(&uuid)
    .bind(&claims.user_id)
    .bind(&video.act_id)
    .bind(&video.id)
    .fetch_one(&db)
    .await;

    let created = match inserted {
        Ok(vote) => vote,
        // A concurrent first cast for the same (user, act) pair loses here;
        // the unique constraint is the only guard, by design.
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
            tracing::warn!(
                "Concurrent vote for user {} on act {}",
                claims.user_id,
                video.act_id
            );
            return Err(AppError::Conflict(String::from(
                "A vote for this act was cast concurrently, retry to repoint it",
            )));
        }
        Err(e) => {
            return Err(AppError::Database(
                anyhow::Error::from(e).context("Failed to create vote"),
            ))
        }
    };

    tracing::info!("Created vote {} for video {}", created.id, video.id);
    Ok((
        StatusCode::CREATED,
        Json(CastVoteResponse {
            success: true,
            outcome: "created",
            data: created,
        }),
    ))
}

/// Withdraws the caller's vote for an act. No cascading effects.
#[tracing::instrument(name = "Remove vote", skip(inner, claims), fields(user_id = %claims.user_id, act_id = %act_id))]
pub async fn remove_vote(
    Extension(claims): Extension<Claims>,
    State(inner): State<InnerState>,
    Path(act_id): Path<String>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let InnerState { db, .. } = inner;

    let result = sqlx::query(r#"DELETE FROM votes WHERE user_id = $1 AND act_id = $2"#)
        .bind(&claims.user_id)
        .bind(&act_id)
        .execute(&db)
        .await
        .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to delete vote")))?;

    if result.rows_affected() == 0 {
        tracing::warn!("No vote to remove for act {}", act_id);
        return Err(AppError::NotFound(format!(
            "No vote found for act '{}'",
            act_id
        )));
    }

    tracing::info!("Removed vote for act {}", act_id);
    Ok(Json(ApiResponse::success(format!(
        "Vote for act '{}' removed",
        act_id
    ))))
}

/// The caller's own votes, most recent first.
#[tracing::instrument(name = "List own votes", skip(inner, claims), fields(user_id = %claims.user_id))]
pub async fn my_votes(
    Extension(claims): Extension<Claims>,
    State(inner): State<InnerState>,
) -> Result<Json<ApiResponse<Vec<Vote>>>, AppError> {
    let InnerState { db, .. } = inner;

    let votes = sqlx::query_as::<_, Vote>(
        r#"SELECT * FROM votes WHERE user_id = $1 ORDER BY updated_at DESC"#,
    )
    .bind(&claims.user_id)
    .fetch_all(&db)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to list votes")))?;

    Ok(Json(ApiResponse::success(votes)))
}

pub(crate) async fn voters_for_video(
    pool: &PgPool,
    video_id: &str,
) -> Result<Vec<VideoVoter>, AppError> {
    let rows = sqlx::query_as::<_, VoterRow>(
        r#"SELECT u.id AS user_id, u.first_name, u.last_name, u.image,
                  (vp.user_id IS NOT NULL) AS is_performer
           FROM votes vo
           INNER JOIN users u ON u.id = vo.user_id
           LEFT JOIN video_performers vp
                  ON vp.video_id = vo.video_id AND vp.user_id = vo.user_id
           WHERE vo.video_id = $1
           ORDER BY vo.created_at"#,
    )
    .bind(video_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Database(anyhow::Error::from(e).context("Failed to list voters")))?;

    Ok(weigh_voters(rows))
}

/// GET /videos/:video_id/voters
#[tracing::instrument(name = "List video voters", skip(inner), fields(video_id = %video_id))]
pub async fn video_voters(
    State(inner): State<InnerState>,
    Path(video_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<VideoVoter>>>, AppError> {
    let InnerState { db, .. } = inner;

    let video = find_video_by_id(&db, &video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video '{}' not found", video_id)))?;

    let voters = voters_for_video(&db, &video.id).await?;
    Ok(Json(ApiResponse::success(voters)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performer_votes_count_double() {
        assert_eq!(vote_weight(true), 2);
        assert_eq!(vote_weight(false), 1);
    }

    #[test]
    fn weigh_voters_maps_performer_flag() {
        let rows = vec![
            VoterRow {
                user_id: "u1".into(),
                first_name: "Norma".into(),
                last_name: "Miller".into(),
                image: None,
                is_performer: true,
            },
            VoterRow {
                user_id: "u2".into(),
                first_name: "Al".into(),
                last_name: "Minns".into(),
                image: None,
                is_performer: false,
            },
        ];

        let voters = weigh_voters(rows);
        assert_eq!(voters.len(), 2);
        assert_eq!(voters[0].weight, 2);
        assert_eq!(voters[1].weight, 1);
    }
}
