//! V1 API route definitions.
//!
//! Browsing the catalog and submitting a video are open to anonymous
//! visitors; everything that acts on behalf of a user (voting, tagging,
//! commenting, the review queue) sits behind the auth middleware.

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::api::common::middleware::auth_middleware;
use crate::api::v1::acts::{act_results, all_acts, get_act, upsert_act};
use crate::api::v1::comments::{create_comment, delete_comment, update_comment, video_comments};
use crate::api::v1::discovered::{
    all_discovered, ingest_discovered, push_discovered, update_discovered_status,
};
use crate::api::v1::login::{authorize, logout_user, me};
use crate::api::v1::performers::{add_performers, video_performers};
use crate::api::v1::users::all_users;
use crate::api::v1::videos::{all_videos, create_video, get_video};
use crate::api::v1::votes::{cast_vote, my_votes, remove_vote, video_voters};
use crate::api::v1::youtube::youtube_preview;
use crate::InnerState;

#[tracing::instrument(name = "create_v1_routes", skip(state))]
pub fn create_v1_routes(state: InnerState) -> Router {
    tracing::info!("Setting up V1 API routes");

    let protected = Router::new()
        // Session
        .route("/me", get(me))
        .route("/users", get(all_users))

        // Act seeding
        .route("/act", post(upsert_act))

        // Voting
        .route("/votes", post(cast_vote))
        .route("/votes", get(my_votes))
        .route("/votes/:act_id", delete(remove_vote))

        // Performer tagging (additive only, no removal route)
        .route("/videos/:video_id/performers", post(add_performers))

        // Comments
        .route("/videos/:video_id/comments", post(create_comment))
        .route("/comments/:comment_id", patch(update_comment))
        .route("/comments/:comment_id", delete(delete_comment))

        // Discovery review queue
        .route("/discovered-videos", post(ingest_discovered))
        .route("/discovered-videos", get(all_discovered))
        .route("/discovered-videos/:id/status", put(update_discovered_status))
        .route("/discovered-videos/:id/push", post(push_discovered))
        .layer(middleware::from_fn(auth_middleware));

    Router::new()
        // Login
        .route("/authorize", post(authorize))
        .route("/logout", post(logout_user))

        // Catalog browsing
        .route("/acts", get(all_acts))
        .route("/acts/:act_id", get(get_act))
        .route("/acts/:act_id/results", get(act_results))
        .route("/videos", get(all_videos))
        .route("/videos/:video_id", get(get_video))
        .route("/videos/:video_id/voters", get(video_voters))
        .route("/videos/:video_id/performers", get(video_performers))
        .route("/videos/:video_id/comments", get(video_comments))

        // Submission (anonymous allowed)
        .route("/videos", post(create_video))
        .route("/youtube/preview", get(youtube_preview))

        .merge(protected)
        .with_state(state)
}
