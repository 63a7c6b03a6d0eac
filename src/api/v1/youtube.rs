use axum::extract::Query;
use axum::Json;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::common::ApiResponse;
use crate::errors::AppError;

/// Canonical YouTube video identifiers are exactly 11 characters drawn from
/// the base64url alphabet.
const YOUTUBE_ID_LEN: usize = 11;

fn is_valid_video_id(id: &str) -> bool {
    id.len() == YOUTUBE_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extracts the 11-character video id from a submitted YouTube URL.
///
/// Accepted forms are the standard watch URL (`youtube.com/watch?v=ID`),
/// short links (`youtu.be/ID`) and embed URLs (`youtube.com/embed/ID`).
/// Anything else is rejected before it reaches the store.
pub fn extract_youtube_id(raw_url: &str) -> Result<String, AppError> {
    let parsed = Url::parse(raw_url)?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::Validation(format!(
            "Unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::Validation(String::from("URL has no host")))?;

    let candidate = match host {
        "www.youtube.com" | "youtube.com" | "m.youtube.com" => {
            if parsed.path() == "/watch" {
                parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned())
            } else if let Some(rest) = parsed.path().strip_prefix("/embed/") {
                Some(rest.trim_end_matches('/').to_string())
            } else {
                None
            }
        }
        "youtu.be" => parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.to_string()),
        _ => {
            return Err(AppError::Validation(format!(
                "Not a YouTube URL: {}",
                raw_url
            )))
        }
    };

    // The host matched but the id still has to hold up on its own.
    match candidate {
        Some(id) if is_valid_video_id(&id) => Ok(id),
        Some(id) => Err(AppError::Validation(format!(
            "Could not extract a video id from '{}' (got '{}')",
            raw_url, id
        ))),
        None => Err(AppError::Validation(format!(
            "Could not extract a video id from '{}'",
            raw_url
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    pub url: String,
}

/// Shape of the oEmbed document YouTube returns (snake_case on the wire).
#[derive(Debug, Deserialize)]
pub struct OembedResponse {
    pub title: String,
    pub author_name: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubePreview {
    pub video_id: String,
    pub title: String,
    pub author_name: String,
    pub thumbnail_url: String,
}

/// Fetches oEmbed metadata for a candidate URL so the submission form can be
/// pre-filled before the video is saved.
#[tracing::instrument(name = "Fetch YouTube preview", skip(params), fields(url = %params.url))]
pub async fn youtube_preview(
    Query(params): Query<PreviewParams>,
) -> Result<Json<ApiResponse<YoutubePreview>>, AppError> {
    let video_id = extract_youtube_id(&params.url)?;

    tracing::debug!("Requesting oEmbed metadata for video {}", video_id);
    let req = Client::new();
    let response = req
        .get("https://www.youtube.com/oembed")
        .query(&[("url", params.url.as_str()), ("format", "json")])
        .send()
        .await?;

    if !response.status().is_success() {
        tracing::warn!(
            "oEmbed lookup failed for {} with status {}",
            video_id,
            response.status()
        );
        return Err(AppError::ExternalService(anyhow::anyhow!(
            "YouTube oEmbed returned status {}",
            response.status()
        )));
    }

    let oembed: OembedResponse = response.json().await.map_err(|err| {
        tracing::error!("Failed to parse oEmbed response: {:?}", err);
        AppError::ExternalService(anyhow::anyhow!("Could not parse the oEmbed response"))
    })?;

    tracing::info!("Fetched preview '{}'", oembed.title);
    Ok(Json(ApiResponse::success(YoutubePreview {
        video_id,
        title: oembed.title,
        author_name: oembed.author_name,
        thumbnail_url: oembed.thumbnail_url,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_watch_url() {
        let id = extract_youtube_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(id, "dQw4w9WgXcQ");
    }

    #[test]
    fn extracts_id_from_watch_url_with_extra_params() {
        let id =
            extract_youtube_id("https://youtube.com/watch?t=42&v=dQw4w9WgXcQ&list=PL123").unwrap();
        assert_eq!(id, "dQw4w9WgXcQ");
    }

    #[test]
    fn extracts_id_from_short_link() {
        let id = extract_youtube_id("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(id, "dQw4w9WgXcQ");
    }

    #[test]
    fn extracts_id_from_embed_url() {
        let id = extract_youtube_id("https://www.youtube.com/embed/dQw4w9WgXcQ").unwrap();
        assert_eq!(id, "dQw4w9WgXcQ");
    }

    #[test]
    fn rejects_non_youtube_host() {
        let err = extract_youtube_id("https://vimeo.com/123").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_watch_url_without_video_param() {
        let err = extract_youtube_id("https://www.youtube.com/watch?list=PL123").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_malformed_video_id() {
        let err = extract_youtube_id("https://youtu.be/short").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_unparseable_url() {
        let err = extract_youtube_id("not a url").unwrap_err();
        assert!(matches!(err, AppError::UrlParse(_)));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = extract_youtube_id("ftp://youtube.com/watch?v=dQw4w9WgXcQ").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
