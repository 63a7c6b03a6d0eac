use axum::extract::State;
use axum::{Extension, Json};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_cookies::{Cookie, Cookies};

use crate::api::common::utils::setup_auth_cookie;
use crate::api::common::ApiResponse;
use crate::api::v1::users::{find_or_create_user, find_user_by_id, NewUser, User};
use crate::errors::AppError;
use crate::InnerState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: String,
    role: String,
    exp: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub image: Option<String>,
}

/// Reads the signing secret once per use; the raw string never travels
/// through log fields.
pub fn jwt_secret() -> Result<Secret<String>, AppError> {
    std::env::var("SECRET_TOKEN")
        .map(Secret::new)
        .map_err(|e| AppError::Unexpected(anyhow::anyhow!(e).context("SECRET_TOKEN env var not set")))
}

/// Identity here is the `(firstName, lastName)` pair: a returning name logs
/// back into the same account, a new name creates one. There is no password.
#[tracing::instrument(name = "Authorize user by name", skip(cookies, inner, payload))]
pub async fn authorize(
    cookies: Cookies,
    State(inner): State<InnerState>,
    Json(payload): Json<AuthorizeRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let InnerState { db, .. } = inner;

    let first_name = payload.first_name.trim();
    let last_name = payload.last_name.trim();

    if first_name.is_empty() || last_name.is_empty() {
        tracing::warn!("Rejected login with blank first or last name");
        return Err(AppError::Validation(String::from(
            "First name and last name are required",
        )));
    }

    let user = find_or_create_user(
        &db,
        NewUser {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: payload.email,
            image: payload.image,
        },
    )
    .await?;

    tracing::info!("Authorized user {} {} ({})", first_name, last_name, user.id);

    let display_name = format!("{} {}", first_name, last_name);
    let token = generate_token(&display_name, &user.id)?;

    let domain = std::env::var("ENCORE_HOST")
        .map_err(|e| AppError::Unexpected(anyhow::anyhow!(e).context("ENCORE_HOST env var not set")))?;
    setup_auth_cookie(&token, &domain, &cookies);

    Ok(Json(ApiResponse::success(user)))
}

pub async fn logout_user(cookies: Cookies) -> Result<Json<Value>, AppError> {
    let mut cookie = Cookie::from("auth-token");
    cookie.set_same_site(cookie::SameSite::None);
    cookie.make_removal();

    cookies.remove(cookie);
    Ok(Json(json!({ "data": "logout completed" })))
}

#[tracing::instrument(name = "Get current user", skip(inner, claims))]
pub async fn me(
    Extension(claims): Extension<Claims>,
    State(inner): State<InnerState>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let InnerState { db, .. } = inner;

    let user = find_user_by_id(&db, &claims.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", claims.user_id)))?;

    Ok(Json(ApiResponse::success(user)))
}

fn generate_token(display_name: &str, user_id: &str) -> Result<String, AppError> {
    let key = jwt_secret()?;

    let claims = Claims {
        user_id: user_id.to_owned(),
        sub: display_name.to_owned(),
        role: "user".to_owned(),
        exp: (chrono::Utc::now() + chrono::Duration::days(90)).timestamp() as usize,
    };
    let header = Header::new(Algorithm::HS256);
    encode(
        &header,
        &claims,
        &EncodingKey::from_secret(key.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Unexpected(anyhow::Error::new(e).context("Failed to encode JWT token")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    #[test]
    fn generated_token_round_trips_claims() {
        std::env::set_var("SECRET_TOKEN", "test-secret");

        let token = generate_token("Frankie Manning", "user-1").expect("token");
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::new(Algorithm::HS256),
        )
        .expect("decode");

        assert_eq!(decoded.claims.sub, "Frankie Manning");
        assert_eq!(decoded.claims.user_id, "user-1");
    }
}
