use axum::{
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use cookie::Cookie;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use tracing::error;

use crate::api::v1::login::{jwt_secret, Claims};

/// Validates the session token and makes the decoded [`Claims`] available to
/// downstream handlers as a request extension.
pub async fn auth_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let secret = jwt_secret().map_err(|e| {
        error!("SECRET_TOKEN not set: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let token = extract_token(&request).ok_or(StatusCode::UNAUTHORIZED)?;

    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(secret.expose_secret().as_ref()),
        &validation,
    )
    .map_err(|e| {
        error!("JWT validation failed: {:?}", e);
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(token_data.claims);
    Ok(next.run(request).await)
}

/// Extracts the JWT from either the `Authorization` header or `Cookie` header.
fn extract_token<B>(req: &Request<B>) -> Option<String> {
    // Check Authorization: Bearer <token>
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    // Check Cookie: auth-token=<token>
    if let Some(cookie_header) = req.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Ok(parsed) = Cookie::parse(cookie.trim()) {
                    if parsed.name() == "auth-token" {
                        return Some(parsed.value().to_string());
                    }
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn extract_token_prefers_bearer_header() {
        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer abc123")
            .header(header::COOKIE, "auth-token=from-cookie")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req).as_deref(), Some("abc123"));
    }

    #[test]
    fn extract_token_reads_auth_cookie() {
        let req = Request::builder()
            .header(header::COOKIE, "theme=dark; auth-token=tok; lang=en")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req).as_deref(), Some("tok"));
    }

    #[test]
    fn extract_token_missing_returns_none() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_token(&req), None);
    }
}
