use cookie::{Cookie, SameSite};
use time::OffsetDateTime;
use tower_cookies::Cookies;

use crate::errors::AppError;

/// Installs the session cookie the way the frontend expects it: scoped to the
/// deployment domain in production, relaxed for local development.
pub fn setup_auth_cookie(token: &str, domain: &str, cookies: &Cookies) {
    let mut cookie = Cookie::new("auth-token", token.to_string());

    let is_development = std::env::var("ENVIRONMENT")
        .unwrap_or_else(|_| "production".to_string())
        .to_lowercase()
        == "development";

    if is_development {
        cookie.set_domain("localhost".to_string());
        cookie.set_same_site(SameSite::None);
        cookie.set_secure(true);
    } else {
        let cookie_domain = if domain.starts_with('.') {
            domain.to_string()
        } else {
            format!(".{}", domain)
        };
        cookie.set_domain(cookie_domain);
        cookie.set_same_site(SameSite::None);
        cookie.set_secure(true);
    }

    let mut now = OffsetDateTime::now_utc();
    now += time::Duration::days(60);

    cookie.set_path("/");
    cookie.set_expires(now);
    cookie.set_http_only(true);
    cookies.add(cookie);
}

/// Bounds a store call so a stuck connection cannot hold a request open.
pub async fn timeout_query<T, F>(duration: std::time::Duration, fut: F) -> Result<T, AppError>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(Ok(res)) => Ok(res),
        Ok(Err(e)) => Err(AppError::from(e)),
        Err(_) => Err(AppError::Database(anyhow::anyhow!(
            "Query timeout after {:?}",
            duration
        ))),
    }
}
