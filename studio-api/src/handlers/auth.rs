use super::AppState;
use crate::auth::Credentials;
use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use actix_web::http::header::{AUTHORIZATION, COOKIE};
use actix_web::{get, web, HttpRequest, HttpResponse};
use shared_types::{AuthCookiesResponse, ExportedCookie};
use tracing::{info, warn};

/// Hands the caller's auth cookies to the desktop app so it can talk to the
/// studio backend as the same user.
#[get("/auth/cookies")]
pub async fn export_cookies(req: HttpRequest, data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let auth = &data.config.auth;
    let credentials = credentials(&req, auth);
    if credentials.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let session = match data.verifier.verify(&credentials).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            warn!("Rejected cookie export for unknown session");
            return Err(AppError::Unauthorized);
        }
        Err(e) => {
            warn!(error = %e, "Session verification failed");
            return Err(e.into());
        }
    };

    let cookies = auth_cookies(&req, auth)?;
    if cookies.is_empty() {
        return Err(AppError::NotFound("no auth cookies on request".to_string()));
    }

    info!(
        user_id = session.user_id.as_deref().unwrap_or("-"),
        count = cookies.len(),
        "Exported auth cookies"
    );
    Ok(HttpResponse::Ok().json(AuthCookiesResponse::new(cookies, session.expires_at)))
}

fn credentials(req: &HttpRequest, auth: &AuthConfig) -> Credentials {
    let session_token = auth
        .session_cookie_names()
        .iter()
        .find_map(|name| req.cookie(name))
        .map(|cookie| cookie.value().to_string());

    let bearer_token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    let cookie_header = req
        .headers()
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    Credentials {
        session_token,
        bearer_token,
        cookie_header,
    }
}

fn auth_cookies(req: &HttpRequest, auth: &AuthConfig) -> AppResult<Vec<ExportedCookie>> {
    let cookies = req
        .cookies()
        .map_err(|e| AppError::Internal(format!("Failed to parse cookies: {e}")))?;

    Ok(cookies
        .iter()
        .filter(|cookie| auth.is_auth_cookie(cookie.name()))
        .map(|cookie| ExportedCookie {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: auth.cookie_domain.clone(),
            path: "/".to_string(),
            secure: auth.secure_cookies,
            http_only: true,
        })
        .collect())
}
