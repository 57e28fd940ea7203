use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One auth cookie handed to an external (desktop) client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExportedCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

/// `GET /api/auth/cookies` response body
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuthCookiesResponse {
    pub cookies: Vec<ExportedCookie>,
    /// `name=value; name=value` form, ready for a `Cookie` header
    pub cookie_string: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthCookiesResponse {
    pub fn new(cookies: Vec<ExportedCookie>, expires_at: DateTime<Utc>) -> Self {
        let cookie_string = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            cookies,
            cookie_string,
            expires_at,
        }
    }
}
