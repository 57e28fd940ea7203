mod common;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use chrono::{DateTime, Utc};
use common::{setup_app, setup_app_with, SESSION_COOKIE};
use std::sync::Arc;
use studio_api::auth::RemoteSessionVerifier;
use studio_api::config::ApiConfig;

#[actix_rt::test]
async fn test_unauthenticated_request_is_rejected() -> anyhow::Result<()> {
    let app = setup_app().await;

    let req = TestRequest::get()
        .uri("/api/auth/cookies")
        .cookie(Cookie::new("theme", "dark"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await)?;
    assert_eq!(body["error"], "Not authenticated");
    Ok(())
}

#[actix_rt::test]
async fn test_session_cookies_are_exported() -> anyhow::Result<()> {
    let app = setup_app().await;

    let req = TestRequest::get()
        .uri("/api/auth/cookies")
        .cookie(Cookie::new(SESSION_COOKIE, "tok.sig"))
        .cookie(Cookie::new("better-auth.session_data", "cache"))
        .cookie(Cookie::new("theme", "dark"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await)?;
    let cookies = body["cookies"].as_array().unwrap();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c["name"] != "theme"));
    assert!(cookies.iter().all(|c| c["httpOnly"] == true));

    let cookie_string = body["cookieString"].as_str().unwrap();
    assert!(cookie_string.contains("better-auth.session_token=tok.sig"));
    assert!(cookie_string.contains("better-auth.session_data=cache"));

    let expires_at: DateTime<Utc> = serde_json::from_value(body["expiresAt"].clone())?;
    assert!(expires_at > Utc::now());
    Ok(())
}

#[actix_rt::test]
async fn test_bearer_without_auth_cookies_is_not_found() -> anyhow::Result<()> {
    let app = setup_app().await;

    let req = TestRequest::get()
        .uri("/api/auth/cookies")
        .insert_header(("Authorization", "Bearer desktop-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[actix_rt::test]
async fn test_health() -> anyhow::Result<()> {
    let app = setup_app().await;

    let req = TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await)?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[actix_rt::test]
async fn test_remote_verifier_dates_the_export() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let live = server
        .mock("GET", "/api/auth/get-session")
        .match_header("cookie", mockito::Matcher::Regex("session_token=good".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"session": {"userId": "u_42", "expiresAt": "2031-01-01T00:00:00Z"}}"#)
        .create_async()
        .await;
    let unknown = server
        .mock("GET", "/api/auth/get-session")
        .match_header("cookie", mockito::Matcher::Regex("session_token=stale".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("null")
        .create_async()
        .await;

    let verifier = Arc::new(RemoteSessionVerifier::new(format!(
        "{}/api/auth/get-session",
        server.url()
    )));
    let app = setup_app_with(ApiConfig::default(), verifier).await;

    let req = TestRequest::get()
        .uri("/api/auth/cookies")
        .cookie(Cookie::new(SESSION_COOKIE, "good"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await)?;
    assert_eq!(body["expiresAt"], "2031-01-01T00:00:00Z");

    let req = TestRequest::get()
        .uri("/api/auth/cookies")
        .cookie(Cookie::new(SESSION_COOKIE, "stale"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    live.assert_async().await;
    unknown.assert_async().await;
    Ok(())
}

#[actix_rt::test]
async fn test_auth_server_failure_is_bad_gateway() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let _down = server
        .mock("GET", "/session")
        .with_status(503)
        .create_async()
        .await;

    let verifier = Arc::new(RemoteSessionVerifier::new(format!("{}/session", server.url())));
    let app = setup_app_with(ApiConfig::default(), verifier).await;

    let req = TestRequest::get()
        .uri("/api/auth/cookies")
        .cookie(Cookie::new(SESSION_COOKIE, "good"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    Ok(())
}
