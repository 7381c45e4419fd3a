mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn first_sign_in_creates_owner_profile() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let token = app.token_for("new.owner@example.com")?;

    let response = app.get("/api/route", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?["redirectUrl"], "/dsar");

    let response = app.post_json("/api/authenticate", &json!({}), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["redirectUrl"], "/owner");

    let response = app.get("/api/me", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let profile = body_json(response).await?;
    assert_eq!(profile["email"], "new.owner@example.com");
    assert_eq!(profile["role"], "owner");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn long_identity_emails_get_a_profile() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let email = format!("{}@example.com", "x".repeat(400));
    let token = app.token_for(&email)?;

    let response = app.post_json("/api/authenticate", &json!({}), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/api/me", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?["email"], email.as_str());

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn sign_in_keeps_existing_admin_role() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("root@example.com", "admin").await?;
    let token = app.token_for("root@example.com")?;

    let response = app.post_json("/api/authenticate", &json!({}), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?["redirectUrl"], "/admin");

    let response = app.get("/api/me", Some(&token)).await?;
    assert_eq!(body_json(response).await?["role"], "admin");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn anonymous_visitors_route_to_public_directory() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app.get("/api/route", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?["redirectUrl"], "/dsar");

    let response = app.get("/api/me", None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/api/me", Some("not-a-jwt")).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn admin_surface_rejects_owners() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("owner@example.com", "owner").await?;
    let token = app.token_for("owner@example.com")?;

    for path in ["/api/admin/companies", "/api/admin/dsars"] {
        let response = app.get(path, Some(&token)).await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{path}");
        let response = app.get(path, None).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
    }

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn health_check_needs_no_database_rows() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app.get("/api/health", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?["status"], "ok");

    app.cleanup().await?;
    Ok(())
}
