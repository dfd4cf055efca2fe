//! Admin account management and permission checks over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use folio_admin::models::AuditAction;
use folio_integration_tests::{PASSWORD, TestContext};

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::new().await;

    let health = ctx.get("/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body, "ok");

    assert_eq!(ctx.get("/health/ready", None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_need_a_session() {
    let ctx = TestContext::new().await;

    assert_eq!(
        ctx.get("/api/admins", None).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        ctx.get("/api/auth/me", Some("not-a-jwt")).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_permissions_gate_admin_routes() {
    let ctx = TestContext::new().await;
    ctx.create_admin("root@folio.test", "super_admin").await;
    ctx.create_admin("viewer@folio.test", "viewer").await;
    ctx.create_admin("ops@folio.test", "admin").await;

    for email in ["viewer@folio.test", "ops@folio.test"] {
        let token = ctx.login(email).await;
        assert_eq!(
            ctx.get("/api/admins", Some(&token)).await.status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ctx.get("/api/roles", Some(&token)).await.status,
            StatusCode::FORBIDDEN
        );
        let create = ctx
            .post(
                "/api/admins",
                Some(&token),
                json!({ "email": "x@folio.test", "password": PASSWORD, "name": "X" }),
            )
            .await;
        assert_eq!(create.status, StatusCode::FORBIDDEN);
    }

    let root = ctx.login("root@folio.test").await;
    let list = ctx.get("/api/admins", Some(&root)).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["total"], 3);
    assert_eq!(list.body["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_create_admin_defaults_and_duplicate_email() {
    let ctx = TestContext::new().await;
    let root_admin = ctx.create_admin("root@folio.test", "super_admin").await;
    let root = ctx.login("root@folio.test").await;

    let created = ctx
        .post(
            "/api/admins",
            Some(&root),
            json!({ "email": "Editor@Folio.test", "password": PASSWORD, "name": "Editor" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["email"], "editor@folio.test");
    assert_eq!(created.body["role"], "viewer");
    assert_eq!(created.body["createdBy"], root_admin.id.as_i32());
    assert_eq!(
        created.body["permissions"],
        json!(["dashboard.view", "users.view", "resumes.view"])
    );

    let duplicate = ctx
        .post(
            "/api/admins",
            Some(&root),
            json!({ "email": "EDITOR@folio.test", "password": PASSWORD, "name": "Editor 2" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let bad_role = ctx
        .post(
            "/api/admins",
            Some(&root),
            json!({ "email": "new@folio.test", "password": PASSWORD, "name": "New", "role": "owner" }),
        )
        .await;
    assert_eq!(bad_role.status, StatusCode::BAD_REQUEST);

    assert!(
        ctx.store
            .action_logs()
            .await
            .iter()
            .any(|log| log.action == AuditAction::AdminCreated
                && log.admin_id == Some(root_admin.id))
    );
}

#[tokio::test]
async fn test_role_change_recomputes_permissions() {
    let ctx = TestContext::new().await;
    ctx.create_admin("root@folio.test", "super_admin").await;
    let target = ctx.create_admin("viewer@folio.test", "viewer").await;
    let root = ctx.login("root@folio.test").await;

    let updated = ctx
        .request(
            Method::PUT,
            &format!("/api/admins/{}", target.id),
            Some(&root),
            Some(json!({ "role": "MODERATOR", "name": "Promoted" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["role"], "moderator");
    assert_eq!(updated.body["name"], "Promoted");
    assert!(
        updated.body["permissions"]
            .as_array()
            .unwrap()
            .contains(&json!("users.edit"))
    );
}

#[tokio::test]
async fn test_last_super_admin_is_protected() {
    let ctx = TestContext::new().await;
    let root = ctx.create_admin("root@folio.test", "super_admin").await;
    let deputy = ctx.create_admin("deputy@folio.test", "super_admin").await;
    let token = ctx.login("root@folio.test").await;

    let self_delete = ctx
        .request(
            Method::DELETE,
            &format!("/api/admins/{}", root.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(self_delete.status, StatusCode::BAD_REQUEST);

    // Two super admins: one may go.
    let delete = ctx
        .request(
            Method::DELETE,
            &format!("/api/admins/{}", deputy.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(delete.status, StatusCode::NO_CONTENT);
    assert_eq!(
        ctx.get(&format!("/api/admins/{}", deputy.id), Some(&token))
            .await
            .status,
        StatusCode::NOT_FOUND
    );

    // Now root is the last one: no demotion, no deactivation.
    let demote = ctx
        .request(
            Method::PUT,
            &format!("/api/admins/{}", root.id),
            Some(&token),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(demote.status, StatusCode::CONFLICT);

    let deactivate = ctx
        .request(
            Method::PATCH,
            &format!("/api/admins/{}/status", root.id),
            Some(&token),
            Some(json!({ "isActive": false })),
        )
        .await;
    assert_eq!(deactivate.status, StatusCode::CONFLICT);

    let me = ctx.get("/api/auth/me", Some(&token)).await;
    assert_eq!(me.body["role"], "super_admin");
}

#[tokio::test]
async fn test_status_toggle_and_stats() {
    let ctx = TestContext::new().await;
    ctx.create_admin("root@folio.test", "super_admin").await;
    let ops = ctx.create_admin("ops@folio.test", "admin").await;
    ctx.create_admin("viewer@folio.test", "viewer").await;
    let root = ctx.login("root@folio.test").await;

    let toggled = ctx
        .request(
            Method::PATCH,
            &format!("/api/admins/{}/status", ops.id),
            Some(&root),
            Some(json!({ "isActive": false })),
        )
        .await;
    assert_eq!(toggled.status, StatusCode::OK);
    assert_eq!(toggled.body["isActive"], false);

    let stats = ctx.get("/api/admins/stats", Some(&root)).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["total"], 3);
    assert_eq!(stats.body["active"], 2);
    assert_eq!(stats.body["inactive"], 1);

    let inactive = ctx
        .get("/api/admins?isActive=false", Some(&root))
        .await;
    assert_eq!(inactive.body["total"], 1);
    assert_eq!(inactive.body["items"][0]["email"], "ops@folio.test");
}

#[tokio::test]
async fn test_list_admins_paginates_and_searches() {
    let ctx = TestContext::new().await;
    ctx.create_admin("root@folio.test", "super_admin").await;
    for n in 0..4 {
        ctx.create_admin(&format!("editor{n}@folio.test"), "moderator")
            .await;
    }
    let root = ctx.login("root@folio.test").await;

    let page = ctx
        .get("/api/admins?page=2&limit=2&role=moderator", Some(&root))
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["total"], 4);
    assert_eq!(page.body["page"], 2);
    assert_eq!(page.body["pages"], 2);
    assert_eq!(page.body["items"].as_array().unwrap().len(), 2);

    let search = ctx.get("/api/admins?search=editor3", Some(&root)).await;
    assert_eq!(search.body["total"], 1);
}
