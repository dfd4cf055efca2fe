//! Admin account management API handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use serde::Deserialize;

use folio_core::{AdminId, Permission};

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Admin, AdminChanges, AdminFilter, AdminPage, AdminStats, CreateAdmin};
use crate::state::AppState;

/// Build the admin management router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admins", get(list_admins).post(create_admin))
        .route("/api/admins/stats", get(stats))
        .route(
            "/api/admins/{id}",
            get(get_admin).put(update_admin).delete(delete_admin),
        )
        .route("/api/admins/{id}/status", patch(set_status))
}

/// Query string for listing admins.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAdminsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub is_active: bool,
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.0.id))]
pub async fn list_admins(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListAdminsQuery>,
) -> Result<Json<AdminPage>, AppError> {
    admin.require(Permission::AdminsView)?;

    let filter = AdminFilter {
        role: query.role,
        is_active: query.is_active,
        search: query.search,
    };
    let page = state
        .admins()
        .list_admins(&filter, query.page, query.limit)
        .await?;
    Ok(Json(page))
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.0.id))]
pub async fn create_admin(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateAdmin>,
) -> Result<(StatusCode, Json<Admin>), AppError> {
    admin.require(Permission::AdminsCreate)?;

    let created = state.admins().create_admin(body, Some(admin.0.id)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn stats(
    admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<AdminStats>, AppError> {
    admin.require(Permission::AdminsView)?;
    Ok(Json(state.admins().get_stats().await?))
}

pub async fn get_admin(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Admin>, AppError> {
    admin.require(Permission::AdminsView)?;
    Ok(Json(state.admins().get_admin_by_id(AdminId::new(id)).await?))
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.0.id, target_id = id))]
pub async fn update_admin(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<AdminChanges>,
) -> Result<Json<Admin>, AppError> {
    admin.require(Permission::AdminsEdit)?;

    let updated = state
        .admins()
        .update_admin(AdminId::new(id), body, &admin.0)
        .await?;
    Ok(Json(updated))
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.0.id, target_id = id))]
pub async fn delete_admin(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    admin.require(Permission::AdminsDelete)?;

    state
        .admins()
        .delete_admin(AdminId::new(id), admin.0.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.0.id, target_id = id))]
pub async fn set_status(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Admin>, AppError> {
    admin.require(Permission::AdminsEdit)?;

    let updated = state
        .admins()
        .set_active_status(AdminId::new(id), body.is_active, Some(admin.0.id))
        .await?;
    Ok(Json(updated))
}
