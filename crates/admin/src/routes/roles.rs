//! Role API handlers.

use axum::{Json, Router, extract::State, routing::get};

use folio_core::Permission;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::Role;
use crate::state::AppState;

/// Build the roles router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/roles", get(list_roles))
}

/// All roles, for the role picker.
pub async fn list_roles(
    admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Role>>, AppError> {
    admin.require(Permission::AdminsRoles)?;
    Ok(Json(state.roles().list_roles().await?))
}
