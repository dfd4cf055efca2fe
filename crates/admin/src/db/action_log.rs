//! Audit log repository for `PostgreSQL`.

use async_trait::async_trait;

use folio_core::AdminId;

use super::{ActionLogStore, PgStore, RepositoryError};
use crate::models::AuditAction;

#[async_trait]
impl ActionLogStore for PgStore {
    async fn create_action_log(
        &self,
        actor: Option<AdminId>,
        action: AuditAction,
        metadata: serde_json::Value,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO admin.action_log (admin_id, action, metadata) VALUES ($1, $2, $3)",
        )
        .bind(actor.map(|id| id.as_i32()))
        .bind(action.as_str())
        .bind(metadata)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
