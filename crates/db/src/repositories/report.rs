//! Report repository.

use std::sync::Arc;

use crate::entities::{Report, report};
use cityfix_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

/// Report repository for database operations.
///
/// Updates use `ActiveModel` partial semantics: only `Set` columns are
/// written, in a single statement, so every lifecycle transition is one
/// atomic row update.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a report by ID. Soft-deleted reports are still addressable here
    /// for audit.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<report::Model>> {
        Report::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a report by ID, failing if it does not exist.
    pub async fn get_by_id(&self, id: &str) -> AppResult<report::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ReportNotFound(id.to_string()))
    }

    /// Create a new report.
    pub async fn create(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply a partial update to a report.
    pub async fn update(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find all reports marked as duplicates of the given master.
    pub async fn find_duplicates_of(&self, master_id: &str) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::IsDuplicateOf.eq(master_id))
            .filter(report::Column::IsDeleted.eq(false))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Staff queue listing for one status. Excludes drafts, soft-deleted
    /// reports, and duplicates (duplicates are synced, not triaged).
    pub async fn list_by_status(
        &self,
        status: report::ReportStatus,
    ) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::Status.eq(status))
            .filter(report::Column::IsDraft.eq(false))
            .filter(report::Column::IsDeleted.eq(false))
            .filter(report::Column::IsDuplicateOf.is_null())
            .order_by_desc(report::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All reports filed by a citizen, drafts included.
    pub async fn list_for_citizen(&self, user_id: &str) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::UserId.eq(user_id))
            .filter(report::Column::IsDeleted.eq(false))
            .order_by_desc(report::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Work queue for an engineer.
    pub async fn list_assigned_to(&self, engineer_id: &str) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::AssignedTo.eq(engineer_id))
            .filter(report::Column::IsDraft.eq(false))
            .filter(report::Column::IsDeleted.eq(false))
            .filter(report::Column::IsDuplicateOf.is_null())
            .order_by_desc(report::Column::AssignedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Soft-delete a report.
    pub async fn soft_delete(&self, id: &str) -> AppResult<report::Model> {
        let report = self.get_by_id(id).await?;
        let mut model: report::ActiveModel = report.into();
        model.is_deleted = Set(true);
        model.updated_at = Set(Some(chrono::Utc::now().into()));
        self.update(model).await
    }
}
