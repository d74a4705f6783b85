//! Zone repository.

use std::sync::Arc;

use crate::entities::{Zone, zone};
use cityfix_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder,
};

/// Zone repository for database operations.
#[derive(Clone)]
pub struct ZoneRepository {
    db: Arc<DatabaseConnection>,
}

impl ZoneRepository {
    /// Create a new zone repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new zone.
    pub async fn create(&self, model: zone::ActiveModel) -> AppResult<zone::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a zone by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<zone::Model>> {
        Zone::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a zone by name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<zone::Model>> {
        Zone::find()
            .filter(zone::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All zones, alphabetical.
    pub async fn find_all(&self) -> AppResult<Vec<zone::Model>> {
        Zone::find()
            .order_by_asc(zone::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a zone by ID.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let zone = self.find_by_id(id).await?;
        if let Some(z) = zone {
            z.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }
}
