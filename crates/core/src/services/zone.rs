//! Service zone administration.

use cityfix_common::{AppError, AppResult, IdGenerator};
use cityfix_db::entities::user::Role;
use cityfix_db::entities::zone;
use cityfix_db::repositories::{UserRepository, ZoneRepository};
use sea_orm::Set;

/// Admin-managed service zones. A zone is a named boundary polygon used to
/// group reports geographically.
#[derive(Clone)]
pub struct ZoneService {
    zone_repo: ZoneRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl ZoneService {
    /// Create a new zone service.
    #[must_use]
    pub const fn new(zone_repo: ZoneRepository, user_repo: UserRepository) -> Self {
        Self {
            zone_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a zone. The polygon is a list of `[latitude, longitude]` pairs
    /// and needs at least three points.
    pub async fn create(
        &self,
        admin_id: &str,
        name: &str,
        polygon: Vec<[f64; 2]>,
    ) -> AppResult<zone::Model> {
        self.require_admin(admin_id).await?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("A zone name is required".to_string()));
        }
        if polygon.len() < 3 {
            return Err(AppError::Validation(
                "A zone polygon needs at least three points".to_string(),
            ));
        }
        if self.zone_repo.find_by_name(name).await?.is_some() {
            return Err(AppError::Conflict(format!("Zone '{name}' already exists")));
        }

        let model = zone::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.to_string()),
            polygon: Set(serde_json::json!(polygon)),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.zone_repo.create(model).await
    }

    /// All zones, alphabetical.
    pub async fn list(&self) -> AppResult<Vec<zone::Model>> {
        self.zone_repo.find_all().await
    }

    /// Remove a zone.
    pub async fn delete(&self, admin_id: &str, id: &str) -> AppResult<()> {
        self.require_admin(admin_id).await?;
        self.zone_repo.delete(id).await
    }

    async fn require_admin(&self, admin_id: &str) -> AppResult<()> {
        let admin = self.user_repo.get_by_id(admin_id).await?;
        if admin.role != Role::Admin || admin.is_disabled {
            return Err(AppError::Forbidden("Requires the admin role".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cityfix_db::entities::user;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn admin() -> user::Model {
        user::Model {
            id: "admin1".to_string(),
            email: "admin1@example.com".to_string(),
            name: "admin1".to_string(),
            role: Role::Admin,
            is_disabled: false,
            push_token: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_degenerate_polygon() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![admin()]])
                .into_connection(),
        );

        let service = ZoneService::new(ZoneRepository::new(db.clone()), UserRepository::new(db));
        let err = service
            .create("admin1", "Downtown", vec![[40.7, -74.0], [40.8, -74.0]])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let existing = zone::Model {
            id: "zone1".to_string(),
            name: "Downtown".to_string(),
            polygon: serde_json::json!([[40.7, -74.0], [40.8, -74.0], [40.8, -73.9]]),
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![admin()]])
                .append_query_results([vec![existing]])
                .into_connection(),
        );

        let service = ZoneService::new(ZoneRepository::new(db.clone()), UserRepository::new(db));
        let err = service
            .create(
                "admin1",
                "Downtown",
                vec![[40.7, -74.0], [40.8, -74.0], [40.8, -73.9]],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }
}
