//! Category administration.

use cityfix_common::{AppError, AppResult, IdGenerator};
use cityfix_db::entities::category;
use cityfix_db::entities::user::Role;
use cityfix_db::repositories::{CategoryRepository, UserRepository};
use sea_orm::Set;

/// Admin-managed list of report categories. Citizens pick from this list
/// when filing.
#[derive(Clone)]
pub struct CategoryService {
    category_repo: CategoryRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl CategoryService {
    /// Create a new category service.
    #[must_use]
    pub const fn new(category_repo: CategoryRepository, user_repo: UserRepository) -> Self {
        Self {
            category_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a category.
    pub async fn create(&self, admin_id: &str, name: &str) -> AppResult<category::Model> {
        self.require_admin(admin_id).await?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("A category name is required".to_string()));
        }
        if self.category_repo.exists(name).await? {
            return Err(AppError::Conflict(format!(
                "Category '{name}' already exists"
            )));
        }

        let model = category::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.category_repo.create(model).await
    }

    /// All categories, alphabetical.
    pub async fn list(&self) -> AppResult<Vec<category::Model>> {
        self.category_repo.find_all().await
    }

    /// Remove a category. Existing reports keep the name they were filed
    /// under.
    pub async fn delete(&self, admin_id: &str, id: &str) -> AppResult<()> {
        self.require_admin(admin_id).await?;
        self.category_repo.delete(id).await
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
    use std::collections::BTreeMap;
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
    async fn test_create_rejects_duplicate_name() {
        let count_row: BTreeMap<&str, sea_orm::Value> =
            BTreeMap::from([("num_items", sea_orm::Value::BigInt(Some(1)))]);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![admin()]])
                .append_query_results([vec![count_row]])
                .into_connection(),
        );

        let service = CategoryService::new(
            CategoryRepository::new(db.clone()),
            UserRepository::new(db),
        );
        let err = service.create("admin1", "Roads").await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let mut not_admin = admin();
        not_admin.id = "qa1".to_string();
        not_admin.role = Role::Qa;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![not_admin]])
                .into_connection(),
        );

        let service = CategoryService::new(
            CategoryRepository::new(db.clone()),
            UserRepository::new(db),
        );
        let err = service.create("qa1", "Roads").await.unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![admin()]])
                .into_connection(),
        );

        let service = CategoryService::new(
            CategoryRepository::new(db.clone()),
            UserRepository::new(db),
        );
        let err = service.create("admin1", "   ").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }
}
