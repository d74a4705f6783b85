//! User administration.

use cityfix_common::{AppError, AppResult, IdGenerator};
use cityfix_db::entities::user::{self, Role};
use cityfix_db::repositories::{NotificationRepository, UserRepository};
use sea_orm::Set;

/// Input for creating a staff or citizen account.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// User account service. All mutating operations require an admin actor;
/// admins cannot act on other admin accounts.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, notification_repo: NotificationRepository) -> Self {
        Self {
            user_repo,
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create an account.
    pub async fn create_user(
        &self,
        admin_id: &str,
        input: CreateUserInput,
    ) -> AppResult<user::Model> {
        self.require_admin(admin_id).await?;

        if input.email.trim().is_empty() || !input.email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if input.name.trim().is_empty() {
            return Err(AppError::Validation("A name is required".to_string()));
        }
        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(input.email),
            name: Set(input.name),
            role: Set(input.role),
            is_disabled: Set(false),
            push_token: Set(None),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        self.user_repo.create(model).await
    }

    /// Change a user's role. Admin accounts are off limits.
    pub async fn set_role(&self, admin_id: &str, user_id: &str, role: Role) -> AppResult<user::Model> {
        self.require_admin(admin_id).await?;
        let user = self.require_non_admin_target(user_id).await?;

        let mut model: user::ActiveModel = user.into();
        model.role = Set(role);
        model.updated_at = Set(Some(chrono::Utc::now().into()));
        self.user_repo.update(model).await
    }

    /// Disable or re-enable an account. Disabled accounts cannot act and
    /// drop out of every fan-out roster.
    pub async fn set_disabled(
        &self,
        admin_id: &str,
        user_id: &str,
        disabled: bool,
    ) -> AppResult<user::Model> {
        self.require_admin(admin_id).await?;
        let user = self.require_non_admin_target(user_id).await?;

        let mut model: user::ActiveModel = user.into();
        model.is_disabled = Set(disabled);
        model.updated_at = Set(Some(chrono::Utc::now().into()));
        self.user_repo.update(model).await
    }

    /// Register or clear a device push token. Users manage their own token.
    pub async fn set_push_token(&self, user_id: &str, token: Option<String>) -> AppResult<()> {
        self.user_repo.set_push_token(user_id, token).await
    }

    /// Fetch one user.
    pub async fn get_user(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// All active users holding a role.
    pub async fn list_by_role(&self, role: Role) -> AppResult<Vec<user::Model>> {
        self.user_repo.find_by_role(role).await
    }

    /// A user's notification feed, newest first.
    pub async fn list_notifications(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<cityfix_db::entities::notification::Model>> {
        self.notification_repo
            .find_by_user(user_id, limit, until_id, unread_only)
            .await
    }

    /// Mark one notification read.
    pub async fn mark_notification_read(&self, id: &str) -> AppResult<()> {
        self.notification_repo.mark_as_read(id).await
    }

    /// Mark a user's whole feed read. Returns the number of rows touched.
    pub async fn mark_all_notifications_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Unread count for badge display.
    pub async fn count_unread_notifications(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    async fn require_admin(&self, admin_id: &str) -> AppResult<user::Model> {
        let admin = self.user_repo.get_by_id(admin_id).await?;
        if admin.role != Role::Admin || admin.is_disabled {
            return Err(AppError::Forbidden("Requires the admin role".to_string()));
        }
        Ok(admin)
    }

    async fn require_non_admin_target(&self, user_id: &str) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(user_id).await?;
        if user.role == Role::Admin {
            return Err(AppError::Forbidden(
                "Admin accounts cannot be modified here".to_string(),
            ));
        }
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_user(id: &str, role: Role) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: id.to_string(),
            role,
            is_disabled: false,
            push_token: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service_over(db: Arc<sea_orm::DatabaseConnection>) -> UserService {
        UserService::new(
            UserRepository::new(db.clone()),
            NotificationRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_create_user_requires_admin() {
        let dispatcher = test_user("disp1", Role::Dispatcher);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![dispatcher]])
                .into_connection(),
        );

        let service = service_over(db);
        let err = service
            .create_user(
                "disp1",
                CreateUserInput {
                    email: "new@example.com".to_string(),
                    name: "New User".to_string(),
                    role: Role::Engineer,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let admin = test_user("admin1", Role::Admin);
        let existing = test_user("eng1", Role::Engineer);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![admin]])
                .append_query_results([vec![existing]])
                .into_connection(),
        );

        let service = service_over(db);
        let err = service
            .create_user(
                "admin1",
                CreateUserInput {
                    email: "eng1@example.com".to_string(),
                    name: "Someone".to_string(),
                    role: Role::Engineer,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_admin_accounts_are_off_limits() {
        let admin = test_user("admin1", Role::Admin);
        let other_admin = test_user("admin2", Role::Admin);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![admin]])
                .append_query_results([vec![other_admin]])
                .into_connection(),
        );

        let service = service_over(db);
        let err = service
            .set_disabled("admin1", "admin2", true)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
