//! User account management.
//!
//! Login names and email addresses are normalized to lowercase before any
//! lookup or write, so the unique indexes enforce case-insensitive
//! uniqueness.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::hash_password;
use crate::db::DbPool;
use crate::entities::{access_level, user};
use crate::errors::ServiceError;

/// Shown when a user's access level row has been deleted out from under
/// them. Such users resolve to zero capabilities until reassigned.
const UNKNOWN_LEVEL_NAME: &str = "Unknown";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NewUser {
    #[validate(length(
        min = 3,
        max = 64,
        message = "Login name must be between 3 and 64 characters"
    ))]
    pub login_name: String,

    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(
        min = 1,
        max = 120,
        message = "Display name must be between 1 and 120 characters"
    ))]
    pub display_name: String,

    /// Defaults to the built-in "User" level when omitted.
    #[serde(default)]
    pub access_level_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(
        min = 3,
        max = 64,
        message = "Login name must be between 3 and 64 characters"
    ))]
    pub login_name: Option<String>,

    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,

    #[validate(length(
        min = 1,
        max = 120,
        message = "Display name must be between 1 and 120 characters"
    ))]
    pub display_name: Option<String>,

    pub access_level_id: Option<Uuid>,
}

/// A user joined with the display name of their access level.
pub struct UserWithLevel {
    pub user: user::Model,
    pub level_name: String,
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<UserWithLevel>, ServiceError> {
        let rows = user::Entity::find()
            .find_also_related(access_level::Entity)
            .order_by_asc(user::Column::LoginName)
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(user, level)| UserWithLevel {
                user,
                level_name: level
                    .map(|l| l.name)
                    .unwrap_or_else(|| UNKNOWN_LEVEL_NAME.to_string()),
            })
            .collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<UserWithLevel, ServiceError> {
        let (user, level) = user::Entity::find_by_id(id)
            .find_also_related(access_level::Entity)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?;

        Ok(UserWithLevel {
            user,
            level_name: level
                .map(|l| l.name)
                .unwrap_or_else(|| UNKNOWN_LEVEL_NAME.to_string()),
        })
    }

    pub async fn create(&self, input: NewUser) -> Result<UserWithLevel, ServiceError> {
        input.validate()?;

        let login_name = input.login_name.trim().to_lowercase();
        let email = input.email.trim().to_lowercase();

        if self.identity_taken(&login_name, &email, None).await? {
            return Err(ServiceError::Conflict(
                "A user with that login name or email already exists".to_string(),
            ));
        }

        let level = match input.access_level_id {
            Some(id) => self.require_level(id).await?,
            None => self.default_level().await?,
        };

        let active = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            login_name: Set(login_name),
            email: Set(email),
            password_hash: Set(hash_password(&input.password)?),
            display_name: Set(input.display_name.trim().to_string()),
            access_level_id: Set(level.id),
            locked_until: Set(None),
            reset_token: Set(None),
            reset_token_expires_at: Set(None),
            ..Default::default()
        };

        let user = active.insert(self.db.as_ref()).await?;
        tracing::info!(user_id = %user.id, login_name = %user.login_name, "user created");
        Ok(UserWithLevel {
            user,
            level_name: level.name,
        })
    }

    pub async fn update(&self, id: Uuid, input: UpdateUser) -> Result<UserWithLevel, ServiceError> {
        input.validate()?;

        let existing = user::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?;

        let login_name = input.login_name.map(|v| v.trim().to_lowercase());
        let email = input.email.map(|v| v.trim().to_lowercase());

        let check_login = login_name.as_deref().unwrap_or(&existing.login_name);
        let check_email = email.as_deref().unwrap_or(&existing.email);
        if (login_name.is_some() || email.is_some())
            && self.identity_taken(check_login, check_email, Some(id)).await?
        {
            return Err(ServiceError::Conflict(
                "A user with that login name or email already exists".to_string(),
            ));
        }

        if let Some(level_id) = input.access_level_id {
            self.require_level(level_id).await?;
        }

        let mut active = existing.into_active_model();
        if let Some(login_name) = login_name {
            active.login_name = Set(login_name);
        }
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(password) = input.password {
            active.password_hash = Set(hash_password(&password)?);
        }
        if let Some(display_name) = input.display_name {
            active.display_name = Set(display_name.trim().to_string());
        }
        if let Some(level_id) = input.access_level_id {
            active.access_level_id = Set(level_id);
        }

        let user = active.update(self.db.as_ref()).await?;
        tracing::info!(user_id = %user.id, "user updated");
        self.get(user.id).await
    }

    /// Deletes an account. Callers cannot delete themselves; the last
    /// administrator locking everyone out is the failure mode this prevents.
    pub async fn delete(&self, id: Uuid, caller_id: Uuid) -> Result<(), ServiceError> {
        if id == caller_id {
            return Err(ServiceError::ValidationError(
                "You cannot delete your own account".to_string(),
            ));
        }

        let existing = user::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?;

        user::Entity::delete_by_id(existing.id)
            .exec(self.db.as_ref())
            .await?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    async fn identity_taken(
        &self,
        login_name: &str,
        email: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, ServiceError> {
        let mut condition = Condition::all().add(
            Condition::any()
                .add(user::Column::LoginName.eq(login_name))
                .add(user::Column::Email.eq(email)),
        );
        if let Some(id) = exclude {
            condition = condition.add(user::Column::Id.ne(id));
        }

        let existing = user::Entity::find()
            .filter(condition)
            .one(self.db.as_ref())
            .await?;
        Ok(existing.is_some())
    }

    async fn require_level(&self, id: Uuid) -> Result<access_level::Model, ServiceError> {
        access_level::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("Access level {} does not exist", id))
            })
    }

    async fn default_level(&self) -> Result<access_level::Model, ServiceError> {
        access_level::Entity::find()
            .filter(
                Condition::all()
                    .add(access_level::Column::IsSystem.eq(true))
                    .add(access_level::Column::Name.eq("User")),
            )
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("Built-in 'User' access level is missing".to_string())
            })
    }
}
