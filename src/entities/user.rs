use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// User account entity.
///
/// `login_name` and `email` are stored lowercase so the unique indexes give
/// case-insensitive uniqueness. The password is only ever stored hashed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Login name, unique, lowercase
    #[sea_orm(unique)]
    #[validate(length(
        min = 3,
        max = 64,
        message = "Login name must be between 3 and 64 characters"
    ))]
    pub login_name: String,

    /// Email address, unique, lowercase
    #[sea_orm(unique)]
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Name shown in the UI and recorded on movements
    #[validate(length(
        min = 1,
        max = 120,
        message = "Display name must be between 1 and 120 characters"
    ))]
    pub display_name: String,

    /// Reference to the user's access level; may dangle, which resolves to
    /// zero capabilities
    pub access_level_id: Uuid,

    /// Consecutive failed login attempts since the last success
    pub failed_attempts: i32,

    /// If set and in the future, logins are rejected until this instant
    pub locked_until: Option<DateTime<Utc>>,

    /// Outstanding password-reset token, if any
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,

    /// Expiry of the outstanding password-reset token
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::access_level::Entity",
        from = "Column::AccessLevelId",
        to = "super::access_level::Column::Id"
    )]
    AccessLevel,
}

impl Related<super::access_level::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessLevel.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.failed_attempts {
                active_model.failed_attempts = Set(0);
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        }

        active_model.updated_at = Set(Some(Utc::now()));

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}

impl Model {
    /// Whether the account is currently locked out of logging in.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map(|until| until > now).unwrap_or(false)
    }
}
