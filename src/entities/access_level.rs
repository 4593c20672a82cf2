use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::permissions::PermissionSet;

/// Access level entity: a named bundle of capability flags.
///
/// The capability columns are a fixed closed set; an unknown capability is a
/// compile-time error, not a silent `false`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "access_levels")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Level name
    #[validate(length(
        min = 2,
        max = 100,
        message = "Level name must be between 2 and 100 characters"
    ))]
    pub name: String,

    /// Level description
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: String,

    /// May create, edit and delete user accounts
    pub manage_access: bool,

    /// May create, edit and delete access levels
    pub manage_levels: bool,

    /// May register new products
    pub create_products: bool,

    /// May edit existing products
    pub edit_products: bool,

    /// May delete products
    pub delete_products: bool,

    /// May record stock movements
    pub record_movements: bool,

    /// May view the movement history
    pub view_history: bool,

    /// System-defined levels are created at bootstrap and immutable via the API
    pub is_system: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    Users,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
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
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        }

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
    /// Capability flags as a value the resolver and the API can hand around.
    pub fn permissions(&self) -> PermissionSet {
        PermissionSet {
            manage_access: self.manage_access,
            manage_levels: self.manage_levels,
            create_products: self.create_products,
            edit_products: self.edit_products,
            delete_products: self.delete_products,
            record_movements: self.record_movements,
            view_history: self.view_history,
        }
    }

    /// Applies a permission set to an active model.
    pub fn apply_permissions(active: &mut ActiveModel, perms: &PermissionSet) {
        active.manage_access = Set(perms.manage_access);
        active.manage_levels = Set(perms.manage_levels);
        active.create_products = Set(perms.create_products);
        active.edit_products = Set(perms.edit_products);
        active.delete_products = Set(perms.delete_products);
        active.record_movements = Set(perms.record_movements);
        active.view_history = Set(perms.view_history);
    }
}
