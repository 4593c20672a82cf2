//! Access level management.

use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::permissions::PermissionSet;
use crate::db::DbPool;
use crate::entities::{access_level, user};
use crate::errors::ServiceError;

/// Request body for creating an access level. Omitted permissions default to
/// denied.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NewAccessLevel {
    #[validate(length(
        min = 2,
        max = 100,
        message = "Level name must be between 2 and 100 characters"
    ))]
    pub name: String,

    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub permissions: Option<PermissionSet>,
}

/// Per-flag patch so a caller can flip one capability without restating the
/// rest.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PermissionPatch {
    pub manage_access: Option<bool>,
    pub manage_levels: Option<bool>,
    pub create_products: Option<bool>,
    pub edit_products: Option<bool>,
    pub delete_products: Option<bool>,
    pub record_movements: Option<bool>,
    pub view_history: Option<bool>,
}

impl PermissionPatch {
    pub fn apply_to(&self, base: &PermissionSet) -> PermissionSet {
        PermissionSet {
            manage_access: self.manage_access.unwrap_or(base.manage_access),
            manage_levels: self.manage_levels.unwrap_or(base.manage_levels),
            create_products: self.create_products.unwrap_or(base.create_products),
            edit_products: self.edit_products.unwrap_or(base.edit_products),
            delete_products: self.delete_products.unwrap_or(base.delete_products),
            record_movements: self.record_movements.unwrap_or(base.record_movements),
            view_history: self.view_history.unwrap_or(base.view_history),
        }
    }
}

/// Request body for updating an access level.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAccessLevel {
    #[validate(length(
        min = 2,
        max = 100,
        message = "Level name must be between 2 and 100 characters"
    ))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub permissions: Option<PermissionPatch>,
}

#[derive(Clone)]
pub struct AccessLevelService {
    db: Arc<DbPool>,
}

impl AccessLevelService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<access_level::Model>, ServiceError> {
        let levels = access_level::Entity::find()
            .order_by_asc(access_level::Column::Name)
            .all(self.db.as_ref())
            .await?;
        Ok(levels)
    }

    pub async fn get(&self, id: Uuid) -> Result<access_level::Model, ServiceError> {
        access_level::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Access level {} not found", id)))
    }

    pub async fn create(
        &self,
        input: NewAccessLevel,
    ) -> Result<access_level::Model, ServiceError> {
        input.validate()?;

        let name = input.name.trim().to_string();
        if self.name_taken(&name, None).await? {
            return Err(ServiceError::Conflict(format!(
                "An access level named '{}' already exists",
                name
            )));
        }

        let permissions = input.permissions.unwrap_or_else(PermissionSet::none);

        let mut active = access_level::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(input.description.trim().to_string()),
            is_system: Set(false),
            ..Default::default()
        };
        access_level::Model::apply_permissions(&mut active, &permissions);

        let level = active.insert(self.db.as_ref()).await?;
        tracing::info!(level_id = %level.id, name = %level.name, "access level created");
        Ok(level)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateAccessLevel,
    ) -> Result<access_level::Model, ServiceError> {
        input.validate()?;

        let existing = self.get(id).await?;
        if existing.is_system {
            return Err(ServiceError::Forbidden(
                "System access levels cannot be modified".to_string(),
            ));
        }

        if let Some(name) = &input.name {
            let name = name.trim();
            if self.name_taken(name, Some(id)).await? {
                return Err(ServiceError::Conflict(format!(
                    "An access level named '{}' already exists",
                    name
                )));
            }
        }

        if input.name.is_none() && input.description.is_none() && input.permissions.is_none() {
            return Ok(existing);
        }

        let base_permissions = existing.permissions();
        let mut active = existing.into_active_model();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(description.trim().to_string());
        }
        if let Some(patch) = input.permissions {
            let merged = patch.apply_to(&base_permissions);
            access_level::Model::apply_permissions(&mut active, &merged);
        }

        let level = active.update(self.db.as_ref()).await?;
        tracing::info!(level_id = %level.id, "access level updated");
        Ok(level)
    }

    /// Deletes a level unless it is system-defined or still assigned to users.
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        if existing.is_system {
            return Err(ServiceError::Forbidden(
                "System access levels cannot be deleted".to_string(),
            ));
        }

        let assigned = user::Entity::find()
            .filter(user::Column::AccessLevelId.eq(id))
            .count(self.db.as_ref())
            .await?;
        if assigned > 0 {
            return Err(ServiceError::Conflict(format!(
                "Access level is assigned to {} user(s) and cannot be deleted",
                assigned
            )));
        }

        access_level::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        tracing::info!(level_id = %id, "access level deleted");
        Ok(())
    }

    /// Case-insensitive name collision check, optionally excluding one row.
    async fn name_taken(&self, name: &str, exclude: Option<Uuid>) -> Result<bool, ServiceError> {
        let mut condition = Condition::all().add(
            Expr::expr(Func::lower(Expr::col(access_level::Column::Name)))
                .eq(name.to_lowercase()),
        );
        if let Some(id) = exclude {
            condition = condition.add(access_level::Column::Id.ne(id));
        }

        let count = access_level::Entity::find()
            .filter(condition)
            .count(self.db.as_ref())
            .await?;
        Ok(count > 0)
    }
}
