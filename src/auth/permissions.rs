//! Capability model and the per-request permission resolver.
//!
//! Capabilities are a closed enumeration and the permission set is a
//! fixed-field struct, so a misspelled capability fails at compile time
//! instead of silently resolving to "denied".

use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{access_level, user};
use crate::errors::ServiceError;

/// One named permission bit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Capability {
    ManageAccess,
    ManageLevels,
    CreateProducts,
    EditProducts,
    DeleteProducts,
    RecordMovements,
    ViewHistory,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageAccess => "manage_access",
            Capability::ManageLevels => "manage_levels",
            Capability::CreateProducts => "create_products",
            Capability::EditProducts => "edit_products",
            Capability::DeleteProducts => "delete_products",
            Capability::RecordMovements => "record_movements",
            Capability::ViewHistory => "view_history",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The effective permission flags of an access level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PermissionSet {
    pub manage_access: bool,
    pub manage_levels: bool,
    pub create_products: bool,
    pub edit_products: bool,
    pub delete_products: bool,
    pub record_movements: bool,
    pub view_history: bool,
}

impl PermissionSet {
    /// Every capability granted; the Administrator bootstrap level.
    pub fn all() -> Self {
        Self {
            manage_access: true,
            manage_levels: true,
            create_products: true,
            edit_products: true,
            delete_products: true,
            record_movements: true,
            view_history: true,
        }
    }

    /// No capability granted; the default for user-created levels.
    pub fn none() -> Self {
        Self::default()
    }

    /// The reduced subset granted to the bootstrap "User" level.
    pub fn standard_user() -> Self {
        Self {
            manage_access: false,
            manage_levels: false,
            create_products: true,
            edit_products: true,
            delete_products: false,
            record_movements: true,
            view_history: true,
        }
    }

    pub fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManageAccess => self.manage_access,
            Capability::ManageLevels => self.manage_levels,
            Capability::CreateProducts => self.create_products,
            Capability::EditProducts => self.edit_products,
            Capability::DeleteProducts => self.delete_products,
            Capability::RecordMovements => self.record_movements,
            Capability::ViewHistory => self.view_history,
        }
    }
}

/// Resolves a user's effective permissions through the user -> access level
/// indirection.
#[derive(Clone)]
pub struct PermissionResolver {
    db: Arc<DbPool>,
}

impl PermissionResolver {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Two-hop lookup with graceful degradation: a missing user or a dangling
    /// `access_level_id` yields `None`, which callers treat as "deny". Both
    /// hops are fetched fresh per call; permissions may change between
    /// requests and the lookups are primary-key reads.
    pub async fn resolve(&self, user_id: Uuid) -> Result<Option<PermissionSet>, ServiceError> {
        let Some(user) = user::Entity::find_by_id(user_id).one(self.db.as_ref()).await? else {
            return Ok(None);
        };

        let Some(level) = access_level::Entity::find_by_id(user.access_level_id)
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(None);
        };

        Ok(Some(level.permissions()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_grants_every_capability() {
        let perms = PermissionSet::all();
        for cap in [
            Capability::ManageAccess,
            Capability::ManageLevels,
            Capability::CreateProducts,
            Capability::EditProducts,
            Capability::DeleteProducts,
            Capability::RecordMovements,
            Capability::ViewHistory,
        ] {
            assert!(perms.grants(cap), "{} should be granted", cap);
        }
    }

    #[test]
    fn none_grants_nothing() {
        let perms = PermissionSet::none();
        assert!(!perms.grants(Capability::ManageAccess));
        assert!(!perms.grants(Capability::ViewHistory));
    }

    #[test]
    fn standard_user_is_a_reduced_subset() {
        let perms = PermissionSet::standard_user();
        assert!(!perms.grants(Capability::ManageAccess));
        assert!(!perms.grants(Capability::ManageLevels));
        assert!(!perms.grants(Capability::DeleteProducts));
        assert!(perms.grants(Capability::CreateProducts));
        assert!(perms.grants(Capability::EditProducts));
        assert!(perms.grants(Capability::RecordMovements));
        assert!(perms.grants(Capability::ViewHistory));
    }
}
