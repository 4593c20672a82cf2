//! First-run seeding: the two built-in access levels and the initial
//! administrator account. Safe to run on every startup.

use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::auth::permissions::PermissionSet;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::{access_level, user};
use crate::errors::ServiceError;

pub const ADMIN_LEVEL_NAME: &str = "Administrator";
pub const USER_LEVEL_NAME: &str = "User";
pub const ADMIN_LOGIN_NAME: &str = "admin";
const ADMIN_EMAIL: &str = "admin@localhost";

/// Seeds the system access levels and the admin account if they do not
/// exist. Existing rows are left untouched, so operator edits to the admin
/// account survive restarts.
pub async fn seed(db: &DbPool, config: &AppConfig) -> Result<(), ServiceError> {
    let admin_level = ensure_level(
        db,
        ADMIN_LEVEL_NAME,
        "Full access to every feature",
        &PermissionSet::all(),
    )
    .await?;

    ensure_level(
        db,
        USER_LEVEL_NAME,
        "Day-to-day stock work without administration",
        &PermissionSet::standard_user(),
    )
    .await?;

    ensure_admin_user(db, config, admin_level.id).await?;
    Ok(())
}

async fn ensure_level(
    db: &DbPool,
    name: &str,
    description: &str,
    permissions: &PermissionSet,
) -> Result<access_level::Model, ServiceError> {
    let existing = access_level::Entity::find()
        .filter(
            Condition::all()
                .add(access_level::Column::IsSystem.eq(true))
                .add(access_level::Column::Name.eq(name)),
        )
        .one(db)
        .await?;

    if let Some(level) = existing {
        return Ok(level);
    }

    let mut active = access_level::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(description.to_string()),
        is_system: Set(true),
        ..Default::default()
    };
    access_level::Model::apply_permissions(&mut active, permissions);

    let level = active.insert(db).await?;
    tracing::info!(level_id = %level.id, name = %level.name, "seeded system access level");
    Ok(level)
}

async fn ensure_admin_user(
    db: &DbPool,
    config: &AppConfig,
    admin_level_id: Uuid,
) -> Result<(), ServiceError> {
    let user_count = user::Entity::find().count(db).await?;
    if user_count > 0 {
        return Ok(());
    }

    let admin = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        login_name: Set(ADMIN_LOGIN_NAME.to_string()),
        email: Set(ADMIN_EMAIL.to_string()),
        password_hash: Set(hash_password(&config.admin_password)?),
        display_name: Set("Administrator".to_string()),
        access_level_id: Set(admin_level_id),
        locked_until: Set(None),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = %admin.id, "seeded initial administrator account");
    Ok(())
}
