//! Business logic, one service per aggregate. Handlers stay thin; every rule
//! that matters lives here or in the entity validators.

pub mod access_levels;
pub mod movements;
pub mod products;
pub mod users;

use std::sync::Arc;

use crate::db::DbPool;

pub use access_levels::AccessLevelService;
pub use movements::MovementService;
pub use products::ProductService;
pub use users::UserService;

/// All services bundled for the router state.
#[derive(Clone)]
pub struct AppServices {
    pub access_levels: AccessLevelService,
    pub users: UserService,
    pub products: ProductService,
    pub movements: MovementService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            access_levels: AccessLevelService::new(db.clone()),
            users: UserService::new(db.clone()),
            products: ProductService::new(db.clone()),
            movements: MovementService::new(db),
        }
    }
}
