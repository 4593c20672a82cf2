pub mod access_level;
pub mod product;
pub mod stock_movement;
pub mod user;
