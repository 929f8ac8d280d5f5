mod models;
mod schema;
mod store;
mod trait_def;

pub use models::*;
pub use schema::{ConflictPolicy, Entity, SchemaVariant, WarehouseSchema};
pub use store::SqliteWarehouse;
pub use trait_def::WarehouseStore;
