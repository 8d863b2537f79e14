pub mod application_store_postgres;
pub mod cluster_store_postgres;
mod database;
pub mod work_item_store_postgres;

pub use database::PostgresDatabase;
