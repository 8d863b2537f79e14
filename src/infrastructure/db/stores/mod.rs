pub mod application_store;
pub mod cluster_store;
pub mod work_item_store;
