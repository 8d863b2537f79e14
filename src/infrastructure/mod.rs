pub mod cache;
pub mod cluster;
pub mod db;
pub mod notify;
