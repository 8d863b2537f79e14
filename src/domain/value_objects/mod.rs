pub mod cache_keys;
pub mod ids;
pub mod timestamps;
