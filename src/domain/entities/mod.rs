pub mod application;
pub mod cluster;
pub mod cluster_job;
pub mod work_item;
