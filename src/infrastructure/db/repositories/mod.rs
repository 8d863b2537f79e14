pub mod application_repository;
pub mod cluster_repository;
pub mod factory;
pub mod queue_repository;

pub use factory::Repositories;
