pub mod application;
pub mod cluster;
pub mod work_item;

pub use application::ApplicationRow;
pub use cluster::ClusterRow;
pub use work_item::WorkItemRow;
