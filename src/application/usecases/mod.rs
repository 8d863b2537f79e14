pub mod dispatch_work_item;
pub mod enqueue_work_item;
pub mod lock_instance;
pub mod release_job_lock;
pub mod watch_instance_creation;
pub mod worker_loop;
pub mod worker_pool;
