pub mod poll_interval;
pub mod reservation_policy;
pub mod state_machine;
