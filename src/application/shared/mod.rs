pub mod job_poller;
pub mod mail_templates;
pub mod outcome;
pub mod reservation;
