pub mod job;
pub mod job_source;
pub mod run_record;
