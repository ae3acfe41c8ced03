pub mod constant;
pub mod event;
pub mod gateway;
pub mod handler;
pub mod interpreter_option;
pub mod job;
pub mod job_batch;
pub mod job_payload;
pub mod job_result;
pub mod metric;
pub mod process;
pub mod schedule;
pub mod scheduler;
pub mod store;
