pub mod config;
pub mod constants;
pub mod errors;
pub mod option;
pub mod remote;
pub mod result;
pub mod types;
