use lazy_static::lazy_static;
use std::string::ToString;
use std::sync::Arc;

pub mod repository;
pub mod service;

pub type Repository = Arc<Box<dyn repository::Repository>>;

lazy_static! {
    pub static ref KIND: String = "Schedule".to_string();
}

#[derive(Clone, Debug)]
pub struct NewSchedule {
    pub note_id: String,
    pub expression: String,
    pub username: Option<String>,
    pub roles: Option<String>,
    pub next_execution: chrono::NaiveDateTime,
}
