use lazy_static::lazy_static;
use std::string::ToString;
use std::sync::Arc;

pub mod repository;
pub mod service;

pub type Repository = Arc<Box<dyn repository::Repository>>;

lazy_static! {
    pub static ref KIND: String = "Job".to_string();
}

/// A paragraph to be inserted into a batch.
#[derive(Clone, Debug)]
pub struct NewJob {
    pub batch_id: i64,
    pub note_id: String,
    pub paragraph_id: String,
    pub index_number: i32,
    pub shebang: String,
    pub username: Option<String>,
    pub roles: Option<String>,
}
