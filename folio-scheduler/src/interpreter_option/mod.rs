use lazy_static::lazy_static;
use std::string::ToString;

pub mod service;

lazy_static! {
    pub static ref KIND: String = "InterpreterOption".to_string();
}
