use std::collections::HashMap;

use crate::errors::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// String-keyed maps passed verbatim to interpreters.
pub type Properties = HashMap<String, String>;
