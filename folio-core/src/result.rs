//! Result payloads produced by interpreters and persisted per job.

use serde::{Deserialize, Serialize};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    Success,
    Aborted,
    Error,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    TextAppend,
    Html,
    Angular,
    Table,
    Img,
    Svg,
    Null,
    Network,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub data: String,
}

impl Message {
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Text,
            data: data.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterResult {
    pub code: Code,

    #[serde(rename = "msg", alias = "messages", default)]
    pub messages: Vec<Message>,
}

impl InterpreterResult {
    pub fn new(code: Code, messages: Vec<Message>) -> Self {
        Self { code, messages }
    }

    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Canonical results the server attaches when the interpreter cannot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredefinedResult {
    InterpreterNotFound,
    InterpreterDisabled,
    ProcessNotFound,
    Aborted,
    ResultUnparsable,
}

impl PredefinedResult {
    pub fn message(&self) -> &'static str {
        match self {
            Self::InterpreterNotFound => "Interpreter not found or not configured",
            Self::InterpreterDisabled => "Interpreter disabled",
            Self::ProcessNotFound => "Wrong configuration of interpreter.",
            Self::Aborted => "Aborted",
            Self::ResultUnparsable => "Unknown error while interpret request",
        }
    }

    pub fn code(&self) -> Code {
        match self {
            Self::Aborted => Code::Aborted,
            _ => Code::Error,
        }
    }

    pub fn result(&self) -> InterpreterResult {
        InterpreterResult::new(self.code(), vec![Message::text(self.message())])
    }
}
