// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RoleResolution,
    RowFetch,
    Delete,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoleResolution => "role resolution",
            Self::RowFetch => "row fetch",
            Self::Delete => "delete",
        }
    }
}

/// Failure reported by a record service, keeping whatever body it sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceFault {
    pub status: Option<u16>,
    pub payload: Value,
}

impl ServiceFault {
    pub fn new(status: Option<u16>, payload: Value) -> Self {
        Self { status, payload }
    }

    pub fn message(&self) -> String {
        extract_message(&self.payload)
    }
}

impl fmt::Display for ServiceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {status})", self.message()),
            None => f.write_str(&self.message()),
        }
    }
}

impl std::error::Error for ServiceFault {}

/// `body.message`, then `message`, then the string form of the payload.
pub fn extract_message(payload: &Value) -> String {
    let nested = payload
        .get("body")
        .and_then(|body| body.get("message"))
        .and_then(Value::as_str);
    if let Some(message) = nested.filter(|message| !message.is_empty()) {
        return message.to_owned();
    }

    let top = payload.get("message").and_then(Value::as_str);
    if let Some(message) = top.filter(|message| !message.is_empty()) {
        return message.to_owned();
    }

    match payload {
        Value::String(text) => text.clone(),
        Value::Null => "unknown error".to_owned(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorPayload {
    Structured(Value),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub payload: ErrorPayload,
}

impl ErrorInfo {
    pub fn from_error(kind: ErrorKind, error: &anyhow::Error) -> Self {
        let payload = match error.downcast_ref::<ServiceFault>() {
            Some(fault) => ErrorPayload::Structured(fault.payload.clone()),
            None => ErrorPayload::Text(format!("{error:#}")),
        };
        Self { kind, payload }
    }

    pub fn message(&self) -> String {
        match &self.payload {
            ErrorPayload::Structured(value) => extract_message(value),
            ErrorPayload::Text(text) => text.clone(),
        }
    }
}
