//! Error types for the push relay.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Result alias used throughout the crate.
pub type RelayResult<T> = std::result::Result<T, RelayError>;

/// Push relay errors.
///
/// None of these are recovered from: a failed notification is dropped and the
/// error surfaces as a rejected event promise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Malformed push payload: {0}")]
    Payload(String),
    #[error("Failed to show notification: {0}")]
    Notification(String),
    #[error("Failed to query clients: {0}")]
    Clients(String),
    #[error("Window operation failed: {0}")]
    Window(String),
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

impl From<RelayError> for JsValue {
    fn from(err: RelayError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Payload(err.to_string())
    }
}

