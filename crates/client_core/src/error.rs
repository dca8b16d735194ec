use shared::error::{ApiError, ValidationError};
use thiserror::Error;

/// A failed call against the item or video resource. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed{}: {cause}", status_suffix(.status))]
pub struct NetworkError {
    pub operation: &'static str,
    pub status: Option<u16>,
    pub cause: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|status| format!(" with status {status}"))
        .unwrap_or_default()
}

impl NetworkError {
    pub fn new(operation: &'static str, status: Option<u16>, cause: impl Into<String>) -> Self {
        Self {
            operation,
            status,
            cause: cause.into(),
        }
    }

    pub(crate) fn transport(operation: &'static str, err: reqwest::Error) -> Self {
        Self::new(
            operation,
            err.status().map(|status| status.as_u16()),
            err.to_string(),
        )
    }

    /// Builds the error from a non-2xx response, preferring the server's
    /// `ApiError` message over the raw body.
    pub(crate) fn from_response_body(operation: &'static str, status: u16, body: &str) -> Self {
        let cause = match serde_json::from_str::<ApiError>(body) {
            Ok(api_error) => api_error.message,
            Err(_) if body.trim().is_empty() => "empty response body".to_string(),
            Err(_) => body.trim().to_string(),
        };
        Self::new(operation, Some(status), cause)
    }
}

/// Where the displayed order came from after a failed reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restored {
    /// The last confirmed order held locally.
    Snapshot,
    /// A fresh `fetch_all`.
    Refetched,
    /// A newer move took over the display before the rollback finished.
    Superseded,
    /// Nothing reliable was available; the displayed order was left as is.
    Nothing,
}

impl std::fmt::Display for Restored {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Restored::Snapshot => "last confirmed order",
            Restored::Refetched => "server order",
            Restored::Superseded => "nothing, a newer move is in flight",
            Restored::Nothing => "nothing, no confirmed order available",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("reorder #{seq} was not saved ({source}); restored {restored}")]
    OrderConflict {
        seq: u64,
        source: NetworkError,
        restored: Restored,
    },
}
