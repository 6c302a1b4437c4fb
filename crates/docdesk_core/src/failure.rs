use std::fmt;

/// Transport-neutral description of a failed backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The caller aborted the request.
    Cancelled,
    Timeout,
    Network(String),
    /// Non-success HTTP status, with the server's error text when it sent one.
    Http { status: u16, message: Option<String> },
    /// The response body could not be decoded.
    Decode(String),
    Other(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Cancelled => write!(f, "cancelled"),
            Failure::Timeout => write!(f, "timeout"),
            Failure::Network(msg) => write!(f, "network error: {msg}"),
            Failure::Http {
                status,
                message: Some(msg),
            } => write!(f, "http status {status}: {msg}"),
            Failure::Http {
                status,
                message: None,
            } => write!(f, "http status {status}"),
            Failure::Decode(msg) => write!(f, "invalid response: {msg}"),
            Failure::Other(msg) => write!(f, "{msg}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    Api,
    Cancelled,
    Unknown,
}

/// User-facing classification of a [`Failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    pub can_retry: bool,
}

impl ErrorInfo {
    fn new(kind: ErrorKind, message: impl Into<String>, can_retry: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            can_retry,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

/// Maps a failure to an error kind, a short message and retry eligibility.
///
/// Cancellation and validation-class (4xx) API errors are not retryable.
/// 408 counts as a timeout and 429 as a retryable API error.
pub fn classify(failure: &Failure) -> ErrorInfo {
    match failure {
        Failure::Cancelled => ErrorInfo::new(ErrorKind::Cancelled, "Request was cancelled.", false),
        Failure::Timeout => ErrorInfo::new(
            ErrorKind::Timeout,
            "The request timed out. Please try again.",
            true,
        ),
        Failure::Network(_) => ErrorInfo::new(
            ErrorKind::Network,
            "Network error. Check your connection and try again.",
            true,
        ),
        Failure::Http { status: 408, .. } => ErrorInfo::new(
            ErrorKind::Timeout,
            "The server timed out. Please try again.",
            true,
        ),
        Failure::Http { status, message } => {
            let text = message
                .as_deref()
                .map(str::trim)
                .filter(|msg| !msg.is_empty())
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| default_api_message(*status));
            let can_retry = *status == 429 || *status >= 500;
            ErrorInfo::new(ErrorKind::Api, text, can_retry)
        }
        Failure::Decode(_) | Failure::Other(_) => ErrorInfo::new(
            ErrorKind::Unknown,
            "Something went wrong. Please try again.",
            true,
        ),
    }
}

fn default_api_message(status: u16) -> String {
    match status {
        401 => "Your session has expired. Please sign in again.".to_string(),
        403 => "You do not have access to these documents.".to_string(),
        404 => "The requested resource was not found.".to_string(),
        429 => "Too many requests. Please wait a moment and try again.".to_string(),
        500..=599 => format!("The server failed to process the request (status {status})."),
        _ => format!("The request was rejected (status {status})."),
    }
}
