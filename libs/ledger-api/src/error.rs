/// Category of a failed page fetch.
///
/// The collector never retries, so the kind only shapes the diagnostic
/// message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request could not be sent or the connection dropped.
    Network,
    /// Credential rejected by the ledger (HTTP 401/403 or API code 401/403).
    Auth,
    /// Non-success status or an error envelope from the ledger.
    Status,
    /// Response body could not be decoded into records.
    Decode,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Network => f.write_str("network"),
            ErrorKind::Auth => f.write_str("auth"),
            ErrorKind::Status => f.write_str("status"),
            ErrorKind::Decode => f.write_str("decode"),
        }
    }
}

/// Failure of a single `RecordSource::fetch_page` call.
///
/// Carries an `ErrorKind` for categorization and a human-readable message.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportError {
    kind: ErrorKind,
    message: String,
}

impl TransportError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Network, message: msg.into() }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Auth, message: msg.into() }
    }

    pub fn status(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Status, message: msg.into() }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Decode, message: msg.into() }
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Debug for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        Self::decode(e.to_string())
    }
}
