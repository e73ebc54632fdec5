//! Client error types.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the registry, the transport and the entity layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("relationship type '{0}' is not registered")]
    UnregisteredType(String),

    #[error("type registry is locked; cannot register '{0}'")]
    RegistryLocked(String),

    #[error("expected a {expected} entity but the resolver returned {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },

    #[error("cannot reference an entity that has no id")]
    MissingId,

    #[error("invalid id '{0}'")]
    InvalidId(String),

    #[error("invalid locale '{0}': expected 2 to 8 characters")]
    InvalidLocale(String),

    #[error("MangaDex API error (status {status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("unexpected content type '{0}'")]
    ContentType(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication required")]
    AuthRequired,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed {kind} schema: {source}")]
    Schema {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl Error {
    /// True when the remote reported 404 or a lookup came back empty.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Api { status, .. } => *status == 404,
            Error::Http(e) => e.status().is_some_and(|s| s.as_u16() == 404),
            _ => false,
        }
    }

    /// True for missing/expired credentials and 401/403 responses.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Error::AuthRequired | Error::Auth(_) => true,
            Error::Api { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// True for errors raised while registering or looking up relationship types.
    pub fn is_registration(&self) -> bool {
        matches!(self, Error::UnregisteredType(_) | Error::RegistryLocked(_))
    }

    pub(crate) fn schema(kind: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Schema { kind: kind.into(), source }
    }
}
