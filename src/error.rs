//! Server error types

use axum::http::StatusCode;
use thiserror::Error;

/// Main server error type
#[derive(Debug, Error)]
pub enum ServerError {
    // ========== Pool / List Errors ==========
    /// Pool is not configured
    #[error("No pool with id {0}")]
    PoolNotFound(String),

    /// List id or artifact does not exist (read path)
    #[error("No list with id {0}")]
    NoSuchList(String),

    /// Status update names a list that does not exist
    #[error("No list with uri {0}")]
    UnknownListUri(String),

    // ========== Validation Errors ==========
    /// Index outside `[0, size)`
    #[error("Index out of bounds (uri={uri}, index={index})")]
    IndexOutOfBounds { uri: String, index: i64 },

    /// Status value outside `[0, 2^bits)`
    #[error("Value out of range (uri={uri}, value={value})")]
    ValueOutOfRange { uri: String, value: i64 },

    /// Reference amount below one
    #[error("Amount must be greater than 0, got {0}")]
    InvalidAmount(i64),

    /// Malformed request
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Accept header could not be interpreted
    #[error("Mediatype {0} is not supported")]
    UnsupportedMediaType(String),

    // ========== Authentication Errors ==========
    /// Missing X-Api-Key header
    #[error("Missing api key")]
    AuthMissing,

    /// Api key does not match any configured hash
    #[error("Invalid api key")]
    AuthInvalid,

    // ========== Capacity / Contention ==========
    /// Prefetch buffer cannot satisfy the demand (FAIL policy)
    #[error("Too many indices requested from pool {0}")]
    RateLimitReached(String),

    /// Write conflict retries exhausted
    #[error("conflict: {0}")]
    Conflict(String),

    // ========== Backend Errors ==========
    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Token artifact store failed
    #[error("token store error: {0}")]
    TokenStore(#[from] TokenStoreError),

    /// Token signing failed
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    // ========== Server Errors ==========
    /// Service is stopping or not started
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Data corruption detected
    #[error("data corruption: {0}")]
    Corruption(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite database error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Pool has not been created
    #[error("pool not found: {0}")]
    PoolNotFound(String),

    /// List has not been created
    #[error("list not found: {0}")]
    ListNotFound(String),

    /// List URI does not end in a list id
    #[error("invalid list uri: {0}")]
    InvalidListUri(String),

    /// Index outside the list
    #[error("index {index} out of bounds for list {uri} of size {size}")]
    IndexOutOfBounds { uri: String, index: i64, size: u32 },

    /// Value wider than the list's bits
    #[error("value {value} out of range for list {uri} with {bits} bits")]
    ValueOutOfRange { uri: String, value: i64, bits: u8 },

    /// Serialization conflict that outlived the retry budget
    #[error("write conflict on {key} persisted after {attempts} attempts")]
    Conflict { key: String, attempts: u32 },
}

/// Token artifact store errors
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata file could not be (de)serialized
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// List id is not usable as a file name
    #[error("invalid list id: {0}")]
    InvalidListId(String),
}

/// Signer collaborator errors
#[derive(Debug, Error)]
pub enum SigningError {
    /// Key material missing or malformed
    #[error("invalid signing key: {0}")]
    Key(String),

    /// Token body could not be encoded
    #[error("encoding failed: {0}")]
    Encoding(String),
}

/// Server result type alias
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            ServerError::UnknownListUri(_)
            | ServerError::IndexOutOfBounds { .. }
            | ServerError::ValueOutOfRange { .. }
            | ServerError::InvalidAmount(_)
            | ServerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            ServerError::AuthMissing | ServerError::AuthInvalid => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            ServerError::PoolNotFound(_) | ServerError::NoSuchList(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            ServerError::Conflict(_) => StatusCode::CONFLICT,

            // 415 Unsupported Media Type
            ServerError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,

            // 429 Too Many Requests
            ServerError::RateLimitReached(_) => StatusCode::TOO_MANY_REQUESTS,

            // 503 Service Unavailable
            ServerError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            ServerError::Storage(_)
            | ServerError::TokenStore(_)
            | ServerError::Signing(_)
            | ServerError::Internal(_)
            | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for API response
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::PoolNotFound(_) => "NO_SUCH_POOL",
            ServerError::NoSuchList(_) | ServerError::UnknownListUri(_) => "NO_SUCH_LIST",
            ServerError::IndexOutOfBounds { .. } => "INDEX_OUT_OF_BOUNDS",
            ServerError::ValueOutOfRange { .. } | ServerError::InvalidAmount(_) => {
                "VALUE_OUT_OF_RANGE"
            }
            ServerError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ServerError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            ServerError::AuthMissing | ServerError::AuthInvalid => "UNAUTHORIZED",
            ServerError::RateLimitReached(_) => "RATE_LIMIT_REACHED",
            ServerError::Conflict(_) => "CONFLICT",
            ServerError::Storage(_) => "STORAGE_ERROR",
            ServerError::TokenStore(_) => "TOKEN_STORE_ERROR",
            ServerError::Signing(_) => "SIGNING_ERROR",
            ServerError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Check if error is recoverable (client can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ServerError::RateLimitReached(_)
                | ServerError::Conflict(_)
                | ServerError::ServiceUnavailable(_)
                | ServerError::Storage(StorageError::ConnectionFailed(_))
        )
    }
}

impl StorageError {
    /// Whether the backend reported a transient write conflict worth retrying
    #[cfg(feature = "sqlite")]
    pub fn is_conflict(&self) -> bool {
        match self {
            StorageError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Whether the backend reported a transient write conflict worth retrying
    #[cfg(not(feature = "sqlite"))]
    pub fn is_conflict(&self) -> bool {
        false
    }
}

// Conversions from external errors

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::InvalidArgument(e.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for ServerError {
    fn from(e: rusqlite::Error) -> Self {
        ServerError::Storage(StorageError::Sqlite(e))
    }
}

impl From<StorageError> for ServerError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::PoolNotFound(pool) => ServerError::PoolNotFound(pool),
            StorageError::ListNotFound(uri) | StorageError::InvalidListUri(uri) => {
                ServerError::UnknownListUri(uri)
            }
            StorageError::IndexOutOfBounds { uri, index, .. } => {
                ServerError::IndexOutOfBounds { uri, index }
            }
            StorageError::ValueOutOfRange { uri, value, .. } => {
                ServerError::ValueOutOfRange { uri, value }
            }
            StorageError::Conflict { key, attempts } => {
                ServerError::Conflict(format!("{key} after {attempts} attempts"))
            }
            other => ServerError::Storage(other),
        }
    }
}
