//! Structured storage errors
//!
//! Backends report failures as [`StorageError`] values carrying the operation, a
//! classification and, for unique violations, the name of the index that fired. The
//! repository layer decides which of these become domain errors.

use std::fmt;

/// Storage operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    /// Creating schema objects (tables, indexes)
    Initialize,
    /// Inserting a record
    Create,
    /// Fetching a single record
    FindOne,
    /// Fetching a page of records
    FindMany,
    /// Replacing a record's business data
    Update,
    /// Setting the tombstone timestamp
    MarkDeleted,
    /// Counting records
    Count,
    /// Unclassified query
    Query,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize => write!(f, "initialize"),
            Self::Create => write!(f, "create"),
            Self::FindOne => write!(f, "find_one"),
            Self::FindMany => write!(f, "find_many"),
            Self::Update => write!(f, "update"),
            Self::MarkDeleted => write!(f, "mark_deleted"),
            Self::Count => write!(f, "count"),
            Self::Query => write!(f, "query"),
        }
    }
}

/// Category of storage error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    /// A unique index rejected the write
    UniqueViolation,
    /// Failed to reach the backend
    ConnectionFailed,
    /// Query execution failed
    QueryFailed,
    /// Record data could not be encoded or decoded
    Serialization,
    /// Operation timed out
    Timeout,
    /// Other/unknown error
    Other,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UniqueViolation => write!(f, "unique_violation"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::Serialization => write!(f, "serialization"),
            Self::Timeout => write!(f, "timeout"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured storage error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    /// The operation being performed when the error occurred
    pub operation: StorageOperation,
    /// The category of error
    pub kind: StorageErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Name of the unique index that rejected the write, when known
    pub constraint: Option<String>,
}

impl StorageError {
    /// Create a new storage error
    pub fn new(
        operation: StorageOperation,
        kind: StorageErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            constraint: None,
        }
    }

    /// Create a unique violation naming the index that fired
    pub fn unique_violation(operation: StorageOperation, constraint: impl Into<String>) -> Self {
        let constraint = constraint.into();
        Self {
            operation,
            kind: StorageErrorKind::UniqueViolation,
            message: format!("duplicate key violates unique constraint \"{}\"", constraint),
            constraint: Some(constraint),
        }
    }

    /// Create a query failed error
    pub fn query_failed(operation: StorageOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StorageErrorKind::QueryFailed, message)
    }

    /// Create a connection failed error
    pub fn connection_failed(operation: StorageOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StorageErrorKind::ConnectionFailed, message)
    }

    /// Re-tag the error with the operation that observed it
    #[must_use]
    pub fn during(mut self, operation: StorageOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether a unique index rejected the write
    pub fn is_unique_violation(&self) -> bool {
        self.kind == StorageErrorKind::UniqueViolation
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            StorageErrorKind::ConnectionFailed | StorageErrorKind::Timeout
        )
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Storage {} error during {}: {}",
            self.kind, self.operation, self.message
        )
    }
}

impl std::error::Error for StorageError {}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(
            StorageOperation::Query,
            StorageErrorKind::Serialization,
            err.to_string(),
        )
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        match err {
            E::PoolTimedOut => Self::new(
                StorageOperation::Query,
                StorageErrorKind::Timeout,
                "Connection pool timed out",
            ),
            E::PoolClosed => {
                Self::connection_failed(StorageOperation::Query, "Connection pool is closed")
            }
            E::Io(e) => Self::connection_failed(StorageOperation::Query, e.to_string()),
            E::Tls(e) => {
                Self::connection_failed(StorageOperation::Query, format!("TLS error: {}", e))
            }
            E::ColumnDecode { index, source } => Self::new(
                StorageOperation::Query,
                StorageErrorKind::Serialization,
                format!("Failed to decode column {}: {}", index, source),
            ),
            E::Decode(e) => Self::new(
                StorageOperation::Query,
                StorageErrorKind::Serialization,
                e.to_string(),
            ),
            E::Database(db_err) => {
                if db_err.is_unique_violation() {
                    let mut error = Self::new(
                        StorageOperation::Query,
                        StorageErrorKind::UniqueViolation,
                        db_err.to_string(),
                    );
                    error.constraint = db_err.constraint().map(str::to_string);
                    error
                } else {
                    Self::query_failed(StorageOperation::Query, db_err.to_string())
                }
            }
            E::WorkerCrashed => {
                Self::connection_failed(StorageOperation::Query, "Database worker crashed")
            }
            _ => Self::new(
                StorageOperation::Query,
                StorageErrorKind::Other,
                err.to_string(),
            ),
        }
    }
}
