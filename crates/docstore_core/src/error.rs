//! Error types for docstore core.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Result type for backend RPCs.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for core operations that also decode records.
pub type CoreResult<T> = Result<T, CoreError>;

/// Backend status code attached to every [`StoreError`].
///
/// This is the canonical RPC status set used by the hosted store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// Not an error.
    Ok,
    /// The operation was cancelled.
    Cancelled,
    /// Unknown error.
    Unknown,
    /// The request was malformed.
    InvalidArgument,
    /// The deadline expired before the operation completed.
    DeadlineExceeded,
    /// A requested entity was not found.
    NotFound,
    /// The entity being created already exists.
    AlreadyExists,
    /// The caller lacks permission.
    PermissionDenied,
    /// A quota or resource was exhausted.
    ResourceExhausted,
    /// The system is not in a state required for the operation.
    FailedPrecondition,
    /// The operation was aborted, typically by a concurrency conflict.
    Aborted,
    /// The operation was attempted past the valid range.
    OutOfRange,
    /// The operation is not implemented.
    Unimplemented,
    /// Internal backend error.
    Internal,
    /// The service is currently unavailable.
    Unavailable,
    /// Unrecoverable data loss or corruption.
    DataLoss,
    /// The request lacks valid credentials.
    Unauthenticated,
}

impl Code {
    /// Returns the `SCREAMING_SNAKE_CASE` status name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Code::Ok => "OK",
            Code::Cancelled => "CANCELLED",
            Code::Unknown => "UNKNOWN",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::NotFound => "NOT_FOUND",
            Code::AlreadyExists => "ALREADY_EXISTS",
            Code::PermissionDenied => "PERMISSION_DENIED",
            Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Aborted => "ABORTED",
            Code::OutOfRange => "OUT_OF_RANGE",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Internal => "INTERNAL",
            Code::Unavailable => "UNAVAILABLE",
            Code::DataLoss => "DATA_LOSS",
            Code::Unauthenticated => "UNAUTHENTICATED",
        }
    }

    /// Maps an HTTP status to the closest code.
    #[must_use]
    pub fn from_http_status(status: u16) -> Self {
        match status {
            200..=299 => Code::Ok,
            400 => Code::InvalidArgument,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::NotFound,
            409 => Code::Aborted,
            412 => Code::FailedPrecondition,
            429 => Code::ResourceExhausted,
            499 => Code::Cancelled,
            501 => Code::Unimplemented,
            503 => Code::Unavailable,
            504 => Code::DeadlineExceeded,
            500..=599 => Code::Internal,
            _ => Code::Unknown,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Code {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "OK" => Code::Ok,
            "CANCELLED" => Code::Cancelled,
            "UNKNOWN" => Code::Unknown,
            "INVALID_ARGUMENT" => Code::InvalidArgument,
            "DEADLINE_EXCEEDED" => Code::DeadlineExceeded,
            "NOT_FOUND" => Code::NotFound,
            "ALREADY_EXISTS" => Code::AlreadyExists,
            "PERMISSION_DENIED" => Code::PermissionDenied,
            "RESOURCE_EXHAUSTED" => Code::ResourceExhausted,
            "FAILED_PRECONDITION" => Code::FailedPrecondition,
            "ABORTED" => Code::Aborted,
            "OUT_OF_RANGE" => Code::OutOfRange,
            "UNIMPLEMENTED" => Code::Unimplemented,
            "INTERNAL" => Code::Internal,
            "UNAVAILABLE" => Code::Unavailable,
            "DATA_LOSS" => Code::DataLoss,
            "UNAUTHENTICATED" => Code::Unauthenticated,
            _ => return Err(()),
        })
    }
}

/// Backend RPC that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `beginTransaction`
    BeginTransaction,
    /// `lookup`
    Lookup,
    /// `runQuery`
    RunQuery,
    /// `commit`
    Commit,
    /// `rollback`
    Rollback,
}

impl Method {
    /// Returns the wire name of the RPC.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::BeginTransaction => "beginTransaction",
            Method::Lookup => "lookup",
            Method::RunQuery => "runQuery",
            Method::Commit => "commit",
            Method::Rollback => "rollback",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend fault, classified by the RPC that failed.
///
/// Every variant carries the backend's diagnostic message, the originating
/// method name and the status code, for direct display to an operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend could not start a transaction.
    #[error("BeginFailed({message}): {method} {code}")]
    BeginFailed {
        /// Backend diagnostic message.
        message: String,
        /// Originating RPC.
        method: Method,
        /// Backend status code.
        code: Code,
    },

    /// A lookup RPC failed.
    #[error("LookupFailed({message}): {method} {code}")]
    LookupFailed {
        /// Backend diagnostic message.
        message: String,
        /// Originating RPC.
        method: Method,
        /// Backend status code.
        code: Code,
    },

    /// A query RPC failed.
    #[error("QueryFailed({message}): {method} {code}")]
    QueryFailed {
        /// Backend diagnostic message.
        message: String,
        /// Originating RPC.
        method: Method,
        /// Backend status code.
        code: Code,
    },

    /// The backend rejected a commit; nothing was applied.
    #[error("CommitFailed({message}): {method} {code}")]
    CommitFailed {
        /// Backend diagnostic message.
        message: String,
        /// Originating RPC.
        method: Method,
        /// Backend status code.
        code: Code,
    },

    /// A rollback RPC failed.
    #[error("RollbackFailed({message}): {method} {code}")]
    RollbackFailed {
        /// Backend diagnostic message.
        message: String,
        /// Originating RPC.
        method: Method,
        /// Backend status code.
        code: Code,
    },
}

impl StoreError {
    /// Creates the error variant matching the failed RPC.
    pub fn new(method: Method, code: Code, message: impl Into<String>) -> Self {
        let message = message.into();
        match method {
            Method::BeginTransaction => Self::BeginFailed {
                message,
                method,
                code,
            },
            Method::Lookup => Self::LookupFailed {
                message,
                method,
                code,
            },
            Method::RunQuery => Self::QueryFailed {
                message,
                method,
                code,
            },
            Method::Commit => Self::CommitFailed {
                message,
                method,
                code,
            },
            Method::Rollback => Self::RollbackFailed {
                message,
                method,
                code,
            },
        }
    }

    /// Creates a `BeginFailed` error.
    pub fn begin_failed(code: Code, message: impl Into<String>) -> Self {
        Self::new(Method::BeginTransaction, code, message)
    }

    /// Creates a `LookupFailed` error.
    pub fn lookup_failed(code: Code, message: impl Into<String>) -> Self {
        Self::new(Method::Lookup, code, message)
    }

    /// Creates a `QueryFailed` error.
    pub fn query_failed(code: Code, message: impl Into<String>) -> Self {
        Self::new(Method::RunQuery, code, message)
    }

    /// Creates a `CommitFailed` error.
    pub fn commit_failed(code: Code, message: impl Into<String>) -> Self {
        Self::new(Method::Commit, code, message)
    }

    /// Creates a `RollbackFailed` error.
    pub fn rollback_failed(code: Code, message: impl Into<String>) -> Self {
        Self::new(Method::Rollback, code, message)
    }

    fn parts(&self) -> (&str, Method, Code) {
        match self {
            Self::BeginFailed {
                message,
                method,
                code,
            }
            | Self::LookupFailed {
                message,
                method,
                code,
            }
            | Self::QueryFailed {
                message,
                method,
                code,
            }
            | Self::CommitFailed {
                message,
                method,
                code,
            }
            | Self::RollbackFailed {
                message,
                method,
                code,
            } => (message, *method, *code),
        }
    }

    /// Returns the backend diagnostic message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.parts().0
    }

    /// Returns the RPC that failed.
    #[must_use]
    pub fn method(&self) -> Method {
        self.parts().1
    }

    /// Returns the backend status code.
    #[must_use]
    pub fn code(&self) -> Code {
        self.parts().2
    }

    /// Returns the sub-reason name (`BeginFailed`, `CommitFailed`, ...).
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::BeginFailed { .. } => "BeginFailed",
            Self::LookupFailed { .. } => "LookupFailed",
            Self::QueryFailed { .. } => "QueryFailed",
            Self::CommitFailed { .. } => "CommitFailed",
            Self::RollbackFailed { .. } => "RollbackFailed",
        }
    }
}

/// Errors converting an entity into a typed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A required property is absent.
    #[error("missing property `{name}`")]
    MissingProperty {
        /// Property name.
        name: String,
    },

    /// A property has an unexpected value type.
    #[error("property `{name}` has type {actual}, expected {expected}")]
    PropertyType {
        /// Property name.
        name: String,
        /// Expected value type.
        expected: &'static str,
        /// Actual value type.
        actual: &'static str,
    },

    /// The entity has no key.
    #[error("entity has no key")]
    MissingKey,

    /// The entity key is of another kind.
    #[error("expected kind {expected}, found {actual}")]
    KindMismatch {
        /// Kind the record maps to.
        expected: &'static str,
        /// Kind of the entity key.
        actual: String,
    },
}

impl DecodeError {
    /// Creates a property type error.
    pub fn property_type(
        name: impl Into<String>,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        Self::PropertyType {
            name: name.into(),
            expected,
            actual,
        }
    }
}

/// Errors from record-level operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Backend RPC error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Record decoding error.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}
