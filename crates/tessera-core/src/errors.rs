use thiserror::Error;

/// Result type alias using SessionError
pub type Result<T> = std::result::Result<T, SessionError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers, tests and log
/// consumers can match on without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Session state
    /// A non-key attribute was read before it was loaded
    AttributeUnavailable,
    NotFound,
    MultipleObjects,
    /// A primary-key column has neither a supplied value nor a default
    UnresolvableKey,

    // Input
    InvalidInput,
    UnknownColumn,
    KeyImmutable,
    TypeMismatch,
    /// A counter value or delta left the `i64` range
    CounterOverflow,
    InvalidSchema,
    NoSession,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::AttributeUnavailable => "ERR_ATTRIBUTE_UNAVAILABLE",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::MultipleObjects => "ERR_MULTIPLE_OBJECTS",
            ExErrorKind::UnresolvableKey => "ERR_UNRESOLVABLE_KEY",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::UnknownColumn => "ERR_UNKNOWN_COLUMN",
            ExErrorKind::KeyImmutable => "ERR_KEY_IMMUTABLE",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::CounterOverflow => "ERR_COUNTER_OVERFLOW",
            ExErrorKind::InvalidSchema => "ERR_INVALID_SCHEMA",
            ExErrorKind::NoSession => "ERR_NO_SESSION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Adapters report their failures with this type directly; session errors
/// convert into it for logging and for callers that only want the
/// classification.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    model: Option<String>,
    key: Option<String>,
    column: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            model: None,
            key: None,
            column: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add model context
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add primary-key context (display form of the key tuple)
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add column context
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(model) = &self.model {
            write!(f, " (model: {})", model)?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {})", key)?;
        }
        if let Some(column) = &self.column {
            write!(f, " (column: {})", column)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for session operations
///
/// The first four variants are the conditions callers are expected to
/// branch on: "needs load", "truly missing", "bad key input" and
/// "storage problem". The rest are input and schema validation failures.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// Read of a non-key attribute whose slot is UNAVAILABLE
    #[error("Attribute '{column}' of {model} is unavailable: it has not been loaded into this instance")]
    AttributeUnavailable { model: String, column: String },

    /// A key-targeted fetch matched no row
    #[error("{model} not found: {key}")]
    NotFound { model: String, key: String },

    /// A single-row query matched more than one row
    #[error("{model} query returned {count} rows, expected exactly one")]
    MultipleObjectsReturned { model: String, count: usize },

    /// `create` could not determine a primary-key value
    #[error("Cannot resolve primary key column '{column}' of {model}: no value supplied and no default")]
    UnresolvableKey { model: String, column: String },

    /// Any failure reported by the persistence adapter, passed through unchanged
    #[error("Adapter error: {0}")]
    Adapter(#[from] ExError),

    #[error("Unknown column '{column}' on {model}")]
    UnknownColumn { model: String, column: String },

    /// Wrong number of key values for blind construction
    #[error("{model} expects {expected} primary key values, got {actual}")]
    KeyArity {
        model: String,
        expected: usize,
        actual: usize,
    },

    #[error("Primary key column '{column}' of {model} cannot be reassigned")]
    KeyImmutable { model: String, column: String },

    #[error("Counter column '{column}' of {model} can only be incremented")]
    CounterNotSettable { model: String, column: String },

    #[error("Column '{column}' of {model} is not a counter")]
    NotACounter { model: String, column: String },

    #[error("Counter '{column}' of {model} would overflow")]
    CounterOverflow { model: String, column: String },

    #[error("Column '{column}' of {model} expects {expected}, got {actual}")]
    TypeMismatch {
        model: String,
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid schema for model '{model}': {reason}")]
    InvalidSchema { model: String, reason: String },

    #[error("No default session installed")]
    NoDefaultSession,
}

impl SessionError {
    /// Classification of this error in the canonical taxonomy
    pub fn kind(&self) -> ExErrorKind {
        match self {
            SessionError::AttributeUnavailable { .. } => ExErrorKind::AttributeUnavailable,
            SessionError::NotFound { .. } => ExErrorKind::NotFound,
            SessionError::MultipleObjectsReturned { .. } => ExErrorKind::MultipleObjects,
            SessionError::UnresolvableKey { .. } => ExErrorKind::UnresolvableKey,
            SessionError::Adapter(err) => err.kind(),
            SessionError::UnknownColumn { .. } => ExErrorKind::UnknownColumn,
            SessionError::KeyArity { .. } => ExErrorKind::InvalidInput,
            SessionError::KeyImmutable { .. } => ExErrorKind::KeyImmutable,
            SessionError::CounterNotSettable { .. } | SessionError::NotACounter { .. } => {
                ExErrorKind::InvalidInput
            }
            SessionError::TypeMismatch { .. } => ExErrorKind::TypeMismatch,
            SessionError::CounterOverflow { .. } => ExErrorKind::CounterOverflow,
            SessionError::InvalidSchema { .. } => ExErrorKind::InvalidSchema,
            SessionError::NoDefaultSession => ExErrorKind::NoSession,
        }
    }

    /// True when the error came from the persistence adapter
    pub fn is_adapter(&self) -> bool {
        matches!(self, SessionError::Adapter(_))
    }
}

/// Conversion from SessionError to ExError
///
/// Adapter errors pass through untouched; every other variant keeps its
/// model/column/key context as structured fields.
impl From<SessionError> for ExError {
    fn from(err: SessionError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        match err {
            SessionError::Adapter(inner) => inner,

            SessionError::AttributeUnavailable { model, column }
            | SessionError::UnresolvableKey { model, column }
            | SessionError::UnknownColumn { model, column }
            | SessionError::KeyImmutable { model, column }
            | SessionError::CounterNotSettable { model, column }
            | SessionError::NotACounter { model, column }
            | SessionError::CounterOverflow { model, column } => ExError::new(kind)
                .with_model(model)
                .with_column(column)
                .with_message(message),

            SessionError::TypeMismatch { model, column, .. } => ExError::new(kind)
                .with_model(model)
                .with_column(column)
                .with_message(message),

            SessionError::NotFound { model, key } => ExError::new(kind)
                .with_model(model)
                .with_key(key)
                .with_message(message),

            SessionError::MultipleObjectsReturned { model, .. }
            | SessionError::KeyArity { model, .. }
            | SessionError::InvalidSchema { model, .. } => {
                ExError::new(kind).with_model(model).with_message(message)
            }

            SessionError::NoDefaultSession => ExError::new(kind).with_message(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_kind_codes() {
        let err = SessionError::AttributeUnavailable {
            model: "todo".to_string(),
            column: "title".to_string(),
        };
        assert_eq!(err.kind().code(), "ERR_ATTRIBUTE_UNAVAILABLE");

        let err = SessionError::UnresolvableKey {
            model: "todo".to_string(),
            column: "uuid".to_string(),
        };
        assert_eq!(err.kind().code(), "ERR_UNRESOLVABLE_KEY");
    }

    #[test]
    fn test_adapter_error_passes_through() {
        let inner = ExError::new(ExErrorKind::Persistence)
            .with_op("write_row")
            .with_message("disk full");
        let err: SessionError = inner.into();
        assert!(err.is_adapter());
        assert_eq!(err.kind(), ExErrorKind::Persistence);

        let back: ExError = err.into();
        assert_eq!(back.op(), Some("write_row"));
        assert_eq!(back.message(), "disk full");
    }

    #[test]
    fn test_ex_error_carries_context() {
        let err: ExError = SessionError::NotFound {
            model: "todo".to_string(),
            key: "(1)".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert_eq!(err.model(), Some("todo"));
        assert_eq!(err.key(), Some("(1)"));
        assert!(err.to_string().starts_with("[ERR_NOT_FOUND]"));
    }

    #[test]
    fn test_ex_error_source_chain() {
        let root = ExError::new(ExErrorKind::Io).with_message("broken pipe");
        let err = ExError::new(ExErrorKind::Persistence).with_source(root);
        assert_eq!(err.source_error().map(|e| e.kind()), Some(ExErrorKind::Io));
        assert!(std::error::Error::source(&err).is_some());
    }
}
