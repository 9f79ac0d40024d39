//! Error types shared by the mapper and storage adapters.

/// Failure reported by a storage adapter.
///
/// The mapper passes these through untouched; callers that need to tell a
/// duplicate key from a broken connection match on the variant.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness, NOT NULL, foreign key, or check constraint rejected the statement.
    #[error("constraint violation: {message}")]
    ConstraintViolation {
        /// The offending column when the backend reports it.
        column: Option<String>,
        message: String,
    },
    /// The backend could not be reached or the connection was lost.
    #[error("connection failure: {message}")]
    ConnectionFailure { message: String },
    /// Any other backend or driver error.
    #[error("storage error")]
    Other {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StorageError {
    pub fn constraint(column: Option<&str>, message: impl Into<String>) -> Self {
        StorageError::ConstraintViolation {
            column: column.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        StorageError::ConnectionFailure {
            message: message.into(),
        }
    }

    /// Wrap a backend/driver error.
    pub fn other<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StorageError::Other {
            source: Box::new(e),
        }
    }

    /// An `Other` error carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        let message: String = message.into();
        StorageError::Other {
            source: message.into(),
        }
    }

    /// Column named by a constraint violation, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            StorageError::ConstraintViolation { column, .. } => column.as_deref(),
            _ => None,
        }
    }
}

/// Convenience alias for adapter results.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned by mapper operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The storage adapter failed; the original error is kept as is.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Error while mapping a storage row onto an entity.
    #[error("mapping error")]
    Mapping {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The entity type was never added to the registry the mapper uses.
    #[error("entity type `{type_name}` is not registered")]
    Unregistered { type_name: &'static str },
    /// No computed property with this name is registered for the type.
    #[error("`{type_name}` has no computed property `{property}`")]
    UnknownProperty {
        type_name: &'static str,
        property: String,
    },
    /// The computed property holds a different type than the one requested.
    #[error("computed property `{type_name}.{property}` has a different type")]
    PropertyType {
        type_name: &'static str,
        property: String,
    },
    /// The entity could not be turned into its serialization view.
    #[error("serialization error")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },
}

impl RepoError {
    /// Wrap a backend/driver error as a storage failure.
    pub fn backend<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Storage(StorageError::other(e))
    }

    /// Wrap a row-mapping error.
    pub fn mapping<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Mapping {
            source: Box::new(e),
        }
    }

    /// The storage error behind this failure, if it came from the adapter.
    pub fn storage(&self) -> Option<&StorageError> {
        match self {
            RepoError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

/// Convenience alias for results returned by mapper operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// A row column could not be stored in the same-named field.
#[derive(Debug, thiserror::Error)]
#[error("column `{column}` of `{type_name}`: {source}")]
pub struct ColumnError {
    pub type_name: &'static str,
    pub column: &'static str,
    #[source]
    pub source: crate::value::ValueError,
}

/// A row carried a column the entity has no physical field for.
#[derive(Debug, thiserror::Error)]
#[error("`{type_name}` has no physical field for column `{column}`")]
pub struct UnknownColumn {
    pub type_name: &'static str,
    pub column: String,
}
