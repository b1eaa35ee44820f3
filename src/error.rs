//! Error types for bucket administration.

/// Failure of a listing, selection or transfer operation.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// No bucket is selected.
    #[error("bucket name is required")]
    NoBucket,

    /// The operation needs at least one selected key.
    #[error("no objects selected")]
    NoKeys,

    /// The upload queue is empty.
    #[error("no files to upload")]
    NoFiles,

    /// A relative upload path is absolute or climbs out of the prefix.
    #[error("invalid relative path: {0}")]
    InvalidPath(String),

    /// A relative upload path nests more folders than allowed.
    #[error("path {path} is {depth} levels deep (max {max})")]
    PathTooDeep {
        path: String,
        depth: usize,
        max: usize,
    },

    /// Another operation of the same class is still running.
    #[error("{0} already in progress")]
    Busy(&'static str),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The object store rejected or failed a request.
    #[error("{operation} failed: {message}")]
    Store {
        operation: &'static str,
        message: String,
    },

    /// An upload queue stopped at its first failure.
    #[error("upload of {key} failed after {uploaded} of {total} files: {message}")]
    UploadAborted {
        uploaded: usize,
        total: usize,
        key: String,
        message: String,
    },

    /// Local filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Settings file could not be encoded or decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AdminError {
    pub fn store(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Store {
            operation,
            message: err.to_string(),
        }
    }

    /// Errors raised before any request reached the store.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoBucket
                | Self::NoKeys
                | Self::NoFiles
                | Self::InvalidPath(_)
                | Self::PathTooDeep { .. }
                | Self::Config(_)
        )
    }
}

/// Convenience result type for bucket administration.
pub type AdminResult<T> = Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_classify_configuration_errors() {
        assert!(AdminError::NoBucket.is_configuration());
        assert!(AdminError::PathTooDeep {
            path: "a/b/c/d".into(),
            depth: 4,
            max: 3
        }
        .is_configuration());
        assert!(!AdminError::store("list objects", "timeout").is_configuration());
        assert!(!AdminError::Busy("delete").is_configuration());
    }

    #[test]
    fn test_should_render_store_error_with_operation() {
        let err = AdminError::store("delete objects", "AccessDenied");
        assert_eq!(err.to_string(), "delete objects failed: AccessDenied");
    }
}
