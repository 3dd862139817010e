use thiserror::Error;

/// Errors that can occur during virtual file system operations.
#[derive(Debug, Error)]
pub enum VfsError {
    /// The requested path was not found in the provider.
    #[error("not found: {0}")]
    NotFound(String),
    /// An IO error occurred while accessing a provider.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),
    /// The path is invalid (empty, contains `..`, or other normalization failure).
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// No provider is mounted at the given source name.
    #[error("no such source: {0}")]
    NoSuchSource(String),
}

impl From<std::io::Error> for VfsError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            VfsError::NotFound(err.to_string())
        } else {
            VfsError::Io(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = VfsError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing.spv",
        ));
        assert!(matches!(err, VfsError::NotFound(_)));
    }

    #[test]
    fn other_io_errors_keep_source() {
        let err = VfsError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "locked",
        ));
        assert!(matches!(err, VfsError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "IO error: locked");
    }
}
