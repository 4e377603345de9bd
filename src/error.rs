//! Error handling for the meshview core
//!
//! Every fallible operation returns `ViewerResult`. Cancellation is never an
//! error: passes report it through their status enums instead.

/// Main error type for the rendering and ambient-occlusion core
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    // Input errors
    #[error("No meshes to render")]
    NoMeshes,

    #[error("Invalid camera: {reason}")]
    InvalidCamera { reason: String },

    // Configuration errors
    #[error("Invalid config: {field} = {value} ({reason})")]
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load config from {path}: {error}")]
    ConfigLoad { path: String, error: String },

    #[error("Failed to save config to {path}: {error}")]
    ConfigSave { path: String, error: String },

    // Output errors
    #[error("Failed to save image to {path}: {error}")]
    ImageSave { path: String, error: String },

    // Threading errors
    #[error("Task '{task}' failed: {error}")]
    TaskFailed { task: String, error: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results in the meshview core
pub type ViewerResult<T> = Result<T, ViewerError>;

impl ViewerError {
    pub fn invalid_config(field: &str, value: impl ToString, reason: &str) -> Self {
        ViewerError::InvalidConfig {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_camera(reason: impl Into<String>) -> Self {
        ViewerError::InvalidCamera {
            reason: reason.into(),
        }
    }
}

/// Extension trait for adding context to foreign errors
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> ViewerResult<T>;
    fn with_context<F>(self, f: F) -> ViewerResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, msg: &str) -> ViewerResult<T> {
        self.map_err(|e| ViewerError::Internal {
            message: format!("{}: {}", msg, e),
        })
    }

    fn with_context<F>(self, f: F) -> ViewerResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ViewerError::Internal {
            message: format!("{}: {}", f(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ViewerError::invalid_config("exposure", -1.0, "must be non-negative");
        assert_eq!(
            err.to_string(),
            "Invalid config: exposure = -1 (must be non-negative)"
        );
        assert_eq!(ViewerError::NoMeshes.to_string(), "No meshes to render");
    }

    #[test]
    fn test_error_context() {
        let result: Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        match result.context("loading texture") {
            Err(ViewerError::Internal { message }) => {
                assert!(message.starts_with("loading texture"));
                assert!(message.contains("file not found"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
