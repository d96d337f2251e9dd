//! Error conversion helpers for reading category input
//!
//! Extension traits that attach the input location to low-level errors.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// self.fs.read_to_string(path)
    ///     .with_path_context("read categories", path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}

/// Extension trait for turning JSON decoding failures into parse errors.
pub trait JsonResultExt<T> {
    /// Name where the JSON came from (file path or `<stdin>`).
    fn with_origin(self, origin: &str) -> ApplicationResult<T>;
}

impl<T> JsonResultExt<T> for serde_json::Result<T> {
    fn with_origin(self, origin: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })
    }
}
