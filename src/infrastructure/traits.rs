//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with in-memory implementations.

use std::io::{self, Read};
use std::path::Path;

use crate::infrastructure::{InfraError, InfraResult};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Where category JSON is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource<'a> {
    Stdin,
    File(&'a Path),
}

impl<'a> InputSource<'a> {
    /// `-` selects stdin, anything else is a file path.
    pub fn from_arg(arg: &'a Path) -> Self {
        if arg.as_os_str() == "-" {
            InputSource::Stdin
        } else {
            InputSource::File(arg)
        }
    }

    /// Name used in messages.
    pub fn origin(&self) -> String {
        match self {
            InputSource::Stdin => "<stdin>".to_string(),
            InputSource::File(path) => path.display().to_string(),
        }
    }
}

/// Read all of stdin.
pub fn read_stdin() -> InfraResult<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| InfraError::io("read categories from stdin", e))?;
    Ok(buf)
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}
