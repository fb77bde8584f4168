//! Error conversion helpers for scenario loading
//!
//! Attach the offending path to I/O and parse failures.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Add path context to an I/O error.
pub trait IoResultExt<T> {
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

/// Turn a TOML parse failure into a scenario error naming the file.
pub trait ParseResultExt<T> {
    fn with_scenario_path(self, path: &Path) -> ApplicationResult<T>;
}

impl<T> ParseResultExt<T> for Result<T, toml::de::Error> {
    fn with_scenario_path(self, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Scenario {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })
    }
}
