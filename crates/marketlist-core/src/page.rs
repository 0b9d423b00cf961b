//! The narrow browser surface the core drives.
//!
//! Adapters (CDP in the CLI, fakes in tests) implement [`Page`]; nothing in
//! the core knows which automation backend is underneath.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Attached,
    Detached,
    Visible,
    Hidden,
}

impl WaitState {
    pub fn as_str(self) -> &'static str {
        match self {
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
        }
    }
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page-level failures. `NotFound` and `Timeout` are distinct signals:
/// a clean miss lets optional steps short-circuit, a timeout does not.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("no element matches '{0}'")]
    NotFound(String),

    #[error("timed out after {waited_ms}ms waiting for '{selector}' to be {state}")]
    Timeout {
        selector: String,
        state: WaitState,
        waited_ms: u64,
    },

    #[error("browser driver error: {0}")]
    Driver(String),
}

impl PageError {
    pub fn timeout(selector: &str, state: WaitState, waited: Duration) -> Self {
        PageError::Timeout {
            selector: selector.to_string(),
            state,
            waited_ms: waited.as_millis() as u64,
        }
    }
}

pub type PageResult<T> = std::result::Result<T, PageError>;

/// Synchronous browser page. Every wait carries an explicit timeout.
pub trait Page {
    fn navigate(&mut self, url: &str, timeout: Duration) -> PageResult<()>;

    fn wait_for(&mut self, selector: &str, state: WaitState, timeout: Duration) -> PageResult<()>;

    fn click(&mut self, selector: &str) -> PageResult<()>;

    /// Replace the element's value with `text`.
    fn type_text(&mut self, selector: &str, text: &str) -> PageResult<()>;

    fn exists(&mut self, selector: &str) -> PageResult<bool>;

    /// Populate a file input with local files.
    fn set_files(&mut self, selector: &str, files: &[PathBuf]) -> PageResult<()>;

    /// Fixed pause used between UI steps.
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn current_url(&mut self) -> Option<String> {
        None
    }
}
