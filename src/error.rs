//! Error types for keyboard capture and emulation.

use thiserror::Error;

/// Result type alias for xkeyctl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing or emulating keyboard input.
///
/// Resolution misses (a character or key name with no keycode) are not
/// errors: those are skipped silently. Everything here is fatal for the
/// operation that returned it.
#[derive(Debug, Error)]
pub enum Error {
    /// Capture is already running.
    #[error("capture is already running")]
    AlreadyRunning,

    /// The capture was cancelled and cannot be started again.
    #[error("capture has been cancelled")]
    Cancelled,

    /// Could not open a connection to the display server.
    #[error("display unavailable: {0}")]
    DisplayUnavailable(String),

    /// A required protocol extension is not present on the server.
    #[error("extension not available: {0}")]
    ExtensionMissing(&'static str),

    /// A request to the display server failed.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A keysym the engine depends on has no keycode in the current layout.
    #[error("keysym has no keycode: {0}")]
    KeysymUnmapped(String),

    /// Thread-related error.
    #[error("thread error: {0}")]
    ThreadError(String),
}
