//! Error hierarchy for stet.

use thiserror::Error;

/// Top-level error type for all stet operations.
#[derive(Debug, Error)]
pub enum StetError {
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Display error: {0}")]
    Display(#[from] DisplayError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the gap buffer.
///
/// These are the expected, recoverable conditions: callers handle them and
/// carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("invalid whence: {whence}")]
    InvalidArgument { whence: i32 },

    #[error("negative seek position: {position}")]
    InvalidPosition { position: i64 },

    #[error("end of stream after {read} bytes")]
    EndOfStream { read: usize },
}

/// Errors from the viewport engine.
///
/// `Desync` and `TerminalTooSmall` are invariant violations. Once either is
/// returned the rendered screen can no longer be trusted and the session
/// should end.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("cursor out of sync: {message}")]
    Desync { message: String },

    #[error("terminal too small for the viewport ({cols}x{rows})")]
    TerminalTooSmall { cols: u16, rows: u16 },

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DisplayError {
    /// Whether this error means the buffer and the screen have diverged.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Desync { .. } | Self::TerminalTooSmall { .. })
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desync_is_fatal() {
        let err = DisplayError::Desync {
            message: "expected 1;1 but was 2;1".into(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("expected 1;1"));
    }

    #[test]
    fn io_errors_pass_through_unwrapped() {
        let err = DisplayError::from(std::io::Error::other("tty gone"));
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "tty gone");
    }

    #[test]
    fn buffer_error_converts_to_top_level() {
        let err: StetError = BufferError::EndOfStream { read: 3 }.into();
        assert_eq!(err.to_string(), "Buffer error: end of stream after 3 bytes");
    }
}
