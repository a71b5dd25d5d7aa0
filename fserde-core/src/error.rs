//! Error types for fserde

use thiserror::Error;

/// Result type alias for fserde operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fserde
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error (capture output, frame files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame string does not follow `Name := Layer(..)/Layer(..)`
    #[error("Malformed frame string: {0}")]
    MalformedFrameString(String),

    /// Layer name not in the known layer set
    #[error("Unknown layer '{0}'")]
    UnknownLayer(String),

    /// Option value could not be parsed, or key rejected by a strict layer
    #[error("Invalid option '{option}' for layer {layer}: {reason}")]
    InvalidOption {
        layer: String,
        option: String,
        reason: String,
    },

    /// Frame name already registered for this frame type
    #[error("Frame '{0}' already exists")]
    DuplicateFrameName(String),

    /// `Defaults(name)` references a frame that is not a registered template
    #[error("Defaults frame '{0}' is not registered")]
    UnresolvedDefaultsReference(String),

    /// A defaults template references another defaults template
    #[error("Defaults frame '{0}' must not contain a Defaults layer")]
    IllegalDefaultsInTemplate(String),

    /// Offset write past the end of a frame buffer
    #[error("Buffer write of {len} bytes at offset {offset} exceeds buffer size {size}")]
    BufferBoundsViolation {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Frame lookup failed
    #[error("Frame '{0}' not found")]
    FrameNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a malformed frame string error
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Error::MalformedFrameString(msg.into())
    }

    /// Create an invalid option error
    pub fn invalid_option<L, O, R>(layer: L, option: O, reason: R) -> Self
    where
        L: Into<String>,
        O: Into<String>,
        R: Into<String>,
    {
        Error::InvalidOption {
            layer: layer.into(),
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_message() {
        let err = Error::invalid_option("IPv4", "ttl", "value 300 out of range");
        assert_eq!(
            err.to_string(),
            "Invalid option 'ttl' for layer IPv4: value 300 out of range"
        );
    }

    #[test]
    fn test_bounds_message() {
        let err = Error::BufferBoundsViolation {
            offset: 40,
            len: 4,
            size: 42,
        };
        assert!(err.to_string().contains("offset 40"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
