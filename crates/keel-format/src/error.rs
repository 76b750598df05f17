//! Error types for snapshot encoding and decoding.

use std::error::Error;
use std::fmt;
use std::io;

use keel_core::ValidationError;

/// Errors that can occur while reading or writing a snapshot.
#[derive(Debug)]
pub enum FormatError {
    /// An I/O error from the underlying reader or writer.
    Io(io::Error),
    /// The stream ended before the header or payload was complete.
    Truncated {
        /// What was being read when the stream ran out.
        detail: String,
    },
    /// A header value is out of range for the format.
    Malformed {
        /// Description of the bad value.
        detail: String,
    },
    /// A container is too large to describe with the format's `i32` fields.
    TooLarge {
        /// Which header field overflowed.
        field: &'static str,
        /// The value that does not fit.
        value: u64,
    },
    /// The snapshot does not match the target container.
    Validation(ValidationError),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Truncated { detail } => write!(f, "truncated snapshot: {detail}"),
            Self::Malformed { detail } => write!(f, "malformed snapshot: {detail}"),
            Self::TooLarge { field, value } => {
                write!(f, "{field} {value} does not fit in the snapshot header")
            }
            Self::Validation(e) => write!(f, "snapshot rejected: {e}"),
        }
    }
}

impl Error for FormatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FormatError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated {
                detail: e.to_string(),
            }
        } else {
            Self::Io(e)
        }
    }
}

impl From<ValidationError> for FormatError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}
