//! Error types shared by the TS and MXF parsers.

use thiserror::Error;

/// Failure to turn a run of bytes into a typed object.
///
/// `Truncated` and `Invalid` discard the object being built; the stream
/// itself keeps going. `UnknownTag` is only ever logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("truncated: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("invalid: {0}")]
    Invalid(String),

    #[error("local tag 0x{0:04x} has no primer entry")]
    UnknownTag(u16),
}

impl ParseError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ParseError::Invalid(msg.into())
    }

    /// Fails with `Truncated` unless `data` holds at least `needed` bytes.
    pub(crate) fn check_len(data: &[u8], needed: usize) -> Result<()> {
        if data.len() < needed {
            return Err(ParseError::Truncated { needed, available: data.len() });
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Result of handing a packet to a downstream sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Nobody is consuming this output right now.
    #[error("output not linked")]
    NotLinked,

    /// The sink is shutting down; nothing more will be accepted.
    #[error("output flushing")]
    Flushing,

    #[error("fatal downstream error: {0}")]
    Fatal(String),
}

impl FlowError {
    /// Fatal errors stop forwarding of the current packet to the remaining pads.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FlowError::NotLinked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_len_reports_sizes() {
        assert_eq!(
            ParseError::check_len(&[0u8; 3], 8),
            Err(ParseError::Truncated { needed: 8, available: 3 })
        );
        assert!(ParseError::check_len(&[0u8; 8], 8).is_ok());
    }

    #[test]
    fn only_not_linked_is_recoverable() {
        assert!(!FlowError::NotLinked.is_fatal());
        assert!(FlowError::Flushing.is_fatal());
        assert!(FlowError::Fatal("gone".into()).is_fatal());
    }
}
