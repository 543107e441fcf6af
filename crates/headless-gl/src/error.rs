//! Error types.
//!
//! Two channels exist. [`GlError`] values are protocol errors: they are
//! recorded on the context and read back through `get_error`, never
//! returned to the caller. [`ContextError`] values are programmer errors and
//! are returned as `Err` from the few calls that can fail that way.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::constants as gl;

/// Protocol errors recorded on a rendering context.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlError {
    #[error("Invalid enum")]
    InvalidEnum,

    #[error("Invalid value")]
    InvalidValue,

    #[error("Invalid operation")]
    InvalidOperation,

    #[error("Invalid framebuffer operation")]
    InvalidFramebufferOperation,

    #[error("Out of memory")]
    OutOfMemory,

    #[error("Context lost")]
    ContextLost,
}

impl GlError {
    /// The GL numeric code for this error.
    pub fn code(self) -> u32 {
        match self {
            GlError::InvalidEnum => gl::INVALID_ENUM,
            GlError::InvalidValue => gl::INVALID_VALUE,
            GlError::InvalidOperation => gl::INVALID_OPERATION,
            GlError::InvalidFramebufferOperation => gl::INVALID_FRAMEBUFFER_OPERATION,
            GlError::OutOfMemory => gl::OUT_OF_MEMORY,
            GlError::ContextLost => gl::CONTEXT_LOST_WEBGL,
        }
    }

    /// Map a raw code back to an error. `NO_ERROR` and unknown codes map to `None`.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            gl::INVALID_ENUM => Some(GlError::InvalidEnum),
            gl::INVALID_VALUE => Some(GlError::InvalidValue),
            gl::INVALID_OPERATION => Some(GlError::InvalidOperation),
            gl::INVALID_FRAMEBUFFER_OPERATION => Some(GlError::InvalidFramebufferOperation),
            gl::OUT_OF_MEMORY => Some(GlError::OutOfMemory),
            gl::CONTEXT_LOST_WEBGL => Some(GlError::ContextLost),
            _ => None,
        }
    }
}

/// Result of an internal validation step.
pub type GlResult<T> = Result<T, GlError>;

/// Programmer errors. These are not part of the numeric error model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Invalid surface dimensions: {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("Native context creation failed: {0}")]
    NativeContext(String),

    #[error("Drawing buffer allocation failed")]
    DrawingBuffer,

    #[error("Context attributes request {requested}, but a {created} context was constructed")]
    VersionMismatch {
        requested: &'static str,
        created: &'static str,
    },
}

/// Pending protocol errors plus the save/restore stack used by speculative
/// native calls.
///
/// Pending errors are a set: recording an error that is already pending is a
/// no-op, and the lowest code is reported first.
#[derive(Debug, Default)]
pub struct ErrorState {
    pending: BTreeSet<u32>,
    stack: Vec<u32>,
}

impl ErrorState {
    /// Create an empty error state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw error code. `NO_ERROR` is ignored.
    pub fn record(&mut self, code: u32) {
        if code != gl::NO_ERROR {
            self.pending.insert(code);
        }
    }

    /// Record a protocol error.
    pub fn set(&mut self, error: GlError) {
        self.record(error.code());
    }

    /// Remove and return the lowest pending error.
    pub fn take(&mut self) -> Option<u32> {
        self.pending.pop_first()
    }

    /// Whether any error is pending.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Push an already-read error onto the save stack.
    pub fn push_saved(&mut self, code: u32) {
        self.stack.push(code);
    }

    /// Pop the save stack and re-record whichever error should survive.
    ///
    /// A saved non-zero error wins over the error produced since the save.
    pub fn restore(&mut self, latest: u32) {
        let saved = self.stack.pop().unwrap_or(gl::NO_ERROR);
        if saved == gl::NO_ERROR {
            self.record(latest);
        } else {
            self.record(saved);
        }
    }

    /// Depth of the save stack.
    pub fn saved_depth(&self) -> usize {
        self.stack.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_roundtrip() {
        for error in [
            GlError::InvalidEnum,
            GlError::InvalidValue,
            GlError::InvalidOperation,
            GlError::InvalidFramebufferOperation,
            GlError::OutOfMemory,
        ] {
            assert_eq!(GlError::from_code(error.code()), Some(error));
        }
        assert_eq!(GlError::from_code(gl::NO_ERROR), None);
    }

    #[test]
    fn test_pending_errors_are_deduplicated_and_ordered() {
        let mut errors = ErrorState::new();
        errors.set(GlError::InvalidOperation);
        errors.set(GlError::InvalidEnum);
        errors.set(GlError::InvalidOperation);
        errors.record(gl::NO_ERROR);

        assert_eq!(errors.take(), Some(gl::INVALID_ENUM));
        assert_eq!(errors.take(), Some(gl::INVALID_OPERATION));
        assert_eq!(errors.take(), None);
    }

    #[test]
    fn test_restore_prefers_saved_error() {
        let mut errors = ErrorState::new();
        errors.push_saved(gl::INVALID_VALUE);
        errors.restore(gl::OUT_OF_MEMORY);
        assert_eq!(errors.take(), Some(gl::INVALID_VALUE));
        assert_eq!(errors.take(), None);
    }

    #[test]
    fn test_restore_keeps_latest_when_nothing_saved() {
        let mut errors = ErrorState::new();
        errors.push_saved(gl::NO_ERROR);
        errors.restore(gl::OUT_OF_MEMORY);
        assert_eq!(errors.take(), Some(gl::OUT_OF_MEMORY));
        assert_eq!(errors.saved_depth(), 0);
    }

    #[test]
    fn test_context_error_display() {
        let err = ContextError::InvalidDimensions {
            width: 0,
            height: 4,
        };
        assert_eq!(err.to_string(), "Invalid surface dimensions: 0x4");
    }
}
