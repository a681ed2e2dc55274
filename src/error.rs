//! Error types for capture operations
//!
//! The taxonomy follows three tiers:
//!
//! - **Unsupported** is not an error at all: a capture strategy declined
//!   and the caller should try the other one. It is carried by
//!   [`CaptureAttempt::Unsupported`], not by `CaptureError`.
//! - **Retryable** is a transient native graphics failure. It exists only
//!   as the `transient` classification on [`CaptureError::NativeCall`] and
//!   is consumed inside the retry policy; it never reaches callers.
//! - **Fatal** is everything else: retries exhausted, a non-transient
//!   native failure, or cancellation. Fatal errors carry the failing
//!   native call's name and the requested capture dimensions as structured
//!   diagnostic context.

/// Result type alias for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error type for capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// A native graphics call failed.
    ///
    /// `transient` marks the recognized transient graphics-subsystem
    /// failure class that the retry policy is allowed to retry.
    #[error("native call '{call}' failed for requested {width}x{height} capture")]
    NativeCall {
        /// Name of the failing native call.
        call:      &'static str,
        /// Requested capture width.
        width:     i32,
        /// Requested capture height.
        height:    i32,
        /// Whether this failure belongs to the transient class.
        transient: bool,
    },

    /// The retry budget was exhausted without a successful attempt.
    #[error("retry budget exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Total attempts made.
        attempts: u32,
        /// The last failure observed.
        #[source]
        source:   Box<CaptureError>,
    },

    /// The desktop compositor is not available (composition disabled or
    /// unsupported OS), so composited capture cannot run.
    #[error("desktop composition is unavailable")]
    CompositionUnavailable,

    /// The requested capture bounds cover no pixels.
    ///
    /// Capturers decline such requests as unsupported; this surfaces only
    /// from the engine's public API, where no fallback remains.
    #[error("capture bounds cover no pixels")]
    EmptyBounds,

    /// The capture was cancelled between protocol steps.
    #[error("capture cancelled")]
    Cancelled,

    /// The capture worker thread failed (panicked or was lost).
    #[error("capture worker failed: {0}")]
    Worker(String),
}

impl CaptureError {
    /// Shorthand for a transient [`CaptureError::NativeCall`].
    pub fn transient(call: &'static str, width: i32, height: i32) -> Self {
        CaptureError::NativeCall {
            call,
            width,
            height,
            transient: true,
        }
    }

    /// Shorthand for a non-transient [`CaptureError::NativeCall`].
    pub fn fatal(call: &'static str, width: i32, height: i32) -> Self {
        CaptureError::NativeCall {
            call,
            width,
            height,
            transient: false,
        }
    }

    /// Whether the retry policy may retry this failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CaptureError::NativeCall {
                transient: true,
                ..
            }
        )
    }

    /// The failing native call's name, if this error carries one.
    ///
    /// For exhausted retries this is the last attempt's failing call.
    pub fn failing_call(&self) -> Option<&'static str> {
        match self {
            CaptureError::NativeCall { call, .. } => Some(call),
            CaptureError::RetriesExhausted { source, .. } => source.failing_call(),
            _ => None,
        }
    }

    /// The requested capture dimensions, if this error carries them.
    pub fn requested_size(&self) -> Option<(i32, i32)> {
        match self {
            CaptureError::NativeCall { width, height, .. } => Some((*width, *height)),
            CaptureError::RetriesExhausted { source, .. } => source.requested_size(),
            _ => None,
        }
    }
}

/// Outcome of one capture strategy.
///
/// `Unsupported` signals "this strategy declined, try the other one" and is
/// deliberately not an error. Transient failures never appear here; the
/// retry policy consumes them and surfaces the last one as a fatal error
/// on exhaustion.
#[derive(Debug)]
pub enum CaptureAttempt<T> {
    /// The strategy produced a capture.
    Success(T),
    /// The strategy declined; the caller should fall back.
    Unsupported,
    /// The strategy failed and no fallback within it is possible.
    Fatal(CaptureError),
}

impl<T> CaptureAttempt<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, CaptureAttempt::Success(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, CaptureAttempt::Unsupported)
    }

    /// Returns the capture, discarding failure detail.
    pub fn ok(self) -> Option<T> {
        match self {
            CaptureAttempt::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Maps the success value, preserving the other arms.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CaptureAttempt<U> {
        match self {
            CaptureAttempt::Success(v) => CaptureAttempt::Success(f(v)),
            CaptureAttempt::Unsupported => CaptureAttempt::Unsupported,
            CaptureAttempt::Fatal(e) => CaptureAttempt::Fatal(e),
        }
    }
}

impl<T> From<CaptureResult<T>> for CaptureAttempt<T> {
    fn from(result: CaptureResult<T>) -> Self {
        match result {
            Ok(v) => CaptureAttempt::Success(v),
            Err(e) => CaptureAttempt::Fatal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CaptureError::transient("BitBlt", 100, 50).is_transient());
        assert!(!CaptureError::fatal("GetDC", 100, 50).is_transient());
        assert!(!CaptureError::Cancelled.is_transient());
        assert!(!CaptureError::CompositionUnavailable.is_transient());
    }

    #[test]
    fn test_native_call_diagnostics() {
        let err = CaptureError::fatal("CreateDIBSection", 640, 480);
        assert_eq!(err.failing_call(), Some("CreateDIBSection"));
        assert_eq!(err.requested_size(), Some((640, 480)));

        let msg = err.to_string();
        assert!(msg.contains("CreateDIBSection"));
        assert!(msg.contains("640x480"));
    }

    #[test]
    fn test_exhausted_retries_forward_diagnostics() {
        let err = CaptureError::RetriesExhausted {
            attempts: 3,
            source:   Box::new(CaptureError::transient("BitBlt", 10, 20)),
        };
        assert!(!err.is_transient());
        assert_eq!(err.failing_call(), Some("BitBlt"));
        assert_eq!(err.requested_size(), Some((10, 20)));
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_attempt_from_result() {
        let ok: CaptureAttempt<u32> = Ok(7).into();
        assert_eq!(ok.ok(), Some(7));

        let err: CaptureAttempt<u32> = Err(CaptureError::Cancelled).into();
        assert!(matches!(err, CaptureAttempt::Fatal(CaptureError::Cancelled)));
    }

    #[test]
    fn test_attempt_map() {
        let attempt = CaptureAttempt::Success(2).map(|v| v * 3);
        assert_eq!(attempt.ok(), Some(6));

        let unsupported: CaptureAttempt<u32> = CaptureAttempt::Unsupported;
        assert!(unsupported.map(|v| v).is_unsupported());
    }
}
