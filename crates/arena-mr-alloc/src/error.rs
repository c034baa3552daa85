//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use arena_mr_core::UpstreamError;

/// Errors that can occur while constructing an arena resource.
///
/// Failures during allocation and deallocation are reported as
/// [`ResourceError`](arena_mr_core::ResourceError) instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The configuration was rejected before any memory was acquired.
    InvalidConfig {
        /// Why the configuration is invalid.
        reason: String,
    },
    /// The upstream provider could not supply the initial arenas.
    Upstream(UpstreamError),
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
            Self::Upstream(e) => write!(f, "initial arena acquisition failed: {e}"),
        }
    }
}

impl Error for ArenaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Upstream(e) => Some(e),
            Self::InvalidConfig { .. } => None,
        }
    }
}

impl From<UpstreamError> for ArenaError {
    fn from(e: UpstreamError) -> Self {
        Self::Upstream(e)
    }
}
