//! Error types for the reconciliation core
//!
//! Three failure classes cross the controller boundary: a requested
//! address family the controller was not configured for, a link index
//! that cannot be resolved, and kernel operations that fail at the
//! netlink layer. The controller never retries; callers decide.

use thiserror::Error;

use crate::types::IpFamily;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation controller
#[derive(Error, Debug)]
pub enum Error {
    /// The address's family is not among the families this controller
    /// manages. Non-retryable without a configuration change.
    #[error("address family {family} is not enabled on this controller")]
    FamilyDisabled {
        /// Family of the rejected address
        family: IpFamily,
    },

    /// The target link index could not be resolved. May be transient
    /// (interface not yet created); retry is the caller's call.
    #[error("failed to resolve link with index {index}: {message}")]
    LinkResolution {
        /// Kernel index of the link that failed to resolve
        index: u32,
        /// Underlying failure detail
        message: String,
    },

    /// A kernel operation (list/add/remove) failed. Carries enough
    /// context to distinguish the failing step.
    #[error("netlink {operation} on link {link} failed: {message}")]
    Kernel {
        /// Which netlink operation failed
        operation: String,
        /// Name or index of the affected link
        link: String,
        /// Underlying failure detail
        message: String,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid input (e.g. malformed CIDR)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a family-disabled error
    pub fn family_disabled(family: IpFamily) -> Self {
        Self::FamilyDisabled { family }
    }

    /// Create a link-resolution error
    pub fn link_resolution(index: u32, message: impl Into<String>) -> Self {
        Self::LinkResolution {
            index,
            message: message.into(),
        }
    }

    /// Create a kernel-operation error
    pub fn kernel(
        operation: impl Into<String>,
        link: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Kernel {
            operation: operation.into(),
            link: link.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
