//! Error types for the resource pool

use std::time::Duration;
use thiserror::Error;

/// Default error type for factory, destroy and validate functions
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Rejected pool configuration. No resource is created when this is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid capacity settings: min_idle={min_idle}, max_cap={max_cap}")]
    InvalidCapacity { min_idle: usize, max_cap: usize },

    #[error("invalid factory func settings")]
    MissingFactory,

    #[error("invalid destroy func settings")]
    MissingDestroy,
}

/// Errors surfaced by [`ResourcePool`](crate::ResourcePool) operations.
///
/// `E` is the error type produced by the user supplied factory, destroy and
/// validate functions. It is carried as-is and rendered in the message, so
/// `PoolError<BoxError>` is itself an error type.
#[derive(Error, Debug)]
pub enum PoolError<E> {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("factory is not able to fill the pool: {0}")]
    Warmup(E),

    #[error("pool is closed")]
    Closed,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("failed to create resource: {0}")]
    Create(E),

    #[error("failed to destroy resource: {0}")]
    Destroy(E),

    #[error("resource failed validation: {0}")]
    Validate(E),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("operation was cancelled")]
    Cancelled,
}

impl<E> PoolError<E> {
    /// Whether this error is the terminal "pool is closed" signal
    pub fn is_closed(&self) -> bool {
        matches!(self, PoolError::Closed)
    }

    /// Whether this error was raised while validating the configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, PoolError::Configuration(_))
    }

    /// The factory, destroy or validate error behind this failure, if any
    pub fn collaborator_error(&self) -> Option<&E> {
        match self {
            PoolError::Warmup(err)
            | PoolError::Create(err)
            | PoolError::Destroy(err)
            | PoolError::Validate(err) => Some(err),
            _ => None,
        }
    }

    /// Take the factory, destroy or validate error out of this failure
    pub fn into_collaborator_error(self) -> Option<E> {
        match self {
            PoolError::Warmup(err)
            | PoolError::Create(err)
            | PoolError::Destroy(err)
            | PoolError::Validate(err) => Some(err),
            _ => None,
        }
    }
}

pub type PoolResult<T, E = BoxError> = Result<T, PoolError<E>>;
