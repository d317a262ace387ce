//! Pool configuration options

use crate::errors::{BoxError, ConfigError};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Creates a new resource
pub type Factory<T, E> = Arc<dyn Fn() -> Result<T, E> + Send + Sync>;

/// Releases the underlying handle of a resource
pub type Destroyer<T, E> = Arc<dyn Fn(T) -> Result<(), E> + Send + Sync>;

/// Returns an error when a resource is no longer usable
pub type Validator<T, E> = Arc<dyn Fn(&T) -> Result<(), E> + Send + Sync>;

/// Configuration for resource pool behavior
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{BoxError, PoolConfiguration};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::<u32, BoxError>::new()
///     .with_min_idle(2)
///     .with_max_cap(10)
///     .with_factory(|| Ok(7))
///     .with_destroy(|_| Ok(()))
///     .with_idle_timeout(Duration::from_secs(30));
///
/// assert!(config.check().is_ok());
/// assert_eq!(config.max_cap, 10);
/// ```
pub struct PoolConfiguration<T, E = BoxError> {
    /// Number of resources created eagerly when the pool is built
    pub min_idle: usize,

    /// Maximum number of idle resources buffered for reuse
    pub max_cap: usize,

    /// Creates a new resource (required)
    pub factory: Option<Factory<T, E>>,

    /// Destroys a resource (required)
    pub destroy: Option<Destroyer<T, E>>,

    /// Liveness check run before an idle resource is handed out
    pub validate: Option<Validator<T, E>>,

    /// Maximum time a resource may sit idle; zero disables eviction
    pub idle_timeout: Duration,
}

impl<T, E> Default for PoolConfiguration<T, E> {
    fn default() -> Self {
        Self {
            min_idle: 0,
            max_cap: 100,
            factory: None,
            destroy: None,
            validate: None,
            idle_timeout: Duration::ZERO,
        }
    }
}

impl<T, E> Clone for PoolConfiguration<T, E> {
    fn clone(&self) -> Self {
        Self {
            min_idle: self.min_idle,
            max_cap: self.max_cap,
            factory: self.factory.clone(),
            destroy: self.destroy.clone(),
            validate: self.validate.clone(),
            idle_timeout: self.idle_timeout,
        }
    }
}

impl<T, E> fmt::Debug for PoolConfiguration<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfiguration")
            .field("min_idle", &self.min_idle)
            .field("max_cap", &self.max_cap)
            .field("factory", &self.factory.is_some())
            .field("destroy", &self.destroy.is_some())
            .field("validate", &self.validate.is_some())
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

/// Checked configuration with the required functions unwrapped
pub(crate) struct ConfigParts<T, E> {
    pub min_idle: usize,
    pub max_cap: usize,
    pub factory: Factory<T, E>,
    pub destroy: Destroyer<T, E>,
    pub validate: Option<Validator<T, E>>,
    pub idle_timeout: Duration,
}

impl<T, E> PoolConfiguration<T, E> {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of resources created up front
    pub fn with_min_idle(mut self, count: usize) -> Self {
        self.min_idle = count;
        self
    }

    /// Set the maximum number of idle resources
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::<i32>::new()
    ///     .with_max_cap(50);
    ///
    /// assert_eq!(config.max_cap, 50);
    /// ```
    pub fn with_max_cap(mut self, cap: usize) -> Self {
        self.max_cap = cap;
        self
    }

    /// Set the function that creates resources
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Set the function that destroys resources
    pub fn with_destroy<F>(mut self, destroy: F) -> Self
    where
        F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
    {
        self.destroy = Some(Arc::new(destroy));
        self
    }

    /// Enable liveness checks on acquisition
    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&T) -> Result<(), E> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    /// Set idle timeout for resources
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Check capacity bounds and required functions
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::{ConfigError, PoolConfiguration};
    ///
    /// let config = PoolConfiguration::<i32>::new()
    ///     .with_min_idle(5)
    ///     .with_max_cap(2);
    ///
    /// assert_eq!(
    ///     config.check(),
    ///     Err(ConfigError::InvalidCapacity { min_idle: 5, max_cap: 2 })
    /// );
    /// ```
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.max_cap == 0 || self.min_idle > self.max_cap {
            return Err(ConfigError::InvalidCapacity {
                min_idle: self.min_idle,
                max_cap: self.max_cap,
            });
        }
        if self.factory.is_none() {
            return Err(ConfigError::MissingFactory);
        }
        if self.destroy.is_none() {
            return Err(ConfigError::MissingDestroy);
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> Result<ConfigParts<T, E>, ConfigError> {
        self.check()?;
        let factory = self.factory.ok_or(ConfigError::MissingFactory)?;
        let destroy = self.destroy.ok_or(ConfigError::MissingDestroy)?;

        Ok(ConfigParts {
            min_idle: self.min_idle,
            max_cap: self.max_cap,
            factory,
            destroy,
            validate: self.validate,
            idle_timeout: self.idle_timeout,
        })
    }
}
