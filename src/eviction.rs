//! Idle entries and the lazy eviction policy applied on acquisition

use std::time::{Duration, Instant};

/// Eviction policy for idle resources
///
/// Checked when an entry is dequeued; there is no background sweep.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::EvictionPolicy;
/// use std::time::Duration;
///
/// assert_eq!(EvictionPolicy::from_idle_timeout(Duration::ZERO), EvictionPolicy::None);
/// assert_eq!(
///     EvictionPolicy::from_idle_timeout(Duration::from_secs(5)),
///     EvictionPolicy::IdleTimeout(Duration::from_secs(5))
/// );
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// No eviction
    #[default]
    None,

    /// Idle timeout: resources expire after sitting idle this long
    IdleTimeout(Duration),
}

impl EvictionPolicy {
    /// Build a policy from an idle timeout where zero means disabled
    pub fn from_idle_timeout(timeout: Duration) -> Self {
        if timeout.is_zero() {
            EvictionPolicy::None
        } else {
            EvictionPolicy::IdleTimeout(timeout)
        }
    }

    pub(crate) fn is_expired<T>(&self, entry: &IdleEntry<T>) -> bool {
        self.is_expired_at(entry, Instant::now())
    }

    fn is_expired_at<T>(&self, entry: &IdleEntry<T>, now: Instant) -> bool {
        match self {
            EvictionPolicy::None => false,
            EvictionPolicy::IdleTimeout(timeout) => {
                now.saturating_duration_since(entry.returned_at) >= *timeout
            }
        }
    }
}

/// A resource sitting in the idle store, tagged with its return time
pub(crate) struct IdleEntry<T> {
    resource: T,
    returned_at: Instant,
}

impl<T> IdleEntry<T> {
    pub fn new(resource: T) -> Self {
        Self {
            resource,
            returned_at: Instant::now(),
        }
    }

    pub fn resource(&self) -> &T {
        &self.resource
    }

    pub fn into_resource(self) -> T {
        self.resource
    }
}
