//! Core resource pool implementation

use crate::config::{Destroyer, Factory, PoolConfiguration, Validator};
use crate::errors::{BoxError, PoolError, PoolResult};
use crate::eviction::{EvictionPolicy, IdleEntry};
use crate::metrics::{MetricsTracker, PoolMetrics};

#[cfg(feature = "metrics")]
use crate::metrics::MetricsExporter;

use crossbeam::queue::ArrayQueue;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Functions and idle store shared while the pool is open
struct OpenHandles<T, E> {
    idle: Arc<ArrayQueue<IdleEntry<T>>>,
    factory: Factory<T, E>,
    destroy: Destroyer<T, E>,
    validate: Option<Validator<T, E>>,
}

impl<T, E> Clone for OpenHandles<T, E> {
    fn clone(&self) -> Self {
        Self {
            idle: Arc::clone(&self.idle),
            factory: Arc::clone(&self.factory),
            destroy: Arc::clone(&self.destroy),
            validate: self.validate.clone(),
        }
    }
}

/// Open until `release`, then closed for good
enum PoolState<T, E> {
    Open(OpenHandles<T, E>),
    Closed,
}

struct PoolInner<T, E: fmt::Display> {
    state: Mutex<PoolState<T, E>>,
    // Kept past release so late `put` calls still destroy their resource.
    destroy: Destroyer<T, E>,
    eviction: EvictionPolicy,
    max_cap: usize,
    metrics: MetricsTracker,
}

impl<T, E: fmt::Display> PoolInner<T, E> {
    fn handles(&self) -> Option<OpenHandles<T, E>> {
        match &*self.state.lock() {
            PoolState::Open(handles) => Some(handles.clone()),
            PoolState::Closed => None,
        }
    }

    fn destroy_resource(&self, destroy: &Destroyer<T, E>, resource: T) -> PoolResult<(), E> {
        MetricsTracker::increment(&self.metrics.total_destroyed);
        destroy(resource).map_err(PoolError::Destroy)
    }

    /// Discard an idle resource during acquisition; failures are not fatal
    fn discard(&self, handles: &OpenHandles<T, E>, resource: T) {
        if let Err(err) = self.destroy_resource(&handles.destroy, resource) {
            warn!(error = %err, "failed to destroy discarded idle resource");
        }
    }

    /// Swap to the closed state and destroy whatever is still idle
    fn release(&self) {
        let handles = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, PoolState::Closed) {
                PoolState::Open(handles) => handles,
                PoolState::Closed => return,
            }
        };

        let mut drained = 0usize;
        while let Some(entry) = handles.idle.pop() {
            drained += 1;
            if let Err(err) = self.destroy_resource(&handles.destroy, entry.into_resource()) {
                debug!(error = %err, "ignoring destroy failure during release");
            }
        }
        info!(drained, "resource pool released");
    }
}

impl<T, E: fmt::Display> Drop for PoolInner<T, E> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Bounded, thread-safe pool of reusable resources
///
/// Resources are created by the configured factory when the idle store is
/// empty, and buffered for reuse by [`put`](ResourcePool::put) up to
/// `max_cap`. The idle store is a lock-free FIFO queue. Idle entries older
/// than the idle timeout, or rejected by the validator, are destroyed when
/// they are dequeued.
///
/// The handle is cheap to clone; all clones share the same pool. The pool is
/// released when the last handle is dropped.
///
/// The destroy function runs under the pool's state lock in
/// [`close`](ResourcePool::close) and must not call back into the pool.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{BoxError, PoolConfiguration, ResourcePool};
///
/// let config = PoolConfiguration::<String, BoxError>::new()
///     .with_min_idle(2)
///     .with_max_cap(4)
///     .with_factory(|| Ok(String::from("conn")))
///     .with_destroy(|_| Ok(()));
///
/// let pool = ResourcePool::new(config).unwrap();
/// assert_eq!(pool.len(), 2);
///
/// let conn = pool.get().unwrap();
/// assert_eq!(pool.len(), 1);
/// pool.put(conn).unwrap();
/// assert_eq!(pool.len(), 2);
///
/// pool.release();
/// assert!(pool.get().unwrap_err().is_closed());
/// ```
pub struct ResourcePool<T, E: fmt::Display = BoxError> {
    inner: Arc<PoolInner<T, E>>,
}

impl<T, E: fmt::Display> Clone for ResourcePool<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E: fmt::Display> fmt::Debug for ResourcePool<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("idle", &self.len())
            .field("max_cap", &self.inner.max_cap)
            .field("eviction", &self.inner.eviction)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T, E: fmt::Display> ResourcePool<T, E> {
    /// Create a new pool, eagerly filling it with `min_idle` resources
    ///
    /// Construction is all-or-nothing: if the factory fails, every resource
    /// created so far is destroyed and the factory error is returned.
    pub fn new(config: PoolConfiguration<T, E>) -> PoolResult<Self, E> {
        let parts = config.into_parts()?;
        let metrics = MetricsTracker::new();
        let idle = Arc::new(ArrayQueue::new(parts.max_cap));

        for _ in 0..parts.min_idle {
            match (parts.factory)() {
                Ok(resource) => {
                    MetricsTracker::increment(&metrics.total_created);
                    // min_idle <= max_cap, so the store has room for every entry.
                    let _ = idle.push(IdleEntry::new(resource));
                }
                Err(err) => {
                    while let Some(entry) = idle.pop() {
                        if let Err(destroy_err) = (parts.destroy)(entry.into_resource()) {
                            debug!(error = %destroy_err, "ignoring destroy failure during warm-up rollback");
                        }
                    }
                    warn!(error = %err, "factory is not able to fill the pool");
                    return Err(PoolError::Warmup(err));
                }
            }
        }

        let eviction = EvictionPolicy::from_idle_timeout(parts.idle_timeout);
        debug!(
            min_idle = parts.min_idle,
            max_cap = parts.max_cap,
            ?eviction,
            validate = parts.validate.is_some(),
            "resource pool created"
        );

        let handles = OpenHandles {
            idle,
            factory: parts.factory,
            destroy: Arc::clone(&parts.destroy),
            validate: parts.validate,
        };

        Ok(Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState::Open(handles)),
                destroy: parts.destroy,
                eviction,
                max_cap: parts.max_cap,
                metrics,
            }),
        })
    }

    /// Get a resource, reusing an idle one or creating a new one
    ///
    /// Never waits for a resource to be returned: when the idle store is
    /// empty the factory is called once. `max_cap` does not limit how many
    /// resources may be borrowed at the same time.
    pub fn get(&self) -> PoolResult<T, E> {
        let metrics = &self.inner.metrics;

        loop {
            // Re-read each round so a concurrent release is observed.
            let handles = self.inner.handles().ok_or(PoolError::Closed)?;

            let Some(entry) = handles.idle.pop() else {
                MetricsTracker::increment(&metrics.pool_empty_events);
                let resource = (handles.factory)().map_err(PoolError::Create)?;
                MetricsTracker::increment(&metrics.total_created);
                MetricsTracker::increment(&metrics.total_retrieved);
                return Ok(resource);
            };

            if self.inner.eviction.is_expired(&entry) {
                debug!("discarding resource past its idle timeout");
                MetricsTracker::increment(&metrics.idle_evictions);
                self.inner.discard(&handles, entry.into_resource());
                continue;
            }

            if let Some(validate) = &handles.validate {
                if let Err(err) = validate(entry.resource()) {
                    warn!(error = %err, "idle resource failed validation, discarding");
                    MetricsTracker::increment(&metrics.validation_failures);
                    self.inner.discard(&handles, entry.into_resource());
                    continue;
                }
            }

            MetricsTracker::increment(&metrics.total_retrieved);
            return Ok(entry.into_resource());
        }
    }

    /// Get a resource wrapped in a guard that returns it on drop
    pub fn get_pooled(&self) -> PoolResult<PooledResource<T, E>, E> {
        let resource = self.get()?;
        Ok(PooledResource::new(resource, self.clone()))
    }

    /// Return a resource to the idle store
    ///
    /// The resource is destroyed instead when the store is full or the pool
    /// has been released; the destroy result is returned.
    pub fn put(&self, resource: T) -> PoolResult<(), E> {
        let state = self.inner.state.lock();
        let overflow = match &*state {
            PoolState::Open(handles) => match handles.idle.push(IdleEntry::new(resource)) {
                Ok(()) => {
                    MetricsTracker::increment(&self.inner.metrics.total_returned);
                    return Ok(());
                }
                Err(entry) => entry.into_resource(),
            },
            PoolState::Closed => resource,
        };
        drop(state);

        debug!("idle store full or released, destroying returned resource");
        self.inner.destroy_resource(&self.inner.destroy, overflow)
    }

    /// Destroy a single resource
    ///
    /// A no-op once the pool has been released.
    pub fn close(&self, resource: T) -> PoolResult<(), E> {
        let state = self.inner.state.lock();
        match &*state {
            PoolState::Open(handles) => self.inner.destroy_resource(&handles.destroy, resource),
            PoolState::Closed => Ok(()),
        }
    }

    /// Run the configured validator against a resource
    pub fn validate(&self, resource: &T) -> PoolResult<(), E> {
        let handles = self.inner.handles().ok_or(PoolError::Closed)?;
        let validate = handles
            .validate
            .ok_or(PoolError::InvalidArgument("no validate func configured"))?;
        validate(resource).map_err(PoolError::Validate)
    }

    /// Tear down the pool
    ///
    /// Every idle resource is destroyed; destroy failures are ignored. Later
    /// `get` calls fail with [`PoolError::Closed`] and later `put` calls
    /// destroy their argument. Calling this more than once is harmless.
    pub fn release(&self) {
        self.inner.release();
    }

    /// Number of idle resources, zero once released
    pub fn len(&self) -> usize {
        self.inner.handles().map_or(0, |handles| handles.idle.len())
    }

    /// Whether no resource is sitting idle
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `release` has been called
    pub fn is_closed(&self) -> bool {
        matches!(&*self.inner.state.lock(), PoolState::Closed)
    }

    /// Maximum number of idle resources
    pub fn max_cap(&self) -> usize {
        self.inner.max_cap
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.inner.metrics.get_metrics(self.len(), self.inner.max_cap)
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }
}

impl<T, E> ResourcePool<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    /// Get a resource on the blocking thread pool
    pub async fn get_async(&self) -> PoolResult<T, E> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.get())
            .await
            .map_err(|_| PoolError::Cancelled)?
    }

    /// Get a resource, giving up after `timeout`
    ///
    /// A factory call already in progress is not interrupted; if it later
    /// succeeds the resource is put back into the pool.
    pub async fn get_timeout(&self, timeout: Duration) -> PoolResult<T, E> {
        let (tx, rx) = oneshot::channel();
        let pool = self.clone();
        // The hand-back lives on the blocking thread so it still runs when the
        // caller's runtime shuts down.
        tokio::task::spawn_blocking(move || {
            if let Err(Ok(resource)) = tx.send(pool.get()) {
                if let Err(err) = pool.put(resource) {
                    warn!(error = %err, "failed to return late resource to pool");
                }
            }
        });

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(acquired)) => acquired,
            Ok(Err(_)) => Err(PoolError::Cancelled),
            Err(_) => Err(PoolError::Timeout(timeout)),
        }
    }
}

/// A borrowed resource that goes back to the pool when dropped
pub struct PooledResource<T, E: fmt::Display = BoxError> {
    value: Option<T>,
    pool: ResourcePool<T, E>,
}

impl<T, E: fmt::Display> PooledResource<T, E> {
    fn new(value: T, pool: ResourcePool<T, E>) -> Self {
        Self {
            value: Some(value),
            pool,
        }
    }

    /// Take the resource out without returning it to the pool
    pub fn detach(mut self) -> T {
        self.value.take().expect("Value already taken")
    }
}

impl<T, E: fmt::Display> Deref for PooledResource<T, E> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("Value already taken")
    }
}

impl<T, E: fmt::Display> DerefMut for PooledResource<T, E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("Value already taken")
    }
}

impl<T, E: fmt::Display> Drop for PooledResource<T, E> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            if let Err(err) = self.pool.put(value) {
                warn!(error = %err, "failed to return pooled resource");
            }
        }
    }
}
