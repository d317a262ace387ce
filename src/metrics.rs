//! Metrics collection and export for resource pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{BoxError, PoolConfiguration, ResourcePool};
///
/// let config = PoolConfiguration::<u32, BoxError>::new()
///     .with_min_idle(1)
///     .with_factory(|| Ok(1))
///     .with_destroy(|_| Ok(()));
/// let pool = ResourcePool::new(config).unwrap();
///
/// let resource = pool.get().unwrap();
/// pool.put(resource).unwrap();
///
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.total_created, 1);
/// assert_eq!(metrics.total_retrieved, 1);
/// assert_eq!(metrics.total_returned, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Total resources handed out by `get`
    pub total_retrieved: usize,

    /// Total resources queued back by `put`
    pub total_returned: usize,

    /// Total resources produced by the factory
    pub total_created: usize,

    /// Total resources passed to the destroy function
    pub total_destroyed: usize,

    /// Number of times `get` found the idle store empty
    pub pool_empty_events: usize,

    /// Idle resources discarded for exceeding the idle timeout
    pub idle_evictions: usize,

    /// Idle resources discarded by the validator
    pub validation_failures: usize,

    /// Current idle resources
    pub idle_resources: usize,

    /// Pool utilization ratio (0.0 to 1.0)
    pub utilization: f64,

    /// Maximum idle capacity
    pub max_capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_retrieved".to_string(), self.total_retrieved.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("total_destroyed".to_string(), self.total_destroyed.to_string());
        metrics.insert("pool_empty_events".to_string(), self.pool_empty_events.to_string());
        metrics.insert("idle_evictions".to_string(), self.idle_evictions.to_string());
        metrics.insert("validation_failures".to_string(), self.validation_failures.to_string());
        metrics.insert("idle_resources".to_string(), self.idle_resources.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("max_capacity".to_string(), self.max_capacity.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// Every sample is labelled with `pool="<pool_name>"` plus the given tags.
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::{BoxError, PoolConfiguration, ResourcePool};
    /// use std::collections::HashMap;
    ///
    /// let config = PoolConfiguration::<u32, BoxError>::new()
    ///     .with_factory(|| Ok(1))
    ///     .with_destroy(|_| Ok(()));
    /// let pool = ResourcePool::new(config).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("my_pool", Some(&tags)).unwrap();
    /// assert!(output.contains("resourcepool_resources_idle"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};

        let mut labels = HashMap::new();
        labels.insert("pool".to_string(), pool_name.to_string());
        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.insert(key.clone(), value.clone());
            }
        }
        let registry = Registry::new_custom(None, Some(labels))?;

        // Gauge metrics
        let idle = IntGauge::new("resourcepool_resources_idle", "Current idle resources")?;
        idle.set(metrics.idle_resources as i64);
        registry.register(Box::new(idle))?;

        let capacity = IntGauge::new("resourcepool_capacity", "Maximum idle capacity")?;
        capacity.set(metrics.max_capacity as i64);
        registry.register(Box::new(capacity))?;

        let utilization = Gauge::new("resourcepool_utilization", "Idle store utilization ratio")?;
        utilization.set(metrics.utilization);
        registry.register(Box::new(utilization))?;

        // Counter metrics
        let counters = [
            ("resourcepool_resources_retrieved_total", "Total resources retrieved", metrics.total_retrieved),
            ("resourcepool_resources_returned_total", "Total resources returned", metrics.total_returned),
            ("resourcepool_resources_created_total", "Total resources created", metrics.total_created),
            ("resourcepool_resources_destroyed_total", "Total resources destroyed", metrics.total_destroyed),
            ("resourcepool_events_empty_total", "Pool empty events", metrics.pool_empty_events),
            ("resourcepool_idle_evictions_total", "Idle timeout evictions", metrics.idle_evictions),
            ("resourcepool_validation_failures_total", "Validation failures", metrics.validation_failures),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::new(name, help)?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter))?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub total_retrieved: AtomicUsize,
    pub total_returned: AtomicUsize,
    pub total_created: AtomicUsize,
    pub total_destroyed: AtomicUsize,
    pub pool_empty_events: AtomicUsize,
    pub idle_evictions: AtomicUsize,
    pub validation_failures: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, idle: usize, capacity: usize) -> PoolMetrics {
        let utilization = if capacity > 0 {
            idle as f64 / capacity as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_retrieved: self.total_retrieved.load(Ordering::Relaxed),
            total_returned: self.total_returned.load(Ordering::Relaxed),
            total_created: self.total_created.load(Ordering::Relaxed),
            total_destroyed: self.total_destroyed.load(Ordering::Relaxed),
            pool_empty_events: self.pool_empty_events.load(Ordering::Relaxed),
            idle_evictions: self.idle_evictions.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            idle_resources: idle,
            utilization,
            max_capacity: capacity,
        }
    }
}
