//! # EsoxSolutions.ResourcePool
//!
//! Bounded, thread-safe pool of reusable resources such as network
//! connections or RPC handles.
//!
//! ## Features
//!
//! - Lock-free bounded idle store; returning into a full store destroys the
//!   resource instead of blocking
//! - Lazy creation through a user supplied factory
//! - Eager warm-up of `min_idle` resources, all-or-nothing
//! - Idle timeout eviction and optional liveness validation, applied when a
//!   resource is dequeued (no background sweeper)
//! - Automatic return of resources via RAII (Drop trait)
//! - Async acquisition with a caller-level timeout
//! - Metrics and Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_resourcepool::{BoxError, PoolConfiguration, ResourcePool};
//!
//! let config = PoolConfiguration::<Vec<u8>, BoxError>::new()
//!     .with_min_idle(1)
//!     .with_max_cap(8)
//!     .with_factory(|| Ok(Vec::with_capacity(1024)))
//!     .with_destroy(|_| Ok(()));
//!
//! let pool = ResourcePool::new(config).unwrap();
//! {
//!     let mut buffer = pool.get_pooled().unwrap();
//!     buffer.push(1);
//!     // Resource automatically returned when `buffer` goes out of scope
//! }
//! assert_eq!(pool.len(), 1);
//! ```

mod pool;
mod config;
mod metrics;
mod eviction;
mod errors;

pub use pool::{ResourcePool, PooledResource};
pub use config::{PoolConfiguration, Factory, Destroyer, Validator};
pub use metrics::PoolMetrics;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use eviction::EvictionPolicy;
pub use errors::{BoxError, ConfigError, PoolError, PoolResult};
