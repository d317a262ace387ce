use esox_resourcepool::{ConfigError, PoolConfiguration, PoolError, ResourcePool};

use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Records what the pool did with the resources it was handed
#[derive(Default)]
struct Ledger {
    created: AtomicUsize,
    destroyed: Mutex<Vec<usize>>,
}

impl Ledger {
    fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn destroyed(&self) -> Vec<usize> {
        self.destroyed.lock().clone()
    }
}

fn config(ledger: &Arc<Ledger>) -> PoolConfiguration<usize, io::Error> {
    let factory_ledger = Arc::clone(ledger);
    let destroy_ledger = Arc::clone(ledger);
    PoolConfiguration::new()
        .with_factory(move || Ok(factory_ledger.created.fetch_add(1, Ordering::SeqCst)))
        .with_destroy(move |id| {
            destroy_ledger.destroyed.lock().push(id);
            Ok(())
        })
}

#[test]
fn test_construction_fills_min_idle() {
    for min_idle in 0..=4 {
        let ledger = Arc::new(Ledger::default());
        let pool = ResourcePool::new(config(&ledger).with_min_idle(min_idle).with_max_cap(4)).unwrap();

        assert_eq!(pool.len(), min_idle);
        assert_eq!(ledger.created(), min_idle);
    }
}

#[test]
fn test_invalid_configuration_creates_nothing() {
    let ledger = Arc::new(Ledger::default());

    let err = ResourcePool::new(config(&ledger).with_min_idle(3).with_max_cap(2)).unwrap_err();
    assert!(matches!(
        err,
        PoolError::Configuration(ConfigError::InvalidCapacity { min_idle: 3, max_cap: 2 })
    ));

    let err = ResourcePool::new(config(&ledger).with_max_cap(0)).unwrap_err();
    assert!(err.is_configuration());

    let mut missing_destroy = config(&ledger).with_min_idle(1);
    missing_destroy.destroy = None;
    assert!(matches!(
        ResourcePool::new(missing_destroy),
        Err(PoolError::Configuration(ConfigError::MissingDestroy))
    ));

    let mut missing_factory = config(&ledger).with_min_idle(1);
    missing_factory.factory = None;
    assert!(matches!(
        ResourcePool::new(missing_factory),
        Err(PoolError::Configuration(ConfigError::MissingFactory))
    ));

    assert_eq!(ledger.created(), 0);
}

#[test]
fn test_warmup_failure_destroys_partial_pool() {
    let ledger = Arc::new(Ledger::default());
    let factory_ledger = Arc::clone(&ledger);
    let destroy_ledger = Arc::clone(&ledger);
    let config = PoolConfiguration::<usize, io::Error>::new()
        .with_min_idle(3)
        .with_max_cap(5)
        .with_factory(move || {
            let id = factory_ledger.created.fetch_add(1, Ordering::SeqCst);
            if id == 2 {
                Err(io::Error::other("backend unreachable"))
            } else {
                Ok(id)
            }
        })
        .with_destroy(move |id| {
            destroy_ledger.destroyed.lock().push(id);
            Ok(())
        });

    let err = ResourcePool::new(config).unwrap_err();
    assert!(matches!(err, PoolError::Warmup(_)));
    assert!(err.to_string().contains("backend unreachable"));

    let mut destroyed = ledger.destroyed();
    destroyed.sort_unstable();
    assert_eq!(destroyed, vec![0, 1]);
}

#[test]
fn test_get_put_reuses_same_resource() {
    let ledger = Arc::new(Ledger::default());
    let pool = ResourcePool::new(config(&ledger).with_min_idle(1).with_max_cap(2)).unwrap();

    for _ in 0..10 {
        let resource = pool.get().unwrap();
        assert_eq!(resource, 0);
        pool.put(resource).unwrap();
        assert!(pool.len() <= pool.max_cap());
    }

    assert_eq!(ledger.created(), 1);
    assert!(ledger.destroyed().is_empty());
}

#[test]
fn test_overflow_is_destroyed() {
    let ledger = Arc::new(Ledger::default());
    let pool = ResourcePool::new(config(&ledger).with_max_cap(3)).unwrap();

    for id in 100..107 {
        pool.put(id).unwrap();
    }

    assert_eq!(pool.len(), 3);
    assert_eq!(ledger.destroyed(), vec![103, 104, 105, 106]);
}

#[test]
fn test_release_is_terminal() {
    let ledger = Arc::new(Ledger::default());
    let pool = ResourcePool::new(config(&ledger).with_min_idle(2).with_max_cap(3)).unwrap();

    pool.release();
    assert_eq!(pool.len(), 0);
    assert!(pool.is_closed());
    assert_eq!(ledger.destroyed().len(), 2);

    for _ in 0..3 {
        assert!(matches!(pool.get(), Err(PoolError::Closed)));
    }

    pool.put(42).unwrap();
    pool.put(43).unwrap();
    assert_eq!(pool.len(), 0);
    assert_eq!(ledger.destroyed()[2..], [42, 43]);

    pool.release();
    assert_eq!(ledger.destroyed().len(), 4);
}

#[test]
fn test_release_ignores_destroy_failures() {
    let destroyed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&destroyed);
    let config = PoolConfiguration::<usize, io::Error>::new()
        .with_min_idle(3)
        .with_max_cap(3)
        .with_factory(|| Ok(1))
        .with_destroy(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::other("already closed"))
        });

    let pool = ResourcePool::new(config).unwrap();
    pool.release();

    assert_eq!(destroyed.load(Ordering::SeqCst), 3);
    assert!(matches!(pool.put(1), Err(PoolError::Destroy(_))));
}

#[test]
fn test_destroy_failures_reach_the_caller() {
    let config = PoolConfiguration::<usize, io::Error>::new()
        .with_min_idle(1)
        .with_max_cap(1)
        .with_factory(|| Ok(1))
        .with_destroy(|_| Err(io::Error::other("boom")));
    let pool = ResourcePool::new(config).unwrap();

    let err = pool.close(5).unwrap_err();
    assert!(matches!(err, PoolError::Destroy(_)));
    assert_eq!(err.to_string(), "failed to destroy resource: boom");

    // The single slot is taken, so this return overflows into destroy.
    assert!(matches!(pool.put(6), Err(PoolError::Destroy(_))));
    assert_eq!(pool.len(), 1);
}

#[test]
fn test_idle_timeout_evicts_stale_resources() {
    let ledger = Arc::new(Ledger::default());
    let pool = ResourcePool::new(
        config(&ledger)
            .with_min_idle(2)
            .with_max_cap(2)
            .with_idle_timeout(Duration::from_millis(30)),
    )
    .unwrap();

    thread::sleep(Duration::from_millis(60));

    let resource = pool.get().unwrap();
    assert_eq!(resource, 2);
    assert_eq!(ledger.destroyed(), vec![0, 1]);

    pool.put(resource).unwrap();
    assert_eq!(pool.get().unwrap(), 2);

    let metrics = pool.get_metrics();
    assert_eq!(metrics.idle_evictions, 2);
    assert_eq!(metrics.total_created, 3);
}

#[test]
fn test_failing_validator_always_falls_through_to_factory() {
    let ledger = Arc::new(Ledger::default());
    let pool = ResourcePool::new(
        config(&ledger)
            .with_min_idle(2)
            .with_max_cap(4)
            .with_validate(|_| Err(io::Error::other("ping failed"))),
    )
    .unwrap();

    let first = pool.get().unwrap();
    assert_eq!(first, 2);
    let mut destroyed = ledger.destroyed();
    destroyed.sort_unstable();
    assert_eq!(destroyed, vec![0, 1]);

    pool.put(first).unwrap();
    assert_eq!(pool.get().unwrap(), 3);
    assert_eq!(ledger.destroyed().len(), 3);
    assert_eq!(pool.get_metrics().validation_failures, 3);

    assert!(matches!(pool.validate(&9), Err(PoolError::Validate(_))));
}

#[test]
fn test_validator_keeps_healthy_resources() {
    let ledger = Arc::new(Ledger::default());
    let pool = ResourcePool::new(
        config(&ledger)
            .with_min_idle(2)
            .with_max_cap(2)
            .with_validate(|id| {
                if *id % 2 == 0 {
                    Ok(())
                } else {
                    Err(io::Error::other("odd connection"))
                }
            }),
    )
    .unwrap();

    assert_eq!(pool.get().unwrap(), 0);
    assert_eq!(pool.get().unwrap(), 2);
    assert_eq!(ledger.destroyed(), vec![1]);
    assert!(pool.validate(&4).is_ok());
}

#[test]
fn test_factory_error_propagates_from_get() {
    let config = PoolConfiguration::<usize, io::Error>::new()
        .with_factory(|| Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")))
        .with_destroy(|_| Ok(()));
    let pool = ResourcePool::new(config).unwrap();

    let err = pool.get().unwrap_err();
    assert!(matches!(&err, PoolError::Create(inner) if inner.kind() == io::ErrorKind::ConnectionRefused));
}

#[test]
fn test_min_idle_two_max_cap_three_scenario() {
    let ledger = Arc::new(Ledger::default());
    let pool = ResourcePool::new(config(&ledger).with_min_idle(2).with_max_cap(3)).unwrap();
    assert_eq!(pool.len(), 2);

    let a = pool.get().unwrap();
    let b = pool.get().unwrap();
    assert_eq!(pool.len(), 0);

    let c = pool.get().unwrap();
    assert_eq!(c, 2);
    assert_eq!(ledger.created(), 3);

    pool.put(a).unwrap();
    pool.put(b).unwrap();
    pool.put(c).unwrap();
    assert_eq!(pool.len(), 3);

    pool.put(99).unwrap();
    assert_eq!(pool.len(), 3);
    assert_eq!(ledger.destroyed(), vec![99]);
}

#[test]
fn test_concurrent_get_put_stays_bounded() {
    let ledger = Arc::new(Ledger::default());
    let pool = ResourcePool::new(config(&ledger).with_min_idle(2).with_max_cap(4)).unwrap();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let resource = pool.get().unwrap();
                    pool.put(resource).unwrap();
                    assert!(pool.len() <= 4);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    // Every resource ever created is either idle or destroyed exactly once.
    let destroyed = ledger.destroyed();
    let mut unique = destroyed.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), destroyed.len());
    assert_eq!(pool.len() + destroyed.len(), ledger.created());
}

#[test]
fn test_concurrent_release_rejects_later_gets() {
    let ledger = Arc::new(Ledger::default());
    let pool = ResourcePool::new(config(&ledger).with_min_idle(4).with_max_cap(4)).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                loop {
                    match pool.get() {
                        Ok(resource) => {
                            let _ = pool.put(resource);
                        }
                        Err(PoolError::Closed) => break,
                        Err(err) => panic!("unexpected error: {err}"),
                    }
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    pool.release();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(pool.len(), 0);
    assert_eq!(ledger.destroyed().len(), ledger.created());
}

#[tokio::test]
async fn test_get_timeout_returns_late_resource_to_pool() {
    let config = PoolConfiguration::<usize, io::Error>::new()
        .with_max_cap(2)
        .with_factory(|| {
            thread::sleep(Duration::from_millis(100));
            Ok(7)
        })
        .with_destroy(|_| Ok(()));
    let pool = ResourcePool::new(config).unwrap();

    let err = pool.get_timeout(Duration::from_millis(10)).await.unwrap_err();
    assert!(matches!(err, PoolError::Timeout(_)));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.get_timeout(Duration::from_secs(1)).await.unwrap(), 7);
}

#[tokio::test]
async fn test_get_async_after_release() {
    let ledger = Arc::new(Ledger::default());
    let pool = ResourcePool::new(config(&ledger).with_min_idle(1)).unwrap();

    assert_eq!(pool.get_async().await.unwrap(), 0);
    pool.release();
    assert!(pool.get_async().await.unwrap_err().is_closed());
}

#[test]
fn test_late_resource_survives_runtime_shutdown() {
    let ledger = Arc::new(Ledger::default());
    let factory_ledger = Arc::clone(&ledger);
    let destroy_ledger = Arc::clone(&ledger);
    let config = PoolConfiguration::<usize, io::Error>::new()
        .with_max_cap(2)
        .with_factory(move || {
            thread::sleep(Duration::from_millis(100));
            Ok(factory_ledger.created.fetch_add(1, Ordering::SeqCst))
        })
        .with_destroy(move |id| {
            destroy_ledger.destroyed.lock().push(id);
            Ok(())
        });
    let pool = ResourcePool::new(config).unwrap();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let err = runtime
        .block_on(pool.get_timeout(Duration::from_millis(10)))
        .unwrap_err();
    assert!(matches!(err, PoolError::Timeout(_)));
    drop(runtime);

    thread::sleep(Duration::from_millis(300));
    assert_eq!(ledger.created(), 1);
    assert_eq!(pool.len(), 1);
    assert!(ledger.destroyed().is_empty());
}
