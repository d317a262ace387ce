// EsoxSolutions.ResourcePool
// Bounded, thread-safe pool of reusable resources

// This is just a demo binary - the actual library is in lib.rs
// Set RUST_LOG=debug to see the pool's lifecycle events.

use esox_resourcepool::{BoxError, PoolConfiguration, ResourcePool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Connection {
    id: usize,
}

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== EsoxSolutions.ResourcePool ===");

    let next_id = Arc::new(AtomicUsize::new(1));
    let config = PoolConfiguration::<Connection, BoxError>::new()
        .with_min_idle(2)
        .with_max_cap(3)
        .with_idle_timeout(Duration::from_secs(30))
        .with_factory(move || {
            Ok(Connection {
                id: next_id.fetch_add(1, Ordering::Relaxed),
            })
        })
        .with_destroy(|conn| {
            println!("  destroyed connection {}", conn.id);
            Ok(())
        })
        .with_validate(|conn| {
            if conn.id > 0 {
                Ok(())
            } else {
                Err("connection id is invalid".into())
            }
        });

    let pool = ResourcePool::new(config)?;
    println!("  Idle after warm-up: {}", pool.len());

    let borrowed: Vec<_> = (0..4).map(|_| pool.get()).collect::<Result<_, _>>()?;
    println!(
        "  Borrowed: {:?}",
        borrowed.iter().map(|conn| conn.id).collect::<Vec<_>>()
    );

    for conn in borrowed {
        pool.put(conn)?;
    }
    println!("  Idle after return: {} (max {})", pool.len(), pool.max_cap());

    {
        let conn = pool.get_pooled()?;
        println!("  Guarded connection: {}", conn.id);
    }

    for (key, value) in pool.export_metrics() {
        println!("  {key} = {value}");
    }

    pool.release();
    println!("  Released, idle: {}", pool.len());
    Ok(())
}
