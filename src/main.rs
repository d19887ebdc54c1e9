//! Mini Cache - load driver
//!
//! Builds a cache from environment variables, hammers it from several
//! worker tasks for a while, then shuts it down and prints its statistics
//! as JSON.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::json;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_cache::{Cache, CacheConfig};

/// Distinct keys each worker cycles through.
const KEYSPACE: u64 = 10_000;

/// Operations a worker runs between yields to the scheduler.
const BATCH: u64 = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env();
    let seconds = env_or("LOAD_SECONDS", 5);
    let workers = env_or("LOAD_WORKERS", 4);
    info!(
        "Configuration loaded: {}",
        serde_json::to_string(&config).context("serializing configuration")?
    );

    let cache: Arc<Cache<String, u64>> =
        Arc::new(Cache::with_config(config).context("building cache")?);
    let running = Arc::new(AtomicBool::new(true));

    let handles: Vec<_> = (0..workers)
        .map(|id| tokio::spawn(worker(id, Arc::clone(&cache), Arc::clone(&running))))
        .collect();
    info!("Started {} workers for {}s", workers, seconds);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = signal::ctrl_c() => warn!("Received Ctrl+C, stopping early"),
    }
    running.store(false, Ordering::Relaxed);

    let mut operations = 0;
    for handle in handles {
        operations += handle.await.context("worker task failed")?;
    }

    let reclaimer = cache.reclaimer_stats();
    cache.shutdown().await;

    let stats = cache.stats();
    let report = json!({
        "operations": operations,
        "store": cache.store_kind(),
        "hit_rate": stats.hit_rate(),
        "stats": stats,
        "reclaimer": reclaimer,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Mixes writes (with short TTLs on some keys), reads and deletes until told
/// to stop. Returns the number of operations issued.
async fn worker(id: u64, cache: Arc<Cache<String, u64>>, running: Arc<AtomicBool>) -> u64 {
    let mut op = 0u64;

    while running.load(Ordering::Relaxed) {
        for _ in 0..BATCH {
            let n = op.wrapping_mul(2_654_435_761).wrapping_add(id) % KEYSPACE;
            let key = format!("key:{}", n);
            match op % 10 {
                0..=2 => cache.set(key, n),
                3 => cache.set_with_ttl(key, n, Some(Duration::from_millis(n % 500))),
                4 => {
                    cache.delete(&key);
                }
                _ => {
                    cache.get(&key);
                }
            }
            op += 1;
        }
        tokio::task::yield_now().await;
    }

    op
}

fn env_or(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
