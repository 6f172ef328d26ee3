//! A process-wide registry of named `rayon` thread pools (C12), replacing
//! the "lazy manager wiring" anti-pattern flagged in SPEC_FULL.md §9 with an
//! explicit, lazily-initialised-but-centrally-owned registry keyed by pool
//! ID. Used by fuzzy search's chunked Levenshtein scan — CPU-bound work that
//! benefits from data parallelism. The incremental indexer's embedding
//! dispatch is I/O-bound (`async fn embed`/`embed_batch`, an RPC in a real
//! provider) and is scheduled on the Tokio runtime instead; a `rayon` pool
//! has no role there.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

static REGISTRY: Lazy<Mutex<HashMap<&'static str, Arc<rayon::ThreadPool>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Named pool IDs used within this crate.
pub const FUZZY_SEARCH_POOL: &str = "fuzzy-search";

/// Returns the pool for `pool_id`, creating it with `num_cpus` worker
/// threads on first use.
pub fn pool(pool_id: &'static str) -> Arc<rayon::ThreadPool> {
    let mut registry = REGISTRY.lock();
    registry
        .entry(pool_id)
        .or_insert_with(|| {
            Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .thread_name(move |i| format!("{pool_id}-{i}"))
                    .build()
                    .expect("failed to build worker pool"),
            )
        })
        .clone()
}

/// Removes and drops a pool, if present. Existing tasks already dispatched
/// to it run to completion; new work must call `pool()` again.
pub fn shutdown(pool_id: &'static str) {
    REGISTRY.lock().remove(pool_id);
}

/// Runs `f` over `items` on the named pool using data parallelism, returning
/// results in the original order.
pub fn map_parallel<T, R, F>(pool_id: &'static str, items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    use rayon::prelude::*;
    let pool = pool(pool_id);
    pool.install(|| items.par_iter().map(|item| f(item)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_parallel_preserves_order() {
        let items: Vec<i32> = (0..100).collect();
        let results = map_parallel(FUZZY_SEARCH_POOL, &items, |x| x * 2);
        assert_eq!(results, items.iter().map(|x| x * 2).collect::<Vec<_>>());
        shutdown(FUZZY_SEARCH_POOL);
    }
}
