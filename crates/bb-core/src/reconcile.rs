use crate::Cache;
use tracing::debug;

/// Folds a live snapshot into the cache and reports whether anything was
/// inserted or replaced.
///
/// Jobs missing from the snapshot are left alone: once the scheduler forgets
/// a finished job, the cache is the only place its final state survives.
/// Removal is reserved for an explicit clear.
pub fn reconcile(cache: &mut Cache, live: Cache) -> bool {
    let mut changed = false;
    for (id, fresh) in live {
        match cache.get(&id) {
            Some(known) if !known.differs_materially(&fresh) => {}
            Some(known) => {
                debug!(job = %id, from = %known.status, to = %fresh.status, "job updated");
                cache.insert(id, fresh);
                changed = true;
            }
            None => {
                debug!(job = %id, status = %fresh.status, "job tracked");
                cache.insert(id, fresh);
                changed = true;
            }
        }
    }
    changed
}
