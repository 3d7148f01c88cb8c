//! # Eviction Module
//!
//! Frees space before an insert would push the cache over capacity.
//!
//! ## Policy
//! The default [`LfuLruPolicy`] removes the least frequently used entries
//! first and, among entries with the same access count, the least recently
//! used. Victims are chosen and removed inside the store transaction that
//! writes the new entry, so concurrent inserts cannot all pass the same
//! capacity check.
//!
//! Capacity is a soft limit: an entry larger than the whole cache empties
//! it and is stored anyway, which the outcome reports as a shortfall.
//! Under `strict` limits such an entry is refused before anything is
//! removed.

use crate::core::registry::CacheRegistry;
use crate::core::store::{Admission, EntryMetadata};
use crate::error::StoreError;
use std::sync::Arc;

/// Orders entries by how evictable they are
pub trait EvictionPolicy: Send + Sync {
    /// Sort entries by eviction priority (first = most evictable)
    fn sort_by_priority(&self, entries: &mut [EntryMetadata]);
}

/// Least-frequently-used with least-recently-used tiebreak
#[derive(Debug, Clone, Copy, Default)]
pub struct LfuLruPolicy;

impl EvictionPolicy for LfuLruPolicy {
    fn sort_by_priority(&self, entries: &mut [EntryMetadata]) {
        // Stable: full ties keep store (insertion) order
        entries.sort_by_key(|e| (e.access_count, e.timestamp));
    }
}

/// Keys chosen for removal and the bytes they account for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionPlan {
    pub keys: Vec<String>,
    pub planned_bytes: u64,
}

/// Pick victims in priority order until `required_bytes` is covered or
/// the candidates run out.
pub fn plan_eviction(
    policy: &dyn EvictionPolicy,
    mut entries: Vec<EntryMetadata>,
    required_bytes: u64,
) -> EvictionPlan {
    let mut plan = EvictionPlan::default();
    if required_bytes == 0 {
        return plan;
    }

    policy.sort_by_priority(&mut entries);

    for entry in entries {
        if plan.planned_bytes >= required_bytes {
            break;
        }
        plan.planned_bytes += entry.size_bytes;
        plan.keys.push(entry.key);
    }

    plan
}

/// Capacity settings an insert is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityLimits {
    pub max_cache_size: u64,
    /// Refuse entries that cannot fit instead of overfilling
    pub strict: bool,
}

/// Bytes to free before inserting `size_bytes` on top of `current_total`.
///
/// At least the new entry's size, and enough to get back under
/// `max_cache_size` when the cache is already over it.
pub fn required_bytes(current_total: u64, size_bytes: u64, max_cache_size: u64) -> u64 {
    let overflow = (current_total + size_bytes).saturating_sub(max_cache_size);
    size_bytes.max(overflow)
}

/// Decide evictions for inserting `size_bytes` next to `others`.
///
/// No eviction when the entry fits as is. Under strict limits an entry
/// larger than the whole capacity is refused and nothing is evicted.
pub fn plan_admission(
    policy: &dyn EvictionPolicy,
    others: &[EntryMetadata],
    size_bytes: u64,
    limits: CapacityLimits,
) -> Admission {
    if limits.strict && size_bytes > limits.max_cache_size {
        return Admission::reject();
    }

    let total: u64 = others.iter().map(|e| e.size_bytes).sum();
    if total + size_bytes <= limits.max_cache_size {
        return Admission::store(Vec::new());
    }

    let required = required_bytes(total, size_bytes, limits.max_cache_size);
    let plan = plan_eviction(policy, others.to_vec(), required);
    Admission::store(plan.keys)
}

/// What an eviction pass actually did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionOutcome {
    pub required_bytes: u64,
    pub freed_bytes: u64,
    pub evicted: Vec<EntryMetadata>,
    /// Bytes stored once the new entry is in
    pub total_after: u64,
    pub max_cache_size: u64,
}

impl EvictionOutcome {
    /// Bytes by which the cache ends up over capacity, if any
    pub fn shortfall(&self) -> Option<u64> {
        (self.total_after > self.max_cache_size).then(|| self.total_after - self.max_cache_size)
    }

    pub fn is_satisfied(&self) -> bool {
        self.shortfall().is_none()
    }
}

/// Result of a capacity-checked insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertReport {
    /// Metadata of the new entry, `None` when strict limits refused it
    pub stored: Option<EntryMetadata>,
    /// Present when eviction had to run
    pub eviction: Option<EvictionOutcome>,
}

/// Runs an [`EvictionPolicy`] against a registry
#[derive(Clone)]
pub struct Evictor {
    policy: Arc<dyn EvictionPolicy>,
}

impl Evictor {
    pub fn new(policy: Arc<dyn EvictionPolicy>) -> Self {
        Self { policy }
    }

    /// Store `image_bytes` under `key`, evicting first if the insert would
    /// exceed `limits`.
    ///
    /// Reading the current entries, removing victims and writing the new
    /// entry happen in one store transaction.
    pub fn insert(
        &self,
        registry: &CacheRegistry,
        key: &str,
        image_bytes: Vec<u8>,
        limits: CapacityLimits,
    ) -> Result<InsertReport, StoreError> {
        let size_bytes = image_bytes.len() as u64;
        let policy = self.policy.as_ref();

        let result = registry.put_bounded(key, image_bytes, &|others| {
            plan_admission(policy, others, size_bytes, limits)
        })?;

        let overflowing = result.previous_total + size_bytes > limits.max_cache_size;
        let eviction = (result.stored.is_some() && overflowing).then(|| {
            let freed_bytes: u64 = result.evicted.iter().map(|e| e.size_bytes).sum();

            for entry in &result.evicted {
                tracing::debug!(
                    "Evicted {} ({} bytes, {} accesses)",
                    entry.key,
                    entry.size_bytes,
                    entry.access_count
                );
            }

            EvictionOutcome {
                required_bytes: required_bytes(
                    result.previous_total,
                    size_bytes,
                    limits.max_cache_size,
                ),
                freed_bytes,
                evicted: result.evicted.clone(),
                total_after: result.previous_total - freed_bytes + size_bytes,
                max_cache_size: limits.max_cache_size,
            }
        });

        Ok(InsertReport {
            stored: result.stored,
            eviction,
        })
    }
}

impl Default for Evictor {
    fn default() -> Self {
        Self::new(Arc::new(LfuLruPolicy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::store::InMemoryStore;
    use std::time::Duration;

    fn meta(key: &str, size: u64, timestamp: u64, access_count: u64) -> EntryMetadata {
        EntryMetadata {
            key: key.to_string(),
            size_bytes: size,
            timestamp,
            access_count,
        }
    }

    #[test]
    fn least_frequently_used_goes_first() {
        let entries = vec![meta("five", 10, 1, 5), meta("one", 10, 2, 1), meta("three", 10, 3, 3)];

        let plan = plan_eviction(&LfuLruPolicy, entries, 1);

        assert_eq!(plan.keys, vec!["one"]);
    }

    #[test]
    fn ties_break_on_older_timestamp() {
        let entries = vec![meta("newer", 10, 200, 2), meta("older", 10, 100, 2)];

        let plan = plan_eviction(&LfuLruPolicy, entries, 5);

        assert_eq!(plan.keys, vec!["older"]);
    }

    #[test]
    fn frequency_outranks_recency() {
        let entries = vec![meta("old-popular", 10, 1, 9), meta("new-unpopular", 10, 999, 1)];

        let plan = plan_eviction(&LfuLruPolicy, entries, 10);

        assert_eq!(plan.keys, vec!["new-unpopular"]);
    }

    #[test]
    fn plan_accumulates_until_requirement_met() {
        let entries = vec![meta("a", 100, 1, 1), meta("b", 100, 2, 1), meta("c", 100, 3, 1)];

        let plan = plan_eviction(&LfuLruPolicy, entries, 150);

        assert_eq!(plan.keys, vec!["a", "b"]);
        assert_eq!(plan.planned_bytes, 200);
    }

    #[test]
    fn zero_requirement_plans_nothing() {
        let plan = plan_eviction(&LfuLruPolicy, vec![meta("a", 1, 1, 1)], 0);
        assert!(plan.keys.is_empty());
    }

    const LENIENT: CapacityLimits = CapacityLimits {
        max_cache_size: 1000,
        strict: false,
    };
    const STRICT: CapacityLimits = CapacityLimits {
        max_cache_size: 1000,
        strict: true,
    };

    #[test]
    fn required_bytes_covers_existing_overflow() {
        assert_eq!(required_bytes(900, 400, 1000), 400);
        assert_eq!(required_bytes(1500, 100, 1000), 600);
        assert_eq!(required_bytes(0, 1500, 1000), 1500);
    }

    #[test]
    fn fitting_entry_evicts_nothing() {
        let others = vec![meta("a", 500, 1, 1)];
        assert_eq!(
            plan_admission(&LfuLruPolicy, &others, 500, STRICT),
            Admission::store(Vec::new())
        );
    }

    #[test]
    fn strict_refuses_oversized_entry_without_evicting() {
        let others = vec![meta("a", 100, 1, 1)];
        assert_eq!(
            plan_admission(&LfuLruPolicy, &others, 1001, STRICT),
            Admission::reject()
        );
    }

    #[test]
    fn strict_admits_entry_that_fits_after_emptying_cache() {
        let others = vec![meta("old", 700, 1, 1)];

        let admission = plan_admission(&LfuLruPolicy, &others, 800, STRICT);

        assert!(admission.admit);
        assert_eq!(admission.evict, vec!["old"]);
    }

    #[test]
    fn emptied_cache_that_fits_reports_no_shortfall() {
        let registry = CacheRegistry::new(Arc::new(InMemoryStore::new()));
        registry.put("old", vec![0; 700]).unwrap();

        let report = Evictor::default()
            .insert(&registry, "new", vec![0; 800], LENIENT)
            .unwrap();

        let eviction = report.eviction.unwrap();
        assert_eq!(eviction.freed_bytes, 700);
        assert_eq!(eviction.total_after, 800);
        assert!(eviction.is_satisfied());
        assert!(report.stored.is_some());
    }

    #[test]
    fn oversized_entry_reports_shortfall() {
        let registry = CacheRegistry::new(Arc::new(InMemoryStore::new()));
        registry.put("a", vec![0; 100]).unwrap();

        let report = Evictor::default()
            .insert(&registry, "huge", vec![0; 1500], LENIENT)
            .unwrap();

        let eviction = report.eviction.unwrap();
        assert_eq!(eviction.freed_bytes, 100);
        assert_eq!(eviction.shortfall(), Some(500));
        assert_eq!(registry.total_size().unwrap(), 1500);
    }

    #[test]
    fn strict_insert_of_oversized_entry_keeps_cache() {
        let registry = CacheRegistry::new(Arc::new(InMemoryStore::new()));
        registry.put("a", vec![0; 100]).unwrap();

        let report = Evictor::default()
            .insert(&registry, "huge", vec![0; 1500], STRICT)
            .unwrap();

        assert!(report.stored.is_none());
        assert!(report.eviction.is_none());
        assert_eq!(registry.total_size().unwrap(), 100);
    }

    #[test]
    fn evictor_removes_by_policy_order() {
        let clock = Arc::new(ManualClock::new(0));
        let registry = CacheRegistry::with_clock(Arc::new(InMemoryStore::new()), clock.clone());

        for key in ["a", "b"] {
            registry.put(key, vec![0; 400]).unwrap();
            clock.advance(Duration::from_millis(10));
        }
        registry.record_hit("a").unwrap();

        let report = Evictor::default()
            .insert(&registry, "c", vec![0; 400], LENIENT)
            .unwrap();

        let eviction = report.eviction.unwrap();
        assert_eq!(eviction.evicted.len(), 1);
        assert_eq!(eviction.evicted[0].key, "b");
        assert!(registry.lookup("a").unwrap().is_some());
        assert!(registry.lookup("c").unwrap().is_some());
        assert_eq!(registry.total_size().unwrap(), 800);
    }

    #[test]
    fn overwriting_a_key_does_not_count_its_old_size() {
        let registry = CacheRegistry::new(Arc::new(InMemoryStore::new()));
        registry.put("a", vec![0; 600]).unwrap();
        registry.put("b", vec![0; 300]).unwrap();

        let report = Evictor::default()
            .insert(&registry, "a", vec![0; 650], LENIENT)
            .unwrap();

        assert!(report.eviction.is_none());
        assert_eq!(registry.total_size().unwrap(), 950);
    }
}
