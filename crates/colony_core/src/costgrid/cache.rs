//! Memoized cost grids, owned by a colony context.
//!
//! Grids are computed lazily on first request and reused until explicitly
//! invalidated. The cache also mirrors itself into the record store so an
//! external caller can force recomputation by clearing the stored snapshot.

use std::collections::BTreeMap;

use crate::diagnostics::Diagnostics;
use crate::ids::RegionId;
use crate::store::RecordStore;

use super::{compute_cost_grid, CostGrid, CostProfile, RegionLayout};

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Requests served from the cache.
    pub hits: u64,
    /// Requests that computed a grid.
    pub misses: u64,
    /// Entries dropped by invalidation or store sync.
    pub evictions: u64,
}

/// Cache of computed grids, keyed by region.
#[derive(Debug, Clone, Default)]
pub struct CostMatrixCache {
    profile: CostProfile,
    entries: BTreeMap<RegionId, CostGrid>,
    stats: CacheStats,
}

impl CostMatrixCache {
    /// Create an empty cache computing with `profile`.
    #[must_use]
    pub fn new(profile: CostProfile) -> Self {
        Self {
            profile,
            entries: BTreeMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Profile grids are computed with.
    #[must_use]
    pub fn profile(&self) -> &CostProfile {
        &self.profile
    }

    /// Counters since creation.
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of cached regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached grid for a region, without computing.
    #[must_use]
    pub fn get(&self, region: &RegionId) -> Option<&CostGrid> {
        self.entries.get(region)
    }

    /// Cached grid for the layout's region, computing it on a miss.
    ///
    /// The cached grid is returned as-is even if `layout` changed; callers
    /// signal layout changes through [`Self::invalidate`] or
    /// [`Self::refresh_if_changed`].
    pub fn get_or_compute(
        &mut self,
        layout: &RegionLayout,
        tick: u64,
        diagnostics: &mut Diagnostics,
    ) -> &CostGrid {
        if self.entries.contains_key(&layout.region) {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
            tracing::debug!(region = %layout.region, tick, "computing cost grid");
            let grid = compute_cost_grid(layout, &self.profile, tick, diagnostics);
            self.entries.insert(layout.region.clone(), grid);
        }
        &self.entries[&layout.region]
    }

    /// Drop a region's grid. Returns `true` if one was cached.
    pub fn invalidate(&mut self, region: &RegionId) -> bool {
        let removed = self.entries.remove(region).is_some();
        if removed {
            self.stats.evictions += 1;
            tracing::debug!(region = %region, "cost grid invalidated");
        }
        removed
    }

    /// Drop every cached grid.
    pub fn invalidate_all(&mut self) {
        self.stats.evictions += self.entries.len() as u64;
        self.entries.clear();
    }

    /// Invalidate the layout's region if its inputs no longer match the
    /// cached grid's fingerprint. Returns `true` when an entry was dropped.
    pub fn refresh_if_changed(&mut self, layout: &RegionLayout) -> bool {
        let stale = self
            .entries
            .get(&layout.region)
            .is_some_and(|grid| grid.token().fingerprint != layout.fingerprint(&self.profile));
        stale && self.invalidate(&layout.region)
    }

    /// Write every cached grid into the store.
    pub fn persist(&self, store: &mut RecordStore) {
        for (region, grid) in &self.entries {
            let unchanged = store
                .cost_grid(region)
                .is_some_and(|s| s.token == grid.token());
            if !unchanged {
                store.put_cost_grid(grid.snapshot());
            }
        }
    }

    /// Evict entries whose stored snapshot was cleared or replaced externally.
    ///
    /// Returns the regions evicted.
    pub fn sync_with_store(&mut self, store: &RecordStore) -> Vec<RegionId> {
        let stale: Vec<RegionId> = self
            .entries
            .iter()
            .filter(|(region, grid)| {
                store
                    .cost_grid(region)
                    .map_or(true, |snapshot| snapshot.token != grid.token())
            })
            .map(|(region, _)| region.clone())
            .collect();
        for region in &stale {
            self.invalidate(region);
        }
        stale
    }

    /// Adopt stored snapshots for the given layouts when their fingerprint
    /// still matches the current inputs.
    ///
    /// Stale or malformed snapshots are skipped and left for recomputation.
    /// Returns the number of grids adopted.
    pub fn restore_from_store<'a>(
        &mut self,
        store: &RecordStore,
        layouts: impl IntoIterator<Item = &'a RegionLayout>,
    ) -> usize {
        let mut adopted = 0;
        for layout in layouts {
            if self.entries.contains_key(&layout.region) {
                continue;
            }
            let Some(snapshot) = store.cost_grid(&layout.region) else {
                continue;
            };
            if snapshot.token.fingerprint != layout.fingerprint(&self.profile) {
                tracing::debug!(region = %layout.region, "stored cost grid is stale");
                continue;
            }
            match CostGrid::from_snapshot(snapshot.clone()) {
                Ok(grid) => {
                    self.entries.insert(layout.region.clone(), grid);
                    adopted += 1;
                }
                Err(e) => tracing::warn!("skipping stored cost grid: {e}"),
            }
        }
        adopted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costgrid::{Hazard, Obstacle, StructureKind};
    use crate::math::GridPos;

    fn layout() -> RegionLayout {
        let mut layout = RegionLayout::open("W1N1");
        layout.shape_danger = true;
        layout.hazards = vec![Hazard { pos: GridPos::new(20, 20), radius: 4 }];
        layout
    }

    #[test]
    fn test_computes_once_then_hits() {
        let mut cache = CostMatrixCache::new(CostProfile::default());
        let mut diag = Diagnostics::new();
        let layout = layout();

        let first = cache.get_or_compute(&layout, 1, &mut diag).clone();
        let second = cache.get_or_compute(&layout, 2, &mut diag).clone();

        assert_eq!(first, second);
        assert_eq!(second.token().computed_at, 1);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let mut cache = CostMatrixCache::new(CostProfile::default());
        let mut diag = Diagnostics::new();
        let layout = layout();
        cache.get_or_compute(&layout, 1, &mut diag);

        assert!(cache.invalidate(&layout.region));
        assert!(!cache.invalidate(&layout.region));
        let grid = cache.get_or_compute(&layout, 5, &mut diag);

        assert_eq!(grid.token().computed_at, 5);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_refresh_detects_layout_change() {
        let mut cache = CostMatrixCache::new(CostProfile::default());
        let mut diag = Diagnostics::new();
        let mut layout = layout();
        cache.get_or_compute(&layout, 1, &mut diag);

        assert!(!cache.refresh_if_changed(&layout));

        layout.obstacles.push(Obstacle {
            pos: GridPos::new(5, 5),
            kind: StructureKind::Solid,
        });
        assert!(cache.refresh_if_changed(&layout));
        assert!(cache.get(&layout.region).is_none());
    }

    #[test]
    fn test_external_clear_is_a_cache_miss() {
        let mut cache = CostMatrixCache::new(CostProfile::default());
        let mut diag = Diagnostics::new();
        let mut store = RecordStore::new();
        let layout = layout();

        cache.get_or_compute(&layout, 1, &mut diag);
        cache.persist(&mut store);
        assert!(cache.sync_with_store(&store).is_empty());

        store.clear_cost_grid(&layout.region);
        assert_eq!(cache.sync_with_store(&store), vec![layout.region.clone()]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_restore_adopts_persisted_grids() {
        let mut diag = Diagnostics::new();
        let mut store = RecordStore::new();
        let layout = layout();

        let mut warm = CostMatrixCache::new(CostProfile::default());
        let original = warm.get_or_compute(&layout, 3, &mut diag).clone();
        warm.persist(&mut store);

        let mut cold = CostMatrixCache::new(CostProfile::default());
        assert_eq!(cold.restore_from_store(&store, [&layout]), 1);
        assert_eq!(cold.get(&layout.region), Some(&original));
        assert!(cold.sync_with_store(&store).is_empty());
    }

    #[test]
    fn test_restore_skips_stale_snapshots() {
        let mut diag = Diagnostics::new();
        let mut store = RecordStore::new();
        let mut layout = layout();

        let mut warm = CostMatrixCache::new(CostProfile::default());
        warm.get_or_compute(&layout, 3, &mut diag);
        warm.persist(&mut store);

        layout.hazards.clear();
        let mut cold = CostMatrixCache::new(CostProfile::default());
        assert_eq!(cold.restore_from_store(&store, [&layout]), 0);
        assert!(cold.is_empty());
    }
}
