//! Determinism testing utilities.
//!
//! Provides a harness for verifying that colony ticks produce identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Two runs from the same persisted records and the same world must make
//! the same decisions. Sources of non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Every keyed collection in the core is a `BTreeMap`/`BTreeSet`, and
//!   units and facilities are visited in id order.
//!
//! - **Floating-point math**: danger falloff uses fixed-point via
//!   [`colony_core::math::Fixed`].
//!
//! - **Hidden state**: the unit record is the only continuation between
//!   ticks, so a save/load round trip mid-run must not change the outcome.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use colony_core::colony::Colony;
use colony_core::config::ColonyConfig;
use colony_core::math::GridPos;
use colony_core::store::RecordStore;

use crate::fixtures::{facility, sample_config, sample_world, MockWorld};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic runs).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Colony ticks are non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a scenario multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the scenario
/// * `ticks` - Number of ticks to run per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use colony_test_utils::determinism::{verify_determinism, ColonyHarness};
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 ticks each
///     ColonyHarness::sample,
///     ColonyHarness::tick,
///     ColonyHarness::state_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run N harnesses on scoped threads and collect final hashes.
///
/// Each thread builds its own harness, so the setup function only needs to
/// be `Sync`.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_harnesses<F>(setup_fn: F, num_runs: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> ColonyHarness + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| {
                s.spawn(|| {
                    let mut harness = setup_fn();
                    for _ in 0..num_ticks {
                        harness.tick();
                    }
                    harness.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("harness thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(tick)` if they diverge at
/// that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> ColonyHarness,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.tick();
        b.tick();

        if a.state_hash() != b.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that saving and reloading the record store mid-run does not
/// change where the run ends up.
///
/// Runs `num_ticks` ticks, round-trips the store through JSON, runs
/// `num_ticks` more and compares against an uninterrupted run.
pub fn verify_reload_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> ColonyHarness,
{
    let mut straight = setup_fn();
    let mut reloaded = setup_fn();

    for _ in 0..num_ticks {
        straight.tick();
        reloaded.tick();
    }

    let Ok(json) = reloaded.store.to_json() else {
        return false;
    };
    let Ok(store) = RecordStore::from_json(&json) else {
        return false;
    };
    reloaded.store = store;

    for _ in 0..num_ticks {
        straight.tick();
        reloaded.tick();
    }

    straight.state_hash() == reloaded.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// A colony, its world and its record store, advanced together.
#[derive(Debug)]
pub struct ColonyHarness {
    /// Colony under test.
    pub colony: Colony,
    /// Scripted world.
    pub world: MockWorld,
    /// Persisted records.
    pub store: RecordStore,
    /// Next tick to run.
    pub tick: u64,
    /// Resource added to every facility before each tick.
    pub regeneration: u32,
}

impl ColonyHarness {
    /// Build a harness from a config and world, with one facility at (25, 25).
    ///
    /// # Panics
    ///
    /// Panics if the config is invalid.
    #[must_use]
    pub fn new(config: &ColonyConfig, world: MockWorld, capacity: u32) -> Self {
        let mut colony = Colony::from_config(config).expect("valid colony config");
        colony.add_facility(facility("fac-1", GridPos::new(25, 25), capacity));
        Self {
            colony,
            world,
            store: RecordStore::new(),
            tick: 1,
            regeneration: 10,
        }
    }

    /// The sample colony in the sample world.
    #[must_use]
    pub fn sample() -> Self {
        Self::new(&sample_config(), sample_world(), 550)
    }

    /// Regenerate facilities and run one colony tick.
    pub fn tick(&mut self) {
        for facility in self.colony.facilities_mut() {
            facility.regenerate(self.regeneration);
        }
        let report = self
            .colony
            .run_tick(&mut self.world, &mut self.store, self.tick);
        tracing::trace!(
            tick = self.tick,
            grants = report.admission.grants(),
            stepped = report.steps.len(),
            pruned = report.pruned.len(),
            "harness tick"
        );
        self.tick += 1;
    }

    /// Hash of everything that persists between ticks plus the world's
    /// command log.
    ///
    /// # Panics
    ///
    /// Panics if the store cannot be serialized.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let records = self.store.to_json().expect("store serializes");
        let balances: Vec<(u32, u32)> = self
            .colony
            .facilities()
            .iter()
            .map(|f| (f.available, f.spawning_ticks))
            .collect();
        compute_hash(&(records, balances, &self.world.log, &self.world.received))
    }
}
