//! Determinism harness.
//!
//! A skirmish replayed from the same setup must publish the same events in
//! the same order and end in the same state. Everything here runs a setup
//! closure more than once and compares what comes out.
//!
//! Things that break this:
//!
//! - **Floating-point math**: the core uses [`skirmish_core::math::Fixed`].
//! - **HashMap iteration order**: the tick walks entities in ascending id
//!   order, never in storage order.
//! - **Event ordering**: events are compared as whole sequences, not sets.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use tracing::warn;

use skirmish_core::events::CoreEvent;
use skirmish_core::simulation::Simulation;

/// Outcome of comparing several runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether every run ended with the same hash.
    pub is_deterministic: bool,
    /// Final hash of each run.
    pub hashes: Vec<u64>,
    /// Ticks per run.
    pub ticks: u64,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>, ticks: u64) -> Self {
        let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
        Self {
            is_deterministic,
            hashes,
            ticks,
        }
    }

    /// Distinct final hashes (1 when deterministic).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Panic with the hash spread if the runs diverged.
    ///
    /// # Panics
    ///
    /// Panics if the runs ended with different hashes.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic,
            "runs diverged after {} ticks: {} distinct hashes across {} runs: {:?}",
            self.ticks,
            self.unique_hashes().len(),
            self.hashes.len(),
            self.hashes
        );
    }
}

/// Run a generic state machine `runs` times and compare final hashes.
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
    let hashes = (0..runs)
        .map(|_| {
            let mut state = setup();
            for _ in 0..ticks {
                step(&mut state);
            }
            hash(&state)
        })
        .collect();
    DeterminismResult::from_hashes(hashes, ticks)
}

/// Run a simulation twice from the same setup and compare state hashes.
///
/// # Example
///
/// ```
/// use skirmish_test_utils::determinism::verify_simulation_determinism;
/// use skirmish_test_utils::fixtures::duel;
///
/// assert!(verify_simulation_determinism(|| duel(3.0).0, 200));
/// ```
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Full event log of one run.
pub fn record_events<F>(setup_fn: F, num_ticks: u64) -> Vec<(u64, CoreEvent)>
where
    F: FnOnce() -> Simulation,
{
    let mut sim = setup_fn();
    let mut log = Vec::new();
    for _ in 0..num_ticks {
        let tick = sim.get_tick();
        log.extend(sim.tick().into_iter().map(|event| (tick, event)));
    }
    log
}

/// First position at which two runs publish different events, as
/// `(tick, index into the log)`. `None` if the logs are identical.
pub fn find_event_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<(u64, usize)>
where
    F: Fn() -> Simulation,
{
    let first = record_events(&setup_fn, num_ticks);
    let second = record_events(&setup_fn, num_ticks);

    let mismatch = first.iter().zip(&second).position(|(a, b)| a != b);
    match mismatch {
        Some(index) => Some((first[index].0, index)),
        None if first.len() != second.len() => {
            let index = first.len().min(second.len());
            let tick = first.get(index).or_else(|| second.get(index)).map_or(0, |(t, _)| *t);
            Some((tick, index))
        }
        None => None,
    }
}

/// Run `num_sims` copies on scoped threads and compare final hashes.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });
    DeterminismResult::from_hashes(hashes, num_ticks)
}

/// Step two runs side by side and return the first tick after which their
/// state hashes differ.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }
    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();
        if sim1.state_hash() != sim2.state_hash() {
            warn!(tick, "state hashes diverged");
            return Some(tick);
        }
    }
    None
}

/// Hash any value with the std hasher.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies over simulation inputs.
pub mod strategies {
    use proptest::prelude::*;
    use skirmish_core::attack::{AttackDelivery, AttackStats, ProjectileTemplate};
    use skirmish_core::math::{Fixed, Vec3Fixed};

    /// Fixed value in `[min, max]` with 1/100 resolution.
    pub fn arb_fixed(min: i32, max: i32) -> impl Strategy<Value = Fixed> {
        (min * 100..=max * 100).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(100))
    }

    /// Ground-level point inside a square arena.
    pub fn arb_point(half_extent: i32) -> impl Strategy<Value = Vec3Fixed> {
        (arb_fixed(-half_extent, half_extent), arb_fixed(-half_extent, half_extent))
            .prop_map(|(x, z)| Vec3Fixed::ground(x, z))
    }

    /// Health maximum between 1 and 1000.
    pub fn arb_max_health() -> impl Strategy<Value = Fixed> {
        arb_fixed(1, 1000)
    }

    /// Damage or heal amount, including negatives.
    pub fn arb_amount() -> impl Strategy<Value = Fixed> {
        arb_fixed(-50, 500)
    }

    /// Attack stats across both delivery kinds, including out-of-range
    /// values the builders must clamp.
    pub fn arb_attack_stats() -> impl Strategy<Value = AttackStats> {
        (
            arb_fixed(-1, 3),
            arb_fixed(-50, 400),
            arb_fixed(0, 2),
            arb_fixed(-1, 12),
            arb_fixed(-5, 60),
            any::<bool>(),
        )
            .prop_map(|(bat, speed, point, range, damage, ranged)| {
                let stats = AttackStats::default()
                    .with_base_attack_time(bat)
                    .with_attack_speed(speed)
                    .with_attack_point(point)
                    .with_range(range)
                    .with_damage(damage);
                if ranged {
                    stats
                        .with_delivery(AttackDelivery::Projectile)
                        .with_projectile(Some(ProjectileTemplate::default()))
                } else {
                    stats
                }
            })
    }
}
