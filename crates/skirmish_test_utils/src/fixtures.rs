//! Test fixtures and helpers.
//!
//! Pre-built units and battles for consistent testing.

use skirmish_core::attack::AttackStats;
use skirmish_core::components::EntityId;
use skirmish_core::events::CoreEvent;
use skirmish_core::math::{Fixed, Vec3Fixed};
use skirmish_core::simulation::{Simulation, UnitSpawnParams};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> Fixed {
    Fixed::from_num(n)
}

/// Ground-level point from float coordinates.
#[must_use]
pub fn point(x: f64, z: f64) -> Vec3Fixed {
    Vec3Fixed::ground(fixed_f(x), fixed_f(z))
}

/// Default melee unit for a faction.
#[must_use]
pub fn melee_unit(faction_id: i32, position: Vec3Fixed) -> UnitSpawnParams {
    UnitSpawnParams {
        faction_id,
        position,
        ..Default::default()
    }
}

/// Ranged unit firing homing projectiles from `range` away.
#[must_use]
pub fn ranged_unit(faction_id: i32, position: Vec3Fixed, range: Fixed) -> UnitSpawnParams {
    UnitSpawnParams {
        faction_id,
        position,
        attack: Some(AttackStats::ranged(range)),
        ..Default::default()
    }
}

/// Unit that cannot fight.
#[must_use]
pub fn civilian(faction_id: i32, position: Vec3Fixed) -> UnitSpawnParams {
    UnitSpawnParams {
        faction_id,
        position,
        attack: None,
        ..Default::default()
    }
}

/// Two melee units facing each other `distance` apart, both ordered to
/// attack. Returns the simulation and the two unit ids.
#[must_use]
pub fn duel(distance: f64) -> (Simulation, EntityId, EntityId) {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(melee_unit(0, point(0.0, 0.0)));
    let b = sim.spawn_unit(melee_unit(1, point(distance, 0.0)));
    // Both ids exist and differ, so these cannot fail.
    let _ = sim.issue_attack_order(a, b);
    let _ = sim.issue_attack_order(b, a);
    (sim, a, b)
}

/// Two lines of `per_side` units, every unit attacking its opposite number.
/// Odd positions in each line are archers.
#[must_use]
pub fn brawl(per_side: usize) -> Simulation {
    let mut sim = Simulation::new();
    let mut west = Vec::with_capacity(per_side);
    let mut east = Vec::with_capacity(per_side);

    for i in 0..per_side {
        #[allow(clippy::cast_precision_loss)]
        let z = i as f64 * 2.0;
        let (w, e) = if i % 2 == 0 {
            (melee_unit(0, point(-6.0, z)), melee_unit(1, point(6.0, z)))
        } else {
            (
                ranged_unit(0, point(-10.0, z), fixed(8)),
                ranged_unit(1, point(10.0, z), fixed(8)),
            )
        };
        west.push(sim.spawn_unit(w));
        east.push(sim.spawn_unit(e));
    }

    for (&w, &e) in west.iter().zip(&east) {
        let _ = sim.issue_attack_order(w, e);
        let _ = sim.issue_attack_order(e, w);
    }
    sim
}

/// Tick `ticks` times and collect every event.
pub fn run_ticks(sim: &mut Simulation, ticks: u32) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        events.extend(sim.tick());
    }
    events
}

/// Number of events matching a predicate.
pub fn count_events(events: &[CoreEvent], predicate: impl Fn(&CoreEvent) -> bool) -> usize {
    events.iter().filter(|e| predicate(e)).count()
}

/// Number of `Died` events for one entity.
#[must_use]
pub fn deaths_of(events: &[CoreEvent], entity: EntityId) -> usize {
    count_events(events, |e| matches!(e, CoreEvent::Died { entity: id, .. } if *id == entity))
}
