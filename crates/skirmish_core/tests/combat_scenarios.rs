//! End-to-end combat scenarios driven through the public simulation API.

use skirmish_core::prelude::*;
use skirmish_test_utils::fixtures::{
    civilian, count_events, deaths_of, duel, fixed, melee_unit, point, ranged_unit, run_ticks,
};

// =============================================================================
// Melee
// =============================================================================

#[test]
fn test_melee_duel_has_one_winner() {
    let (mut sim, a, b) = duel(3.0);
    let events = run_ticks(&mut sim, 600);

    assert_eq!(deaths_of(&events, a) + deaths_of(&events, b), 1);

    let winner_id = if deaths_of(&events, a) == 0 { a } else { b };
    let winner = sim.get_entity(winner_id).unwrap();
    assert_eq!(winner.unit.as_ref().unwrap().order(), Order::None);
    assert!(sim.is_idle());
}

#[test]
fn test_swing_sequence_order() {
    let (mut sim, a, b) = duel(2.0);
    let events = run_ticks(&mut sim, 40);

    let position = |predicate: &dyn Fn(&CoreEvent) -> bool| events.iter().position(|e| predicate(e));
    let started = position(&|e| matches!(e, CoreEvent::AttackStarted { attacker, target } if *attacker == a && *target == b));
    let hit = position(&|e| matches!(e, CoreEvent::AttackHit { attacker, .. } if *attacker == a));
    let point_reached =
        position(&|e| matches!(e, CoreEvent::AttackPointReached { attacker, .. } if *attacker == a));

    let (started, hit, point_reached) = (started.unwrap(), hit.unwrap(), point_reached.unwrap());
    assert!(started < hit);
    assert!(hit < point_reached);
}

#[test]
fn test_cooldown_spaces_strikes() {
    let (mut sim, a, _) = duel(2.0);
    let events = run_ticks(&mut sim, 100);

    // 5 seconds at 2.0 s per exchange (0.3 windup + 1.7 cooldown).
    let hits = count_events(&events, |e| matches!(e, CoreEvent::AttackHit { attacker, .. } if *attacker == a));
    assert!((2..=3).contains(&hits), "got {hits} hits");
}

#[test]
fn test_dead_unit_stops_fighting() {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(melee_unit(0, point(0.0, 0.0)));
    let b = sim.spawn_unit(UnitSpawnParams {
        max_health: fixed(10),
        ..melee_unit(1, point(2.0, 0.0))
    });
    sim.issue_attack_order(a, b).unwrap();
    sim.issue_attack_order(b, a).unwrap();

    let events = run_ticks(&mut sim, 200);
    assert_eq!(deaths_of(&events, b), 1);

    let loser = sim.get_entity(b).unwrap();
    assert!(loser.movement.is_none());
    assert_eq!(loser.unit.as_ref().unwrap().order(), Order::None);
    assert!(!loser.attack.unwrap().is_winding_up());
    // b was killed before its own first swing landed.
    assert_eq!(
        count_events(&events, |e| matches!(e, CoreEvent::AttackHit { attacker, .. } if *attacker == b)),
        0
    );
}

#[test]
fn test_civilian_cannot_attack() {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(civilian(0, point(0.0, 0.0)));
    let b = sim.spawn_unit(melee_unit(1, point(1.0, 0.0)));
    sim.issue_attack_order(a, b).unwrap();

    let events = run_ticks(&mut sim, 20);
    assert_eq!(count_events(&events, |e| matches!(e, CoreEvent::AttackStarted { .. })), 0);
    assert_eq!(sim.get_entity(a).unwrap().unit.as_ref().unwrap().order(), Order::None);
}

// =============================================================================
// Ranged
// =============================================================================

#[test]
fn test_archer_kills_with_projectiles() {
    let mut sim = Simulation::new();
    let archer = sim.spawn_unit(ranged_unit(0, point(0.0, 0.0), fixed(8)));
    let dummy = sim.spawn_unit(civilian(1, point(6.0, 0.0)));
    sim.issue_attack_order(archer, dummy).unwrap();

    let events = run_ticks(&mut sim, 600);

    let spawned = count_events(&events, |e| matches!(e, CoreEvent::ProjectileSpawned { .. }));
    let hits = count_events(&events, |e| matches!(e, CoreEvent::ProjectileHit { .. }));
    assert_eq!(spawned, 10);
    assert_eq!(hits, 10);
    assert_eq!(deaths_of(&events, dummy), 1);
    // The archer never had to move.
    assert_eq!(sim.get_entity(archer).unwrap().body.unwrap().position, point(0.0, 0.0));
    assert!(sim.is_idle());
}

#[test]
fn test_projectile_expires_when_target_despawns() {
    let mut sim = Simulation::new();
    let archer = sim.spawn_unit(ranged_unit(0, point(0.0, 0.0), fixed(8)));
    let dummy = sim.spawn_unit(civilian(1, point(7.5, 0.0)));
    sim.issue_attack_order(archer, dummy).unwrap();

    let mut fired = false;
    for _ in 0..100 {
        let events = sim.tick();
        if events.iter().any(|e| matches!(e, CoreEvent::ProjectileSpawned { .. })) {
            fired = true;
            break;
        }
    }
    assert!(fired);

    sim.despawn_entity(dummy).unwrap();
    let events = run_ticks(&mut sim, 5);
    assert_eq!(count_events(&events, |e| matches!(e, CoreEvent::ProjectileExpired { .. })), 1);
    assert_eq!(count_events(&events, |e| matches!(e, CoreEvent::ProjectileHit { .. })), 0);
}

// =============================================================================
// Factions
// =============================================================================

#[test]
fn test_alive_counts_follow_deaths() {
    let (mut sim, _, _) = duel(3.0);
    assert_eq!(sim.alive_units_by_faction().len(), 2);

    run_ticks(&mut sim, 600);
    let alive = sim.alive_units_by_faction();
    assert_eq!(alive.len(), 1);
    assert_eq!(alive.values().sum::<usize>(), 1);
}
