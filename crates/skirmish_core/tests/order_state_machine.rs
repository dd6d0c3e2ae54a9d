//! Order lifecycle through the simulation: notifications, settling,
//! attachment and hysteresis.

use skirmish_core::prelude::*;
use skirmish_test_utils::fixtures::{civilian, count_events, fixed, melee_unit, point, run_ticks};

fn order_changes(events: &[CoreEvent], unit: EntityId) -> Vec<(OrderKind, OrderKind)> {
    events
        .iter()
        .filter_map(|e| match e {
            CoreEvent::OrderChanged {
                unit: id,
                previous,
                current,
                ..
            } if *id == unit => Some((*previous, *current)),
            _ => None,
        })
        .collect()
}

fn order_of(sim: &Simulation, id: EntityId) -> Order {
    sim.get_entity(id).unwrap().unit.as_ref().unwrap().order()
}

#[test]
fn test_order_transitions_are_published() {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(melee_unit(0, point(0.0, 0.0)));
    let b = sim.spawn_unit(civilian(1, point(20.0, 0.0)));

    sim.issue_move_order(a, point(5.0, 0.0)).unwrap();
    sim.issue_move_order(a, point(6.0, 0.0)).unwrap();
    sim.issue_attack_order(a, b).unwrap();
    sim.issue_attack_order(a, b).unwrap();
    sim.stop_order(a).unwrap();
    sim.stop_order(a).unwrap();

    let events = sim.take_events();
    assert_eq!(
        order_changes(&events, a),
        vec![
            (OrderKind::None, OrderKind::Move),
            (OrderKind::Move, OrderKind::Attack),
            (OrderKind::Attack, OrderKind::None),
        ]
    );
}

#[test]
fn test_move_order_persists_after_arrival() {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(melee_unit(0, point(0.0, 0.0)));
    sim.issue_move_order(a, point(3.0, 4.0)).unwrap();

    let events = run_ticks(&mut sim, 60);
    let body = sim.get_entity(a).unwrap().body.unwrap();

    assert!(body.position.horizontal_distance(point(3.0, 4.0)) < fixed(1));
    assert_eq!(order_of(&sim, a), Order::Move(point(3.0, 4.0)));
    assert!(!body.is_moving());
    assert_eq!(count_events(&events, |e| matches!(e, CoreEvent::OrderChanged { .. })), 1);
    assert!(sim.is_idle());
}

#[test]
fn test_units_wait_to_settle() {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(melee_unit(0, point(0.0, 0.0)));
    sim.issue_move_order(a, point(10.0, 0.0)).unwrap();

    // Ready on the last settle tick.
    for _ in 0..SETTLE_TICKS - 1 {
        sim.tick();
        assert_eq!(sim.get_entity(a).unwrap().body.unwrap().position, point(0.0, 0.0));
    }
    run_ticks(&mut sim, 5);
    assert!(sim.get_entity(a).unwrap().body.unwrap().position.x > Fixed::ZERO);
}

#[test]
fn test_detached_unit_is_frozen_and_untargetable() {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(melee_unit(0, point(0.0, 0.0)));
    let b = sim.spawn_unit(civilian(1, point(2.0, 0.0)));
    sim.issue_move_order(b, point(2.0, 10.0)).unwrap();
    sim.issue_attack_order(a, b).unwrap();

    sim.detach_entity(b).unwrap();
    let events = run_ticks(&mut sim, 20);

    assert_eq!(sim.get_entity(b).unwrap().body.unwrap().position, point(2.0, 0.0));
    assert_eq!(count_events(&events, |e| matches!(e, CoreEvent::AttackStarted { .. })), 0);
    assert_eq!(order_of(&sim, a), Order::None);

    sim.attach_entity(b).unwrap();
    run_ticks(&mut sim, 20);
    assert!(sim.get_entity(b).unwrap().body.unwrap().position.z > Fixed::ZERO);
}

#[test]
fn test_target_inside_buffer_band_keeps_attack() {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(melee_unit(0, point(0.0, 0.0)));
    let b = sim.spawn_unit(civilian(1, point(2.75, 0.0)));
    sim.issue_attack_order(a, b).unwrap();
    sim.take_events();

    let events = run_ticks(&mut sim, 30);
    assert_eq!(order_of(&sim, a), Order::Attack(b));
    assert_eq!(order_changes(&events, a), vec![]);
    assert!(count_events(&events, |e| matches!(e, CoreEvent::AttackStarted { .. })) >= 1);
}

#[test]
fn test_dead_target_clears_attack_order() {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(melee_unit(0, point(0.0, 0.0)));
    let b = sim.spawn_unit(civilian(1, point(5.0, 0.0)));
    sim.issue_attack_order(a, b).unwrap();
    sim.take_events();

    sim.set_current_health(b, Fixed::ZERO).unwrap();
    let events = run_ticks(&mut sim, 5);

    assert_eq!(order_of(&sim, a), Order::None);
    assert_eq!(order_changes(&events, a), vec![(OrderKind::Attack, OrderKind::None)]);
}

#[test]
fn test_issuing_to_unknown_unit_errors() {
    let mut sim = Simulation::new();
    assert!(matches!(
        sim.issue_move_order(42, Vec3Fixed::ZERO),
        Err(GameError::EntityNotFound(42))
    ));
    let a = sim.spawn_unit(melee_unit(0, Vec3Fixed::ZERO));
    assert!(matches!(sim.issue_attack_order(a, a), Err(GameError::InvalidTarget { .. })));
}

#[test]
fn test_attack_order_needs_a_target_with_health() {
    let mut sim = Simulation::new();
    let a = sim.spawn_unit(melee_unit(0, point(0.0, 0.0)));
    let chest = sim.spawn_interactable(point(1.0, 0.0), Interactable::new("chest", fixed(1)));

    assert!(matches!(
        sim.issue_attack_order(a, chest),
        Err(GameError::MissingComponent { entity, component: "health" }) if entity == chest
    ));
    assert!(matches!(
        sim.issue_command(a, CommandTarget::Unit(chest)),
        Err(GameError::MissingComponent { .. })
    ));

    let events = run_ticks(&mut sim, 200);
    assert_eq!(order_of(&sim, a), Order::None);
    assert_eq!(count_events(&events, |e| matches!(e, CoreEvent::AttackStarted { .. })), 0);
    assert!(sim.is_idle());
}
