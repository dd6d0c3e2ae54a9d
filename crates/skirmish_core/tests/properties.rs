//! Property tests for health clamping, attack timing and determinism.

use proptest::prelude::*;
use skirmish_core::prelude::*;
use skirmish_test_utils::determinism::{strategies::*, verify_simulation_determinism};
use skirmish_test_utils::fixtures::{melee_unit, run_ticks};

proptest! {
    #[test]
    fn prop_health_stays_in_bounds(max in arb_max_health(), hits in prop::collection::vec(arb_amount(), 1..20)) {
        let mut health = HealthComponent::new(max);
        let mut events = EventQueue::new();
        let mut deaths = 0;

        for (i, amount) in hits.into_iter().enumerate() {
            if i % 3 == 2 {
                health.heal(1, amount, &mut events);
            } else if health.apply_damage(1, amount, None, &mut events) {
                deaths += 1;
            }
            prop_assert!(health.current() >= Fixed::ZERO);
            prop_assert!(health.current() <= health.max());
        }

        let died_events = events
            .as_slice()
            .iter()
            .filter(|e| matches!(e, CoreEvent::Died { .. }))
            .count();
        prop_assert_eq!(died_events, deaths);
    }

    #[test]
    fn prop_damage_then_heal_restores(max in arb_max_health(), fraction in 0u32..100) {
        let mut health = HealthComponent::new(max);
        let mut events = EventQueue::new();
        let amount = max * Fixed::from_num(fraction) / Fixed::from_num(100);

        let killed = health.apply_damage(1, amount, None, &mut events);
        prop_assert!(!killed || amount >= max);
        health.heal(1, amount, &mut events);
        prop_assert_eq!(health.current(), max);
    }

    #[test]
    fn prop_attack_stats_clamped(stats in arb_attack_stats()) {
        prop_assert!(stats.base_attack_time() >= Fixed::from_num(0.1));
        prop_assert!(stats.attack_speed() >= Fixed::from_num(1));
        prop_assert!(stats.range() >= Fixed::from_num(0.1));
        prop_assert!(stats.damage() >= Fixed::ZERO);
        prop_assert!(stats.attack_interval() > Fixed::ZERO);
    }

    #[test]
    fn prop_move_orders_deterministic(start in arb_point(20), goal in arb_point(20)) {
        let setup = || {
            let mut sim = Simulation::new();
            let unit = sim.spawn_unit(melee_unit(0, start));
            let _ = sim.issue_move_order(unit, goal);
            sim
        };
        prop_assert!(verify_simulation_determinism(setup, 80));
    }

    #[test]
    fn prop_skirmish_deterministic(a in arb_point(10), b in arb_point(10), stats in arb_attack_stats()) {
        let setup = || {
            let mut sim = Simulation::new();
            let first = sim.spawn_unit(UnitSpawnParams { attack: Some(stats), ..melee_unit(0, a) });
            let second = sim.spawn_unit(melee_unit(1, b));
            let _ = sim.issue_attack_order(first, second);
            let _ = sim.issue_attack_order(second, first);
            sim
        };
        prop_assert!(verify_simulation_determinism(&setup, 120));

        let mut sim = setup();
        let events = run_ticks(&mut sim, 120);
        for entity in [1, 2] {
            let deaths = events
                .iter()
                .filter(|e| matches!(e, CoreEvent::Died { entity: id, .. } if *id == entity))
                .count();
            prop_assert!(deaths <= 1);
        }
    }
}
