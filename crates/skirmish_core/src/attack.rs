//! Attack windup and cooldown.
//!
//! An attack is a two-phase timer. [`AttackComponent::try_fire_at`] starts a
//! windup against a target; once the windup reaches the attack point the
//! strike is delivered (melee damage immediately, or a homing projectile)
//! and the cooldown restarts. The windup is consumed whether or not the
//! strike connects.
//!
//! ```
//! use skirmish_core::attack::AttackStats;
//! use skirmish_core::math::Fixed;
//!
//! let stats = AttackStats::default();
//! assert_eq!(stats.attack_interval(), stats.base_attack_time());
//!
//! let hasted = stats.with_attack_speed(Fixed::from_num(200));
//! let expected = Fixed::from_num(0.85);
//! assert!((hasted.attack_interval() - expected).abs() < Fixed::from_num(0.0001));
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::components::EntityId;
use crate::events::{CoreEvent, EventQueue};
use crate::math::{fixed_serde, Fixed, Vec3Fixed};
use crate::projectile::Projectile;
use crate::world::{CombatWorld, WorldView};

/// Attack speed rating that yields exactly one attack per base attack time.
pub const BASELINE_ATTACK_SPEED: i32 = 100;

/// How damage reaches the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackDelivery {
    /// Damage applies the moment the windup completes.
    #[default]
    Melee,
    /// A homing projectile carries the damage.
    Projectile,
}

/// Spawn template for projectile delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectileTemplate {
    /// Distance at which the projectile counts as hitting.
    #[serde(with = "fixed_serde")]
    pub hit_radius: Fixed,
}

impl Default for ProjectileTemplate {
    fn default() -> Self {
        Self {
            hit_radius: Fixed::from_num(0.5),
        }
    }
}

impl ProjectileTemplate {
    /// Template with a hit radius, clamped to non-negative.
    #[must_use]
    pub fn new(hit_radius: Fixed) -> Self {
        Self {
            hit_radius: hit_radius.max(Fixed::ZERO),
        }
    }
}

/// Attack tuning. Setters clamp into valid ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackStats {
    #[serde(with = "fixed_serde")]
    base_attack_time: Fixed,
    #[serde(with = "fixed_serde")]
    attack_speed: Fixed,
    #[serde(with = "fixed_serde")]
    attack_point: Fixed,
    #[serde(with = "fixed_serde")]
    range: Fixed,
    #[serde(with = "fixed_serde")]
    damage: Fixed,
    delivery: AttackDelivery,
    #[serde(with = "fixed_serde")]
    projectile_speed: Fixed,
    projectile: Option<ProjectileTemplate>,
}

impl Default for AttackStats {
    fn default() -> Self {
        Self {
            base_attack_time: Fixed::from_num(1.7),
            attack_speed: Fixed::from_num(BASELINE_ATTACK_SPEED),
            attack_point: Fixed::from_num(0.3),
            range: Fixed::from_num(2.5),
            damage: Fixed::from_num(10),
            delivery: AttackDelivery::Melee,
            projectile_speed: Fixed::from_num(20),
            projectile: None,
        }
    }
}

impl AttackStats {
    fn min_base_attack_time() -> Fixed {
        Fixed::from_num(0.1)
    }

    fn min_range() -> Fixed {
        Fixed::from_num(0.1)
    }

    /// Seconds per attack at baseline speed. Floored at 0.1.
    #[must_use]
    pub fn with_base_attack_time(mut self, value: Fixed) -> Self {
        self.base_attack_time = value.max(Self::min_base_attack_time());
        self
    }

    /// Attack speed rating (100 is baseline). Floored at 1.
    #[must_use]
    pub fn with_attack_speed(mut self, value: Fixed) -> Self {
        self.attack_speed = value.max(Fixed::ONE);
        self
    }

    /// Windup duration in seconds. Non-negative.
    #[must_use]
    pub fn with_attack_point(mut self, value: Fixed) -> Self {
        self.attack_point = value.max(Fixed::ZERO);
        self
    }

    /// Reach in world units. Floored at 0.1.
    #[must_use]
    pub fn with_range(mut self, value: Fixed) -> Self {
        self.range = value.max(Self::min_range());
        self
    }

    /// Damage per strike. Non-negative.
    #[must_use]
    pub fn with_damage(mut self, value: Fixed) -> Self {
        self.damage = value.max(Fixed::ZERO);
        self
    }

    /// Melee or projectile delivery.
    #[must_use]
    pub const fn with_delivery(mut self, delivery: AttackDelivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Projectile travel speed. Floored at 0.1.
    #[must_use]
    pub fn with_projectile_speed(mut self, value: Fixed) -> Self {
        self.projectile_speed = value.max(Fixed::from_num(0.1));
        self
    }

    /// Projectile spawn template.
    #[must_use]
    pub const fn with_projectile(mut self, template: Option<ProjectileTemplate>) -> Self {
        self.projectile = template;
        self
    }

    /// Ranged preset: projectile delivery with a default template.
    #[must_use]
    pub fn ranged(range: Fixed) -> Self {
        Self::default()
            .with_range(range)
            .with_delivery(AttackDelivery::Projectile)
            .with_projectile(Some(ProjectileTemplate::default()))
    }

    /// Seconds per attack at baseline speed.
    #[must_use]
    pub const fn base_attack_time(&self) -> Fixed {
        self.base_attack_time
    }

    /// Attack speed rating.
    #[must_use]
    pub const fn attack_speed(&self) -> Fixed {
        self.attack_speed
    }

    /// Windup duration in seconds.
    #[must_use]
    pub const fn attack_point(&self) -> Fixed {
        self.attack_point
    }

    /// Reach in world units.
    #[must_use]
    pub const fn range(&self) -> Fixed {
        self.range
    }

    /// Damage per strike.
    #[must_use]
    pub const fn damage(&self) -> Fixed {
        self.damage
    }

    /// Delivery kind.
    #[must_use]
    pub const fn delivery(&self) -> AttackDelivery {
        self.delivery
    }

    /// Projectile travel speed.
    #[must_use]
    pub const fn projectile_speed(&self) -> Fixed {
        self.projectile_speed
    }

    /// Projectile spawn template, if configured.
    #[must_use]
    pub const fn projectile(&self) -> Option<ProjectileTemplate> {
        self.projectile
    }

    /// `base_attack_time / (attack_speed / 100)`.
    #[must_use]
    pub fn attack_interval(&self) -> Fixed {
        self.base_attack_time / (self.attack_speed / Fixed::from_num(BASELINE_ATTACK_SPEED))
    }
}

/// Windup progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Windup {
    /// No swing in progress.
    #[default]
    Idle,
    /// Swinging at `target` for `elapsed` seconds.
    Active {
        /// Entity being swung at.
        target: EntityId,
        /// Seconds since the swing began.
        #[serde(with = "fixed_serde")]
        elapsed: Fixed,
    },
}

/// Result of [`AttackComponent::try_fire_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireAttempt {
    /// A windup began.
    Started,
    /// Already swinging.
    InWindup,
    /// Cooldown has not elapsed.
    CoolingDown,
    /// Target is not live.
    InvalidTarget,
}

impl FireAttempt {
    /// Whether a windup began.
    #[must_use]
    pub const fn fired(self) -> bool {
        matches!(self, Self::Started)
    }
}

/// The attacking entity, as seen from inside its own tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attacker {
    /// Attacker id.
    pub id: EntityId,
    /// Attacker position, used as the projectile launch point.
    pub position: Vec3Fixed,
}

/// Timer state machine for a unit that can fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttackComponent {
    stats: AttackStats,
    #[serde(with = "fixed_serde")]
    cooldown_remaining: Fixed,
    windup: Windup,
}

impl AttackComponent {
    /// Ready-to-fire component.
    #[must_use]
    pub fn new(stats: AttackStats) -> Self {
        Self {
            stats,
            cooldown_remaining: Fixed::ZERO,
            windup: Windup::Idle,
        }
    }

    /// Attack tuning.
    #[must_use]
    pub const fn stats(&self) -> &AttackStats {
        &self.stats
    }

    /// Replace tuning. Timers are kept.
    pub fn set_stats(&mut self, stats: AttackStats) {
        self.stats = stats;
    }

    /// Seconds until the next windup may begin.
    #[must_use]
    pub const fn cooldown_remaining(&self) -> Fixed {
        self.cooldown_remaining
    }

    /// Current windup state.
    #[must_use]
    pub const fn windup(&self) -> Windup {
        self.windup
    }

    /// Whether a swing is in progress.
    #[must_use]
    pub const fn is_winding_up(&self) -> bool {
        matches!(self.windup, Windup::Active { .. })
    }

    /// Target of the swing in progress.
    #[must_use]
    pub const fn windup_target(&self) -> Option<EntityId> {
        match self.windup {
            Windup::Active { target, .. } => Some(target),
            Windup::Idle => None,
        }
    }

    /// Whether a new windup could begin now.
    #[must_use]
    pub fn can_fire(&self) -> bool {
        !self.is_winding_up() && self.cooldown_remaining <= Fixed::ZERO
    }

    /// Abandon the swing in progress without delivering it.
    pub fn interrupt(&mut self) {
        self.windup = Windup::Idle;
    }

    /// Begin a windup against `target` if idle and off cooldown.
    pub fn try_fire_at(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        world: &dyn WorldView,
        events: &mut EventQueue,
    ) -> FireAttempt {
        if !world.is_live(target) {
            return FireAttempt::InvalidTarget;
        }
        if self.is_winding_up() {
            return FireAttempt::InWindup;
        }
        if self.cooldown_remaining > Fixed::ZERO {
            return FireAttempt::CoolingDown;
        }

        self.windup = Windup::Active {
            target,
            elapsed: Fixed::ZERO,
        };
        info!(attacker, target, "attack started");

        let multiplier = self.stats.base_attack_time / self.stats.attack_interval();
        events.push(CoreEvent::AttackStarted { attacker, target });
        events.push(CoreEvent::AttackSpeedChanged {
            attacker,
            multiplier,
        });
        FireAttempt::Started
    }

    /// Advance timers by `delta` seconds, delivering a completed windup.
    pub fn tick(
        &mut self,
        attacker: Attacker,
        delta: Fixed,
        world: &mut dyn CombatWorld,
        events: &mut EventQueue,
    ) {
        if self.cooldown_remaining > Fixed::ZERO {
            self.cooldown_remaining = (self.cooldown_remaining - delta).max(Fixed::ZERO);
        }

        let Windup::Active { target, elapsed } = self.windup else {
            return;
        };
        let elapsed = elapsed + delta;
        if elapsed < self.stats.attack_point {
            self.windup = Windup::Active { target, elapsed };
            return;
        }

        self.windup = Windup::Idle;

        if !world.is_live(target) || !world.is_alive(target) {
            debug!(attacker = attacker.id, target, "swing whiffed, target gone");
            return;
        }

        match self.stats.delivery {
            AttackDelivery::Melee => self.fire_melee(attacker.id, target, world, events),
            AttackDelivery::Projectile => self.fire_projectile(attacker, target, world, events),
        }
        events.push(CoreEvent::AttackPointReached {
            attacker: attacker.id,
            target,
        });
        self.cooldown_remaining = self.stats.attack_interval();
    }

    fn fire_melee(
        &self,
        attacker: EntityId,
        target: EntityId,
        world: &mut dyn CombatWorld,
        events: &mut EventQueue,
    ) {
        let damage = self.stats.damage;
        if world
            .apply_damage(target, damage, Some(attacker), events)
            .is_none()
        {
            // validated above; unreachable within a single tick
            error!(attacker, target, "melee target has no health component");
            return;
        }
        info!(attacker, target, damage = %damage, "melee hit");
        events.push(CoreEvent::AttackHit {
            attacker,
            target,
            damage,
            delivery: AttackDelivery::Melee,
        });
    }

    fn fire_projectile(
        &self,
        attacker: Attacker,
        target: EntityId,
        world: &mut dyn CombatWorld,
        events: &mut EventQueue,
    ) {
        let Some(template) = self.stats.projectile else {
            error!(
                attacker = attacker.id,
                "projectile delivery configured without a projectile template"
            );
            return;
        };
        let Some(target_position) = world.position(target) else {
            debug!(attacker = attacker.id, target, "projectile target has no body");
            return;
        };

        let projectile = Projectile::launch(
            Some(attacker.id),
            attacker.position,
            target,
            target_position,
            self.stats.damage,
            self.stats.projectile_speed,
            template.hit_radius,
        );
        let projectile = world.spawn_projectile(projectile);
        info!(attacker = attacker.id, target, projectile, "projectile fired");

        events.push(CoreEvent::ProjectileSpawned {
            projectile,
            attacker: attacker.id,
            target,
        });
        events.push(CoreEvent::AttackHit {
            attacker: attacker.id,
            target,
            damage: self.stats.damage,
            delivery: AttackDelivery::Projectile,
        });
    }
}
