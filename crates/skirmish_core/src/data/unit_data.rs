//! Unit data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::attack::{AttackDelivery, AttackStats, ProjectileTemplate};
use crate::math::{fixed_serde, option_fixed_serde, Fixed, Vec3Fixed};
use crate::movement::MovementComponent;
use crate::resource_pool::ResourcePool;
use crate::simulation::{NavigationChoice, UnitSpawnParams};
use crate::unit::UnitTuning;

/// Attack tuning as written in data files.
///
/// Missing fields take the [`AttackStats`] defaults; out-of-range values are
/// clamped when converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackDefinition {
    /// Seconds per attack at attack speed 100.
    #[serde(default = "default_base_attack_time", with = "fixed_serde")]
    pub base_attack_time: Fixed,

    /// Attack speed rating; 100 is baseline.
    #[serde(default = "default_attack_speed", with = "fixed_serde")]
    pub attack_speed: Fixed,

    /// Windup seconds before the strike lands.
    #[serde(default = "default_attack_point", with = "fixed_serde")]
    pub attack_point: Fixed,

    /// Attack range in world units.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,

    /// Damage per strike.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,

    /// Melee or projectile.
    #[serde(default)]
    pub delivery: AttackDelivery,

    /// Projectile speed in world units per second.
    #[serde(default = "default_projectile_speed", with = "fixed_serde")]
    pub projectile_speed: Fixed,

    /// Projectile hit radius. Projectile delivery without one is a
    /// misconfiguration that never fires.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "option_fixed_serde")]
    pub projectile_hit_radius: Option<Fixed>,
}

fn default_base_attack_time() -> Fixed {
    AttackStats::default().base_attack_time()
}

fn default_attack_speed() -> Fixed {
    AttackStats::default().attack_speed()
}

fn default_attack_point() -> Fixed {
    AttackStats::default().attack_point()
}

fn default_projectile_speed() -> Fixed {
    AttackStats::default().projectile_speed()
}

impl AttackDefinition {
    /// Runtime stats, clamped into their valid ranges.
    #[must_use]
    pub fn to_stats(&self) -> AttackStats {
        AttackStats::default()
            .with_base_attack_time(self.base_attack_time)
            .with_attack_speed(self.attack_speed)
            .with_attack_point(self.attack_point)
            .with_range(self.range)
            .with_damage(self.damage)
            .with_delivery(self.delivery)
            .with_projectile_speed(self.projectile_speed)
            .with_projectile(self.projectile_hit_radius.map(ProjectileTemplate::new))
    }
}

/// A resource pool as written in data files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDefinition {
    /// Pool identifier, e.g. `"mana"`.
    pub id: String,
    /// Maximum (and starting) value.
    #[serde(with = "fixed_serde")]
    pub max: Fixed,
}

/// Which navigation provider units of this type use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NavigationKind {
    /// Straight-line steering.
    #[default]
    Direct,
    /// A* over the scenario's nav grid.
    Grid,
    /// No navigation; the unit never acts.
    None,
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitDefinition(
///     id: "archer",
///     name: "Archer",
///     max_health: 80.0,
///     speed: 4.5,
///     attack: Some(AttackDefinition(
///         range: 8.0,
///         damage: 12.0,
///         delivery: projectile,
///         projectile_hit_radius: Some(0.5),
///     )),
///     movement_component: true,
///     resource_pools: [PoolDefinition(id: "mana", max: 50.0)],
///     tags: ["ranged"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Unique string identifier for this unit type.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Maximum health points.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,

    /// Movement speed in world units per second.
    #[serde(default = "default_speed", with = "fixed_serde")]
    pub speed: Fixed,

    /// Turn rate for presentation.
    #[serde(default = "default_rotation_speed", with = "fixed_serde")]
    pub rotation_speed: Fixed,

    /// Attack range used when the unit cannot fight.
    #[serde(default = "default_auto_attack_range", with = "fixed_serde")]
    pub auto_attack_range: Fixed,

    /// Hysteresis band beyond attack range.
    #[serde(default = "default_attack_buffer_range", with = "fixed_serde")]
    pub attack_buffer_range: Fixed,

    /// Attack tuning (None for non-combat units).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<AttackDefinition>,

    /// Whether the unit gets a separate movement component.
    #[serde(default)]
    pub movement_component: bool,

    /// Navigation provider kind.
    #[serde(default)]
    pub navigation: NavigationKind,

    /// Ability resource pools.
    #[serde(default)]
    pub resource_pools: Vec<PoolDefinition>,

    /// Tags for categorization (e.g., "melee", "ranged").
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_speed() -> Fixed {
    UnitTuning::default().speed
}

fn default_rotation_speed() -> Fixed {
    UnitTuning::default().rotation_speed
}

fn default_auto_attack_range() -> Fixed {
    UnitTuning::default().auto_attack_range
}

fn default_attack_buffer_range() -> Fixed {
    UnitTuning::default().attack_buffer_range
}

impl UnitDefinition {
    /// Check if this unit has the specified tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Check if this unit can engage in combat.
    #[must_use]
    pub fn is_combatant(&self) -> bool {
        self.attack.is_some()
    }

    /// Movement and engagement tuning, clamped.
    #[must_use]
    pub fn tuning(&self) -> UnitTuning {
        UnitTuning::default()
            .with_speed(self.speed)
            .with_rotation_speed(self.rotation_speed)
            .with_auto_attack_range(self.auto_attack_range)
            .with_attack_buffer_range(self.attack_buffer_range)
    }

    /// Spawn parameters for one unit of this type.
    #[must_use]
    pub fn to_spawn_params(&self, faction_id: i32, position: Vec3Fixed, label: Option<String>) -> UnitSpawnParams {
        let navigation = match self.navigation {
            NavigationKind::Direct => NavigationChoice::Direct,
            NavigationKind::Grid => NavigationChoice::Grid,
            NavigationKind::None => NavigationChoice::Unresolved,
        };
        UnitSpawnParams {
            label,
            faction_id,
            position,
            tuning: self.tuning(),
            max_health: self.max_health,
            attack: self.attack.as_ref().map(AttackDefinition::to_stats),
            movement: self
                .movement_component
                .then(|| MovementComponent::new(self.speed, self.rotation_speed)),
            resource_pools: self
                .resource_pools
                .iter()
                .map(|p| ResourcePool::new(p.id.clone(), p.max))
                .collect(),
            navigation,
        }
    }
}
