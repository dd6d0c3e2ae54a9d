//! Core simulation loop.
//!
//! The simulation runs at a fixed tick rate and owns every entity. Each tick
//! it evaluates unit orders, advances attack timers, and moves projectiles,
//! publishing [`CoreEvent`]s in the order they happen.
//!
//! # Determinism
//!
//! All operations in this module are fully deterministic:
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - No randomness
//! - Consistent iteration order (sorted entity IDs)
//!
//! # Example
//!
//! ```
//! use skirmish_core::math::{Fixed, Vec3Fixed};
//! use skirmish_core::simulation::{Simulation, UnitSpawnParams};
//!
//! let mut sim = Simulation::new();
//! let unit = sim.spawn_unit(UnitSpawnParams::default());
//!
//! sim.issue_move_order(unit, Vec3Fixed::ground(Fixed::from_num(10), Fixed::ZERO))
//!     .unwrap();
//! let events = sim.tick();
//! assert!(!events.is_empty());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attack::{AttackComponent, AttackStats, Attacker};
use crate::components::{Body, EntityId, SETTLE_TICKS};
use crate::error::{GameError, Result};
use crate::events::{CoreEvent, EventQueue};
use crate::health::{HealthComponent, DEFAULT_MAX_HEALTH};
use crate::interactable::Interactable;
use crate::math::{fixed_serde, Fixed, Vec3Fixed};
use crate::movement::MovementComponent;
use crate::navigation::{DirectAgent, GridAgent, NavigationProvider};
use crate::pathfinding::NavGrid;
use crate::projectile::Projectile;
use crate::resource_pool::ResourcePool;
use crate::unit::{OrderKind, Unit, UnitTick, UnitTuning};
use crate::world::{CombatWorld, WorldView};

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 20;

/// Duration of one tick in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

// ============================================================================
// Configuration
// ============================================================================

/// Simulation-wide settings fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seconds advanced per tick.
    #[serde(with = "fixed_serde")]
    pub tick_delta: Fixed,
    /// Ticks a unit waits after attachment before using navigation.
    pub settle_ticks: u32,
    /// When set, [`Simulation::tick`] does nothing.
    pub is_editor_mode: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_delta: Fixed::from_num(1) / Fixed::from_num(TICK_RATE),
            settle_ticks: SETTLE_TICKS,
            is_editor_mode: false,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// An entity with optional components.
///
/// Only components that are `Some` are active for this entity. A detached
/// entity stays in storage but is skipped by the tick and fails every
/// liveness query.
#[derive(Debug)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// Optional human-readable name, used by scenario scripts.
    pub label: Option<String>,
    /// Whether the entity takes part in the live simulation.
    pub attached: bool,
    /// Spatial representation.
    pub body: Option<Body>,
    /// Order state machine for controllable units.
    pub unit: Option<Unit>,
    /// Health for damageable entities.
    pub health: Option<HealthComponent>,
    /// Attack timers for units that can fight.
    pub attack: Option<AttackComponent>,
    /// Locomotion; removed when the owner dies.
    pub movement: Option<MovementComponent>,
    /// Projectile data for projectile entities.
    pub projectile: Option<Projectile>,
    /// Usable object data.
    pub interactable: Option<Interactable>,
    /// Ability resource pools.
    pub resource_pools: Vec<ResourcePool>,
}

impl Entity {
    /// Create a new attached entity with the given ID and no components.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            label: None,
            attached: true,
            body: None,
            unit: None,
            health: None,
            attack: None,
            movement: None,
            projectile: None,
            interactable: None,
            resource_pools: Vec::new(),
        }
    }

    /// Pool with the given id.
    #[must_use]
    pub fn resource_pool(&self, pool_id: &str) -> Option<&ResourcePool> {
        self.resource_pools.iter().find(|p| p.pool_id() == pool_id)
    }

    fn resource_pool_mut(&mut self, pool_id: &str) -> Option<&mut ResourcePool> {
        self.resource_pools.iter_mut().find(|p| p.pool_id() == pool_id)
    }

    fn is_dead(&self) -> bool {
        self.health.as_ref().is_some_and(HealthComponent::is_dead)
    }
}

/// Storage for all entities in the simulation.
///
/// Uses a `HashMap` for O(1) entity lookup by ID, with deterministic
/// iteration via sorted keys when processing.
#[derive(Debug)]
pub struct EntityStorage {
    entities: HashMap<EntityId, Entity>,
    next_id: EntityId,
}

impl Default for EntityStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new entity and return its ID.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    /// Put back an entity previously taken out with [`Self::remove`],
    /// keeping its ID.
    pub fn restore(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get sorted entity IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all entities (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Entity)> {
        self.entities.iter()
    }
}

// ============================================================================
// Spawning
// ============================================================================

/// Which navigation provider a spawned unit gets.
#[derive(Debug, Default)]
pub enum NavigationChoice {
    /// Straight-line steering.
    #[default]
    Direct,
    /// A* over the simulation's nav grid (direct if none is configured).
    Grid,
    /// A caller-supplied provider.
    Custom(Box<dyn NavigationProvider>),
    /// No provider; the unit never acts.
    Unresolved,
}

/// Parameters for spawning a unit.
#[derive(Debug)]
pub struct UnitSpawnParams {
    /// Optional label for lookups.
    pub label: Option<String>,
    /// Faction id.
    pub faction_id: i32,
    /// Initial position.
    pub position: Vec3Fixed,
    /// Movement and engagement tuning.
    pub tuning: UnitTuning,
    /// Maximum health (the unit starts at full health).
    pub max_health: Fixed,
    /// Attack stats; `None` for units that cannot fight.
    pub attack: Option<AttackStats>,
    /// Movement component; `None` uses the unit's built-in steering.
    pub movement: Option<MovementComponent>,
    /// Ability resource pools.
    pub resource_pools: Vec<ResourcePool>,
    /// Navigation provider.
    pub navigation: NavigationChoice,
}

impl Default for UnitSpawnParams {
    fn default() -> Self {
        Self {
            label: None,
            faction_id: 0,
            position: Vec3Fixed::ZERO,
            tuning: UnitTuning::default(),
            max_health: Fixed::from_num(DEFAULT_MAX_HEALTH),
            attack: Some(AttackStats::default()),
            movement: None,
            resource_pools: Vec::new(),
            navigation: NavigationChoice::Direct,
        }
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// The core game simulation.
///
/// # Tick Order
///
/// Each tick, for every live entity in ascending ID order:
/// 1. **Units** - re-evaluate the order, steer or hold, then advance the
///    attack component (delivering completed windups)
/// 2. **Projectiles** - home, hit, or expire
///
/// Damage is applied immediately, so a unit killed early in a tick is
/// already dead when later entities look at it.
#[derive(Debug)]
pub struct Simulation {
    tick: u64,
    config: SimulationConfig,
    entities: EntityStorage,
    nav_grid: Option<Arc<NavGrid>>,
    events: EventQueue,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// Create a new empty simulation with default settings.
    ///
    /// # Example
    ///
    /// ```
    /// use skirmish_core::simulation::Simulation;
    ///
    /// let sim = Simulation::new();
    /// assert_eq!(sim.get_tick(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    /// Create a new empty simulation.
    #[must_use]
    pub fn with_config(config: SimulationConfig) -> Self {
        Self {
            tick: 0,
            config,
            entities: EntityStorage::new(),
            nav_grid: None,
            events: EventQueue::new(),
        }
    }

    /// Share a navigation grid with units spawned with [`NavigationChoice::Grid`].
    #[must_use]
    pub fn with_nav_grid(mut self, grid: NavGrid) -> Self {
        self.nav_grid = Some(Arc::new(grid));
        self
    }

    /// Get the current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Settings.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Navigation grid, if configured.
    #[must_use]
    pub fn nav_grid(&self) -> Option<&NavGrid> {
        self.nav_grid.as_deref()
    }

    /// Get a reference to the entity storage.
    #[must_use]
    pub fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Lowest-ID entity carrying `label`.
    #[must_use]
    pub fn find_by_label(&self, label: &str) -> Option<EntityId> {
        self.entities
            .sorted_ids()
            .into_iter()
            .find(|id| self.entities.get(*id).and_then(|e| e.label.as_deref()) == Some(label))
    }

    /// Take events published outside a tick (order issuance, direct damage).
    pub fn take_events(&mut self) -> Vec<CoreEvent> {
        self.events.drain()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Spawn a unit and return its ID.
    ///
    /// The unit's navigation target starts at its spawn position.
    pub fn spawn_unit(&mut self, params: UnitSpawnParams) -> EntityId {
        let navigation = self.resolve_navigation(params.navigation);
        let mut unit = Unit::new(params.faction_id, params.tuning, navigation);
        unit.set_desired_location(params.position);

        let mut entity = Entity::new(0);
        entity.label = params.label;
        entity.body = Some(Body::at(params.position));
        entity.unit = Some(unit);
        entity.health = Some(HealthComponent::new(params.max_health));
        entity.attack = params.attack.map(AttackComponent::new);
        entity.movement = params.movement;
        entity.resource_pools = params.resource_pools;

        let id = self.entities.insert(entity);
        info!(entity = id, faction = params.faction_id, "unit spawned");
        id
    }

    /// Place an interactable and return its ID.
    pub fn spawn_interactable(&mut self, position: Vec3Fixed, interactable: Interactable) -> EntityId {
        let mut entity = Entity::new(0);
        entity.label = Some(interactable.name().to_owned());
        entity.body = Some(Body::at(position));
        entity.interactable = Some(interactable);
        self.entities.insert(entity)
    }

    fn resolve_navigation(&self, choice: NavigationChoice) -> Option<Box<dyn NavigationProvider>> {
        match choice {
            NavigationChoice::Direct => Some(Box::new(DirectAgent::new())),
            NavigationChoice::Grid => match &self.nav_grid {
                Some(grid) => Some(Box::new(GridAgent::new(Arc::clone(grid)))),
                None => {
                    warn!("grid navigation requested without a nav grid, steering directly");
                    Some(Box::new(DirectAgent::new()))
                }
            },
            NavigationChoice::Custom(provider) => Some(provider),
            NavigationChoice::Unresolved => None,
        }
    }

    /// Destroy an entity.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the entity doesn't exist.
    pub fn despawn_entity(&mut self, id: EntityId) -> Result<()> {
        if self.entities.remove(id).is_some() {
            Ok(())
        } else {
            Err(GameError::EntityNotFound(id))
        }
    }

    /// Take an entity out of the live simulation without destroying it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the entity doesn't exist.
    pub fn detach_entity(&mut self, id: EntityId) -> Result<()> {
        let entity = self.entity_mut(id)?;
        entity.attached = false;
        debug!(entity = id, "entity detached");
        Ok(())
    }

    /// Put a detached entity back. Its unit and movement component settle
    /// again before acting.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the entity doesn't exist.
    pub fn attach_entity(&mut self, id: EntityId) -> Result<()> {
        let entity = self.entity_mut(id)?;
        entity.attached = true;
        if let Some(unit) = entity.unit.as_mut() {
            unit.reset_activation();
        }
        if let Some(movement) = entity.movement.as_mut() {
            movement.reset_activation();
        }
        debug!(entity = id, "entity attached");
        Ok(())
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        self.entities.get_mut(id).ok_or(GameError::EntityNotFound(id))
    }

    /// An entity together with the buffered event queue.
    pub(crate) fn entity_and_events(&mut self, id: EntityId) -> Result<(&mut Entity, &mut EventQueue)> {
        let entity = self.entities.get_mut(id).ok_or(GameError::EntityNotFound(id))?;
        Ok((entity, &mut self.events))
    }

    // ------------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------------

    fn unit_mut(&mut self, id: EntityId) -> Result<(&mut Unit, &mut EventQueue)> {
        let entity = self.entities.get_mut(id).ok_or(GameError::EntityNotFound(id))?;
        let unit = entity.unit.as_mut().ok_or(GameError::MissingComponent {
            entity: id,
            component: "unit",
        })?;
        Ok((unit, &mut self.events))
    }

    /// Order a unit to walk to a point.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] or [`GameError::MissingComponent`]
    /// if `unit` is not a unit.
    pub fn issue_move_order(&mut self, unit: EntityId, point: Vec3Fixed) -> Result<()> {
        let (u, events) = self.unit_mut(unit)?;
        u.issue_move_order(unit, point, events);
        Ok(())
    }

    /// Order a unit to chase and fight another unit.
    ///
    /// The target may already be dead; the unit then goes idle on its next
    /// tick.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTarget`] when a unit targets itself,
    /// [`GameError::MissingComponent`] when the target has no health to take,
    /// and [`GameError::EntityNotFound`] for unknown IDs.
    pub fn issue_attack_order(&mut self, unit: EntityId, target: EntityId) -> Result<()> {
        if unit == target {
            return Err(GameError::InvalidTarget {
                entity: unit,
                target,
                reason: "a unit cannot attack itself",
            });
        }
        let target_entity = self.entities.get(target).ok_or(GameError::EntityNotFound(target))?;
        if target_entity.health.is_none() {
            return Err(GameError::MissingComponent {
                entity: target,
                component: "health",
            });
        }
        let target_position = self.position(target);
        let (u, events) = self.unit_mut(unit)?;
        u.issue_attack_order(unit, target, target_position, events);
        Ok(())
    }

    /// Order a unit to walk to an interactable.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MissingComponent`] if `target` is not an
    /// interactable, or if `unit` is not a unit.
    pub fn issue_interact_order(&mut self, unit: EntityId, target: EntityId) -> Result<()> {
        let entity = self.entities.get(target).ok_or(GameError::EntityNotFound(target))?;
        if entity.interactable.is_none() {
            return Err(GameError::MissingComponent {
                entity: target,
                component: "interactable",
            });
        }
        let target_position = entity.body.map(|b| b.position);
        let (u, events) = self.unit_mut(unit)?;
        u.issue_interact_order(unit, target, target_position, events);
        Ok(())
    }

    /// Make a unit idle.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] or [`GameError::MissingComponent`]
    /// if `unit` is not a unit.
    pub fn stop_order(&mut self, unit: EntityId) -> Result<()> {
        let (u, events) = self.unit_mut(unit)?;
        u.stop_order(unit, events);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Health and pools
    // ------------------------------------------------------------------------

    fn health_mut(&mut self, id: EntityId) -> Result<(&mut HealthComponent, &mut EventQueue)> {
        let entity = self.entities.get_mut(id).ok_or(GameError::EntityNotFound(id))?;
        let health = entity.health.as_mut().ok_or(GameError::MissingComponent {
            entity: id,
            component: "health",
        })?;
        Ok((health, &mut self.events))
    }

    /// Damage an entity directly. Returns whether this hit killed it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] or [`GameError::MissingComponent`]
    /// if the entity has no health.
    pub fn apply_damage(&mut self, target: EntityId, amount: Fixed, source: Option<EntityId>) -> Result<bool> {
        let (health, events) = self.health_mut(target)?;
        let killed = health.apply_damage(target, amount, source, events);
        if killed {
            self.handle_death_buffered(target);
        }
        Ok(killed)
    }

    /// Heal an entity.
    ///
    /// # Errors
    ///
    /// Same as [`apply_damage`](Self::apply_damage).
    pub fn heal(&mut self, target: EntityId, amount: Fixed) -> Result<()> {
        let (health, events) = self.health_mut(target)?;
        health.heal(target, amount, events);
        Ok(())
    }

    /// Change an entity's maximum health. Returns whether this killed it.
    ///
    /// # Errors
    ///
    /// Same as [`apply_damage`](Self::apply_damage).
    pub fn set_max_health(&mut self, target: EntityId, value: Fixed) -> Result<bool> {
        let (health, events) = self.health_mut(target)?;
        let killed = health.set_max_health(target, value, events);
        if killed {
            self.handle_death_buffered(target);
        }
        Ok(killed)
    }

    /// Overwrite an entity's current health. Returns whether this killed it.
    ///
    /// # Errors
    ///
    /// Same as [`apply_damage`](Self::apply_damage).
    pub fn set_current_health(&mut self, target: EntityId, value: Fixed) -> Result<bool> {
        let (health, events) = self.health_mut(target)?;
        let killed = health.set_current_health(target, value, events);
        if killed {
            self.handle_death_buffered(target);
        }
        Ok(killed)
    }

    fn pool_mut(&mut self, id: EntityId, pool_id: &str) -> Result<(&mut ResourcePool, &mut EventQueue)> {
        let entity = self.entities.get_mut(id).ok_or(GameError::EntityNotFound(id))?;
        let pool = entity.resource_pool_mut(pool_id).ok_or(GameError::MissingComponent {
            entity: id,
            component: "resource_pool",
        })?;
        Ok((pool, &mut self.events))
    }

    /// Spend from a named pool. Returns `false` if there is not enough.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MissingComponent`] if the entity has no such pool.
    pub fn spend_resource(&mut self, id: EntityId, pool_id: &str, amount: Fixed) -> Result<bool> {
        let (pool, events) = self.pool_mut(id, pool_id)?;
        Ok(pool.try_spend(id, amount, events))
    }

    /// Refill a named pool.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MissingComponent`] if the entity has no such pool.
    pub fn restore_resource(&mut self, id: EntityId, pool_id: &str, amount: Fixed) -> Result<()> {
        let (pool, events) = self.pool_mut(id, pool_id)?;
        pool.restore(id, amount, events);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Death
    // ------------------------------------------------------------------------

    fn handle_death_buffered(&mut self, id: EntityId) {
        let mut events = std::mem::take(&mut self.events);
        self.handle_death(id, &mut events);
        self.events = events;
    }

    /// Consequences of a death: no locomotion, no order, no swing.
    fn handle_death(&mut self, id: EntityId, events: &mut EventQueue) {
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        if entity.movement.take().is_some() {
            debug!(entity = id, "movement removed on death");
        }
        if let Some(attack) = entity.attack.as_mut() {
            attack.interrupt();
        }
        if let Some(unit) = entity.unit.as_mut() {
            unit.stop_order(id, events);
        }
        if let Some(body) = entity.body.as_mut() {
            body.stop_horizontal();
        }
    }

    fn damage_entity(
        &mut self,
        target: EntityId,
        amount: Fixed,
        source: Option<EntityId>,
        events: &mut EventQueue,
    ) -> Option<bool> {
        let health = self.entities.get_mut(target)?.health.as_mut()?;
        let killed = health.apply_damage(target, amount, source, events);
        if killed {
            self.handle_death(target, events);
        }
        Some(killed)
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Advance the simulation by one tick.
    ///
    /// Returns every event published since the previous call, including
    /// those raised by order issuance in between. In editor mode nothing
    /// runs and nothing is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use skirmish_core::simulation::Simulation;
    ///
    /// let mut sim = Simulation::new();
    /// let events = sim.tick();
    /// assert!(events.is_empty());
    /// assert_eq!(sim.get_tick(), 1);
    /// ```
    pub fn tick(&mut self) -> Vec<CoreEvent> {
        if self.config.is_editor_mode {
            return Vec::new();
        }

        let mut events = std::mem::take(&mut self.events);
        let entity_ids = self.entities.sorted_ids();

        for &id in &entity_ids {
            self.tick_unit(id, &mut events);
        }
        for &id in &entity_ids {
            self.tick_projectile(id, &mut events);
        }

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events.into_vec()
    }

    fn tick_unit(&mut self, id: EntityId, events: &mut EventQueue) {
        let eligible = self
            .entities
            .get(id)
            .is_some_and(|e| e.attached && e.unit.is_some() && e.body.is_some() && !e.is_dead());
        if !eligible {
            return;
        }
        let Some(mut entity) = self.entities.remove(id) else {
            return;
        };

        let delta = self.config.tick_delta;
        let Entity {
            unit,
            body,
            attack,
            movement,
            ..
        } = &mut entity;

        if let (Some(unit), Some(body)) = (unit.as_mut(), body.as_mut()) {
            unit.update(UnitTick {
                id,
                delta,
                settle_ticks: self.config.settle_ticks,
                body,
                attack: attack.as_mut(),
                movement: movement.as_mut(),
                world: &*self,
                events: &mut *events,
            });
        }
        if let (Some(attack), Some(body)) = (attack.as_mut(), body.as_ref()) {
            let attacker = Attacker {
                id,
                position: body.position,
            };
            attack.tick(attacker, delta, &mut *self, events);
        }

        self.entities.restore(entity);
    }

    fn tick_projectile(&mut self, id: EntityId, events: &mut EventQueue) {
        let eligible = self
            .entities
            .get(id)
            .is_some_and(|e| e.attached && e.projectile.is_some());
        if !eligible {
            return;
        }
        let Some(mut entity) = self.entities.remove(id) else {
            return;
        };
        let Some(mut projectile) = entity.projectile.take() else {
            self.entities.restore(entity);
            return;
        };

        let step = projectile.advance(id, self.config.tick_delta, &mut *self, events);
        if step.is_finished() {
            debug!(projectile = id, ?step, "projectile destroyed");
            return;
        }

        if let Some(body) = entity.body.as_mut() {
            body.position = projectile.position();
            body.face(projectile.direction());
        }
        entity.projectile = Some(projectile);
        self.entities.restore(entity);
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Living, attached units per faction.
    #[must_use]
    pub fn alive_units_by_faction(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for (_, entity) in self.entities.iter() {
            if let Some(unit) = entity.unit.as_ref() {
                if entity.attached && !entity.is_dead() {
                    *counts.entry(unit.faction_id()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Whether nothing will change without new orders: no projectile in
    /// flight, and every live unit settled, still, not swinging, and not
    /// attacking.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.entities.iter().all(|(_, entity)| {
            if !entity.attached {
                return true;
            }
            if entity.projectile.is_some() {
                return false;
            }
            let Some(unit) = entity.unit.as_ref() else {
                return true;
            };
            if entity.is_dead() {
                return true;
            }
            let settled = unit.navigation().is_none() || unit.activation().is_ready();
            let still = entity.body.map_or(true, |b| !b.is_moving());
            let swinging = entity.attack.is_some_and(|a| a.is_winding_up());
            settled && still && !swinging && unit.order().kind() != OrderKind::Attack
        })
    }

    /// Compute a deterministic hash of the simulation state.
    ///
    /// Two simulations with identical state produce the same hash.
    /// Useful for detecting desyncs and verifying determinism.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);

        let ids = self.entities.sorted_ids();
        ids.len().hash(&mut hasher);

        for id in ids {
            if let Some(entity) = self.entities.get(id) {
                id.hash(&mut hasher);
                entity.attached.hash(&mut hasher);
                entity.body.hash(&mut hasher);
                entity.health.hash(&mut hasher);
                entity.attack.hash(&mut hasher);
                entity.movement.hash(&mut hasher);
                entity.projectile.hash(&mut hasher);
                entity.resource_pools.hash(&mut hasher);

                if let Some(unit) = entity.unit.as_ref() {
                    unit.order().hash(&mut hasher);
                    unit.activation().hash(&mut hasher);
                    unit.desired_location().hash(&mut hasher);
                }
            }
        }

        hasher.finish()
    }
}

// ============================================================================
// World access
// ============================================================================

impl WorldView for Simulation {
    fn is_live(&self, id: EntityId) -> bool {
        self.entities.get(id).is_some_and(|e| e.attached)
    }

    fn position(&self, id: EntityId) -> Option<Vec3Fixed> {
        let entity = self.entities.get(id).filter(|e| e.attached)?;
        entity.body.map(|b| b.position)
    }

    fn health(&self, id: EntityId) -> Option<&HealthComponent> {
        self.entities.get(id).filter(|e| e.attached)?.health.as_ref()
    }

    fn interactable_position(&self, id: EntityId) -> Option<Vec3Fixed> {
        let entity = self.entities.get(id).filter(|e| e.attached)?;
        entity.interactable.as_ref()?;
        entity.body.map(|b| b.position)
    }
}

impl CombatWorld for Simulation {
    fn apply_damage(
        &mut self,
        target: EntityId,
        amount: Fixed,
        source: Option<EntityId>,
        events: &mut EventQueue,
    ) -> Option<bool> {
        if !self.is_live(target) {
            return None;
        }
        self.damage_entity(target, amount, source, events)
    }

    fn spawn_projectile(&mut self, projectile: Projectile) -> EntityId {
        let mut entity = Entity::new(0);
        let mut body = Body::at(projectile.position());
        body.face(projectile.direction());
        entity.body = Some(body);
        entity.projectile = Some(projectile);
        self.entities.insert(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::AttackDelivery;
    use crate::unit::Order;

    fn point(x: f64, z: f64) -> Vec3Fixed {
        Vec3Fixed::ground(Fixed::from_num(x), Fixed::from_num(z))
    }

    fn spawn(sim: &mut Simulation, faction_id: i32, position: Vec3Fixed) -> EntityId {
        sim.spawn_unit(UnitSpawnParams {
            faction_id,
            position,
            ..Default::default()
        })
    }

    fn run(sim: &mut Simulation, ticks: u32) -> Vec<CoreEvent> {
        let mut all = Vec::new();
        for _ in 0..ticks {
            all.extend(sim.tick());
        }
        all
    }

    #[test]
    fn test_new_simulation() {
        let sim = Simulation::new();
        assert_eq!(sim.get_tick(), 0);
        assert!(sim.entities().is_empty());
        assert_eq!(sim.config().settle_ticks, SETTLE_TICKS);
    }

    #[test]
    fn test_spawn_and_despawn() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        let b = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        assert_eq!((a, b), (1, 2));

        assert!(sim.despawn_entity(a).is_ok());
        assert!(matches!(sim.despawn_entity(a), Err(GameError::EntityNotFound(1))));
        assert_eq!(sim.entities().len(), 1);
    }

    #[test]
    fn test_self_attack_rejected() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        assert!(matches!(
            sim.issue_attack_order(a, a),
            Err(GameError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_order_events_returned_with_next_tick() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        sim.issue_move_order(a, point(5.0, 0.0)).unwrap();

        let events = sim.tick();
        assert!(matches!(
            events[0],
            CoreEvent::OrderChanged {
                current: OrderKind::Move,
                ..
            }
        ));
    }

    #[test]
    fn test_move_reaches_destination() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        sim.issue_move_order(a, point(5.0, 0.0)).unwrap();

        run(&mut sim, 60);
        let body = sim.get_entity(a).unwrap().body.unwrap();
        assert!(body.position.horizontal_distance(point(5.0, 0.0)) < Fixed::from_num(0.1));
        assert!(sim.is_idle());
    }

    #[test]
    fn test_melee_duel_kills_and_stops_attacker() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        let b = spawn(&mut sim, 1, point(2.0, 0.0));
        sim.set_max_health(b, Fixed::from_num(20)).unwrap();
        sim.issue_attack_order(a, b).unwrap();

        let events = run(&mut sim, 100);
        let deaths: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, CoreEvent::Died { entity, .. } if *entity == b))
            .collect();
        assert_eq!(deaths.len(), 1);
        assert_eq!(
            sim.get_entity(a).unwrap().unit.as_ref().unwrap().order(),
            Order::None
        );
        assert_eq!(sim.alive_units_by_faction().get(&1), None);
    }

    #[test]
    fn test_death_removes_movement_and_interrupts() {
        let mut sim = Simulation::new();
        let a = sim.spawn_unit(UnitSpawnParams {
            movement: Some(MovementComponent::default()),
            ..Default::default()
        });
        sim.issue_move_order(a, point(10.0, 0.0)).unwrap();
        run(&mut sim, 5);

        assert!(sim.apply_damage(a, Fixed::from_num(500), None).unwrap());
        let entity = sim.get_entity(a).unwrap();
        assert!(entity.movement.is_none());
        assert_eq!(entity.unit.as_ref().unwrap().order(), Order::None);
        assert!(!entity.body.unwrap().is_moving());

        let events = sim.take_events();
        assert!(events.iter().any(|e| matches!(e, CoreEvent::Died { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            CoreEvent::OrderChanged {
                current: OrderKind::None,
                ..
            }
        )));
    }

    #[test]
    fn test_ranged_attack_spawns_projectile_entity() {
        let mut sim = Simulation::new();
        let archer = sim.spawn_unit(UnitSpawnParams {
            attack: Some(AttackStats::ranged(Fixed::from_num(8))),
            ..Default::default()
        });
        let target = spawn(&mut sim, 1, point(6.0, 0.0));
        sim.issue_attack_order(archer, target).unwrap();

        let events = run(&mut sim, 40);
        assert!(events.iter().any(|e| matches!(e, CoreEvent::ProjectileSpawned { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            CoreEvent::ProjectileHit { target: t, .. } if *t == target
        )));
        assert_eq!(
            sim.get_entity(archer).unwrap().attack.unwrap().stats().delivery(),
            AttackDelivery::Projectile
        );
    }

    #[test]
    fn test_detached_target_is_not_live() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        let b = spawn(&mut sim, 1, point(20.0, 0.0));
        sim.issue_attack_order(a, b).unwrap();
        run(&mut sim, 4);

        sim.detach_entity(b).unwrap();
        assert!(!sim.is_live(b));
        run(&mut sim, 1);
        assert_eq!(
            sim.get_entity(a).unwrap().unit.as_ref().unwrap().order(),
            Order::None
        );
    }

    #[test]
    fn test_reattach_resets_settle() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        run(&mut sim, 5);

        sim.detach_entity(a).unwrap();
        sim.attach_entity(a).unwrap();
        let unit = sim.get_entity(a).unwrap().unit.as_ref().unwrap();
        assert!(!unit.activation().is_ready());
    }

    #[test]
    fn test_editor_mode_skips_ticks() {
        let mut sim = Simulation::with_config(SimulationConfig {
            is_editor_mode: true,
            ..Default::default()
        });
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        sim.issue_move_order(a, point(5.0, 0.0)).unwrap();

        assert!(run(&mut sim, 10).is_empty());
        assert_eq!(sim.get_tick(), 0);
        assert_eq!(sim.get_entity(a).unwrap().body.unwrap().position, Vec3Fixed::ZERO);
    }

    #[test]
    fn test_resource_pools() {
        let mut sim = Simulation::new();
        let a = sim.spawn_unit(UnitSpawnParams {
            resource_pools: vec![ResourcePool::new("mana", Fixed::from_num(50))],
            ..Default::default()
        });

        assert!(sim.spend_resource(a, "mana", Fixed::from_num(30)).unwrap());
        assert!(!sim.spend_resource(a, "mana", Fixed::from_num(30)).unwrap());
        sim.restore_resource(a, "mana", Fixed::from_num(100)).unwrap();
        let pool = sim.get_entity(a).unwrap().resource_pool("mana").unwrap();
        assert_eq!(pool.current(), Fixed::from_num(50));
        assert!(matches!(
            sim.spend_resource(a, "rage", Fixed::from_num(1)),
            Err(GameError::MissingComponent { .. })
        ));
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        let before = sim.state_hash();
        assert_eq!(before, sim.state_hash());

        sim.issue_move_order(a, point(3.0, 0.0)).unwrap();
        run(&mut sim, 5);
        assert_ne!(before, sim.state_hash());
    }

    #[test]
    fn test_find_by_label() {
        let mut sim = Simulation::new();
        let a = sim.spawn_unit(UnitSpawnParams {
            label: Some("scout".into()),
            ..Default::default()
        });
        assert_eq!(sim.find_by_label("scout"), Some(a));
        assert_eq!(sim.find_by_label("tank"), None);
    }

    #[test]
    fn test_unresolved_navigation_never_moves() {
        let mut sim = Simulation::new();
        let a = sim.spawn_unit(UnitSpawnParams {
            navigation: NavigationChoice::Unresolved,
            ..Default::default()
        });
        sim.issue_move_order(a, point(5.0, 0.0)).unwrap();
        run(&mut sim, 20);
        assert_eq!(sim.get_entity(a).unwrap().body.unwrap().position, Vec3Fixed::ZERO);
    }
}
