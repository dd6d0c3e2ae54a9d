//! Navigation providers.
//!
//! Units never plan routes themselves. They push a destination into a
//! [`NavigationProvider`] and steer toward whatever waypoint it hands back.
//! Providers may need a few ticks of warm-up before they answer; until then
//! [`NavigationProvider::next_waypoint`] returns `None`.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::math::{Fixed, Vec3Fixed, ARRIVAL_EPSILON};
use crate::pathfinding::{find_path, smooth_path, GridCell, NavGrid};

/// Warm-up ticks before a built-in agent answers queries.
pub const DEFAULT_WARMUP_TICKS: u32 = 1;

/// Route planner consumed by units and movement components.
pub trait NavigationProvider: fmt::Debug + Send {
    /// Advance provider-side warm-up by one tick.
    fn tick(&mut self);

    /// Whether the provider answers queries yet.
    fn is_ready(&self) -> bool;

    /// Current destination.
    fn target(&self) -> Vec3Fixed;

    /// Change the destination.
    fn set_target(&mut self, point: Vec3Fixed);

    /// Distance from the destination at which the route counts as finished.
    fn desired_arrival_distance(&self) -> Fixed;

    /// Change the arrival distance. Negative values count as zero.
    fn set_desired_arrival_distance(&mut self, distance: Fixed);

    /// Next point to steer toward from `from`, or `None` while not ready.
    ///
    /// Once the route is finished this returns `from` itself.
    fn next_waypoint(&mut self, from: Vec3Fixed) -> Option<Vec3Fixed>;

    /// Whether `from` is within the arrival distance of the destination.
    fn is_path_finished(&self, from: Vec3Fixed) -> bool;
}

/// Counts down warm-up ticks shared by the built-in agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Warmup(u32);

impl Warmup {
    fn tick(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }

    const fn is_done(self) -> bool {
        self.0 == 0
    }
}

fn within_arrival(from: Vec3Fixed, target: Vec3Fixed, arrival: Fixed) -> bool {
    from.horizontal_distance(target) <= arrival
}

// ============================================================================
// Direct Agent
// ============================================================================

/// Straight-line provider for open terrain: the waypoint is the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectAgent {
    target: Vec3Fixed,
    arrival_distance: Fixed,
    warmup: Warmup,
}

impl Default for DirectAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectAgent {
    /// Agent with the default warm-up.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_warmup(DEFAULT_WARMUP_TICKS)
    }

    /// Agent that stays unready for `ticks` ticks.
    #[must_use]
    pub const fn with_warmup(ticks: u32) -> Self {
        Self {
            target: Vec3Fixed::ZERO,
            arrival_distance: Fixed::ZERO,
            warmup: Warmup(ticks),
        }
    }
}

impl NavigationProvider for DirectAgent {
    fn tick(&mut self) {
        self.warmup.tick();
    }

    fn is_ready(&self) -> bool {
        self.warmup.is_done()
    }

    fn target(&self) -> Vec3Fixed {
        self.target
    }

    fn set_target(&mut self, point: Vec3Fixed) {
        self.target = point;
    }

    fn desired_arrival_distance(&self) -> Fixed {
        self.arrival_distance
    }

    fn set_desired_arrival_distance(&mut self, distance: Fixed) {
        self.arrival_distance = distance.max(Fixed::ZERO);
    }

    fn next_waypoint(&mut self, from: Vec3Fixed) -> Option<Vec3Fixed> {
        if !self.is_ready() {
            return None;
        }
        if self.is_path_finished(from) {
            return Some(from);
        }
        Some(self.target)
    }

    fn is_path_finished(&self, from: Vec3Fixed) -> bool {
        within_arrival(from, self.target, self.arrival_distance)
    }
}

// ============================================================================
// Grid Agent
// ============================================================================

/// A* provider over a shared [`NavGrid`].
///
/// Plans lazily on the first waypoint query after the destination moves to a
/// different cell. A destination that moves within its cell only nudges the
/// final waypoint. If no route exists the agent steers straight at the
/// destination.
#[derive(Debug, Clone)]
pub struct GridAgent {
    grid: Arc<NavGrid>,
    target: Vec3Fixed,
    arrival_distance: Fixed,
    warmup: Warmup,
    path: Vec<Vec3Fixed>,
    next_index: usize,
    planned_cell: Option<GridCell>,
    dirty: bool,
}

impl GridAgent {
    /// Agent over `grid` with the default warm-up.
    #[must_use]
    pub fn new(grid: Arc<NavGrid>) -> Self {
        Self {
            grid,
            target: Vec3Fixed::ZERO,
            arrival_distance: Fixed::ZERO,
            warmup: Warmup(DEFAULT_WARMUP_TICKS),
            path: Vec::new(),
            next_index: 0,
            planned_cell: None,
            dirty: true,
        }
    }

    /// Waypoints of the current plan, including already-passed ones.
    #[must_use]
    pub fn path(&self) -> &[Vec3Fixed] {
        &self.path
    }

    fn replan(&mut self, from: Vec3Fixed) {
        self.path = match find_path(&self.grid, from, self.target) {
            Ok(cells) => {
                let mut path = smooth_path(&self.grid, cells);
                // the first waypoint is the cell we are standing in
                if path.len() > 1 {
                    path.remove(0);
                }
                if let Some(last) = path.last_mut() {
                    *last = self.target;
                }
                path
            }
            Err(err) => {
                debug!(error = %err, "no grid route, steering directly");
                vec![self.target]
            }
        };
        self.next_index = 0;
        self.planned_cell = self.grid.world_to_grid(self.target);
        self.dirty = false;
    }
}

impl NavigationProvider for GridAgent {
    fn tick(&mut self) {
        self.warmup.tick();
    }

    fn is_ready(&self) -> bool {
        self.warmup.is_done()
    }

    fn target(&self) -> Vec3Fixed {
        self.target
    }

    fn set_target(&mut self, point: Vec3Fixed) {
        self.target = point;
        let cell = self.grid.world_to_grid(point);
        if !self.dirty && cell.is_some() && cell == self.planned_cell {
            if let Some(last) = self.path.last_mut() {
                *last = point;
            }
        } else {
            self.dirty = true;
        }
    }

    fn desired_arrival_distance(&self) -> Fixed {
        self.arrival_distance
    }

    fn set_desired_arrival_distance(&mut self, distance: Fixed) {
        self.arrival_distance = distance.max(Fixed::ZERO);
    }

    fn next_waypoint(&mut self, from: Vec3Fixed) -> Option<Vec3Fixed> {
        if !self.is_ready() {
            return None;
        }
        if self.is_path_finished(from) {
            return Some(from);
        }
        if self.dirty || self.path.is_empty() {
            self.replan(from);
        }

        while self.next_index + 1 < self.path.len()
            && from.horizontal_distance(self.path[self.next_index]) <= ARRIVAL_EPSILON
        {
            self.next_index += 1;
        }
        Some(self.path.get(self.next_index).copied().unwrap_or(self.target))
    }

    fn is_path_finished(&self, from: Vec3Fixed) -> bool {
        within_arrival(from, self.target, self.arrival_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathfinding::CellType;

    fn point(x: i32, z: i32) -> Vec3Fixed {
        Vec3Fixed::ground(Fixed::from_num(x), Fixed::from_num(z))
    }

    #[test]
    fn test_direct_agent_warmup() {
        let mut agent = DirectAgent::with_warmup(2);
        agent.set_target(point(10, 0));
        assert!(agent.next_waypoint(point(0, 0)).is_none());
        agent.tick();
        assert!(agent.next_waypoint(point(0, 0)).is_none());
        agent.tick();
        assert_eq!(agent.next_waypoint(point(0, 0)), Some(point(10, 0)));
    }

    #[test]
    fn test_direct_agent_arrival_distance() {
        let mut agent = DirectAgent::with_warmup(0);
        agent.set_target(point(10, 0));
        agent.set_desired_arrival_distance(Fixed::from_num(3));

        assert!(!agent.is_path_finished(point(6, 0)));
        assert!(agent.is_path_finished(point(7, 0)));
        assert_eq!(agent.next_waypoint(point(8, 0)), Some(point(8, 0)));

        agent.set_desired_arrival_distance(Fixed::from_num(-1));
        assert_eq!(agent.desired_arrival_distance(), Fixed::ZERO);
    }

    fn walled_grid() -> Arc<NavGrid> {
        let mut grid = NavGrid::new(12, 12, Fixed::ONE).unwrap();
        for row in 0..9 {
            grid.set_cell(GridCell::new(6, row), CellType::Blocked);
        }
        Arc::new(grid)
    }

    #[test]
    fn test_grid_agent_walks_around_wall() {
        let grid = walled_grid();
        let mut agent = GridAgent::new(Arc::clone(&grid));
        agent.tick();
        let goal = Vec3Fixed::ground(Fixed::from_num(10.5), Fixed::from_num(1.5));
        agent.set_target(goal);

        let mut position = Vec3Fixed::ground(Fixed::from_num(1.5), Fixed::from_num(1.5));
        for _ in 0..64 {
            let waypoint = agent.next_waypoint(position).unwrap();
            if waypoint == position {
                break;
            }
            position = waypoint;
            let cell = grid.world_to_grid(position).unwrap();
            assert!(grid.is_walkable(cell));
        }
        assert_eq!(position, goal);
        assert!(agent.path().len() > 1);
    }

    #[test]
    fn test_grid_agent_falls_back_to_direct_line() {
        let mut grid = NavGrid::new(8, 8, Fixed::ONE).unwrap();
        for row in 0..8 {
            grid.set_cell(GridCell::new(4, row), CellType::Blocked);
        }
        let mut agent = GridAgent::new(Arc::new(grid));
        agent.tick();
        agent.set_target(point(7, 2));
        assert_eq!(agent.next_waypoint(point(1, 2)), Some(point(7, 2)));
    }

    #[test]
    fn test_grid_agent_same_cell_target_keeps_plan() {
        let mut agent = GridAgent::new(walled_grid());
        agent.tick();
        agent.set_target(Vec3Fixed::ground(Fixed::from_num(10.2), Fixed::from_num(1.2)));
        agent.next_waypoint(point(1, 1));
        let planned = agent.path().len();

        let nudged = Vec3Fixed::ground(Fixed::from_num(10.8), Fixed::from_num(1.4));
        agent.set_target(nudged);
        assert_eq!(agent.path().len(), planned);
        assert_eq!(agent.path().last(), Some(&nudged));
    }
}
