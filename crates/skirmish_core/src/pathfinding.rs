//! Grid-based pathfinding on the ground plane using A*.
//!
//! The grid lies on the x/z plane; columns run along x and rows along z.
//! All calculations use fixed-point math so that every client plans
//! identical routes.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec3Fixed};

/// Cost of a diagonal step (sqrt 2).
const DIAGONAL_COST: Fixed = Fixed::from_bits(6_074_001_000);

/// Cell types for the navigation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellType {
    /// Normal walkable terrain (cost: 1).
    #[default]
    Walkable,
    /// Impassable terrain.
    Blocked,
    /// Slow terrain with 2x movement cost.
    SlowTerrain,
}

impl CellType {
    /// Movement cost for entering this cell, `None` if blocked.
    #[must_use]
    pub const fn movement_cost(self) -> Option<Fixed> {
        match self {
            Self::Walkable => Some(Fixed::ONE),
            Self::Blocked => None,
            Self::SlowTerrain => Some(Fixed::const_from_int(2)),
        }
    }

    /// Returns true if this cell can be entered.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

/// Column/row address of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    /// Column (x axis).
    pub col: u32,
    /// Row (z axis).
    pub row: u32,
}

impl GridCell {
    /// Create a cell address.
    #[must_use]
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    fn offset(self, dc: i32, dr: i32) -> Option<Self> {
        let col = self.col.checked_add_signed(dc)?;
        let row = self.row.checked_add_signed(dr)?;
        Some(Self::new(col, row))
    }

    /// Deterministic ordering key: lower rows, then lower columns, first.
    const fn tie_breaker(self) -> u64 {
        ((self.row as u64) << 32) | (self.col as u64)
    }
}

/// Navigation grid on the x/z plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavGrid {
    columns: u32,
    rows: u32,
    cells: Vec<CellType>,
    cell_size: Fixed,
    origin: Vec3Fixed,
}

impl NavGrid {
    /// Create a grid with all cells walkable, its corner at the world origin.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if a dimension is zero or the
    /// cell size is not positive.
    pub fn new(columns: u32, rows: u32, cell_size: Fixed) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(GameError::InvalidState(format!(
                "nav grid must have at least one cell, got {columns}x{rows}"
            )));
        }
        if cell_size <= Fixed::ZERO {
            return Err(GameError::InvalidState(format!(
                "nav grid cell size must be positive, got {cell_size}"
            )));
        }

        Ok(Self {
            columns,
            rows,
            cells: vec![CellType::Walkable; (columns as usize) * (rows as usize)],
            cell_size,
            origin: Vec3Fixed::ZERO,
        })
    }

    /// Move the grid's minimum corner to `origin` (only x and z are used).
    #[must_use]
    pub fn with_origin(mut self, origin: Vec3Fixed) -> Self {
        self.origin = origin.horizontal();
        self
    }

    /// Number of columns (x axis).
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows (z axis).
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Cell size in world units.
    #[must_use]
    pub const fn cell_size(&self) -> Fixed {
        self.cell_size
    }

    fn index(&self, cell: GridCell) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.row as usize) * (self.columns as usize) + (cell.col as usize))
    }

    /// Whether a cell address lies inside the grid.
    #[must_use]
    pub const fn in_bounds(&self, cell: GridCell) -> bool {
        cell.col < self.columns && cell.row < self.rows
    }

    /// Cell type at an address, `None` if out of bounds.
    #[must_use]
    pub fn get_cell(&self, cell: GridCell) -> Option<CellType> {
        self.index(cell).map(|i| self.cells[i])
    }

    /// Set a cell type. Returns `false` if out of bounds.
    pub fn set_cell(&mut self, cell: GridCell, cell_type: CellType) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.cells[i] = cell_type;
                true
            }
            None => false,
        }
    }

    /// Whether a cell can be entered. Out-of-bounds cells cannot.
    #[must_use]
    pub fn is_walkable(&self, cell: GridCell) -> bool {
        self.get_cell(cell).is_some_and(CellType::is_walkable)
    }

    /// Cell containing a world point, `None` outside the grid.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec3Fixed) -> Option<GridCell> {
        let local = pos - self.origin;
        if local.x < Fixed::ZERO || local.z < Fixed::ZERO {
            return None;
        }

        let col = (local.x / self.cell_size).to_num::<i64>();
        let row = (local.z / self.cell_size).to_num::<i64>();
        let cell = GridCell::new(u32::try_from(col).ok()?, u32::try_from(row).ok()?);
        self.in_bounds(cell).then_some(cell)
    }

    /// World point at the center of a cell, at height `y`.
    #[must_use]
    pub fn grid_to_world(&self, cell: GridCell, y: Fixed) -> Vec3Fixed {
        let half = self.cell_size / Fixed::from_num(2);
        Vec3Fixed::new(
            self.origin.x + Fixed::from_num(cell.col) * self.cell_size + half,
            y,
            self.origin.z + Fixed::from_num(cell.row) * self.cell_size + half,
        )
    }

    /// Movement cost for entering a cell, `None` for blocked or out-of-bounds.
    #[must_use]
    pub fn movement_cost(&self, cell: GridCell) -> Option<Fixed> {
        self.get_cell(cell).and_then(CellType::movement_cost)
    }
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    cell: GridCell,
    f_score: Fixed,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse so the lowest f_score pops first,
        // then the lowest tie-breaker among equals.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.cell.tie_breaker().cmp(&self.cell.tie_breaker()))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Neighbor offsets for 8-directional movement, as (column, row) deltas.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Octile distance: exact cost of an unobstructed 8-directional route.
fn octile_heuristic(a: GridCell, b: GridCell) -> Fixed {
    let dc = a.col.abs_diff(b.col);
    let dr = a.row.abs_diff(b.row);
    let (long, short) = if dc > dr { (dc, dr) } else { (dr, dc) };
    Fixed::from_num(long - short) + DIAGONAL_COST * Fixed::from_num(short)
}

/// A diagonal step may not cut the corner of a blocked cell.
fn is_diagonal_valid(grid: &NavGrid, from: GridCell, dc: i32, dr: i32) -> bool {
    if dc == 0 || dr == 0 {
        return true;
    }
    let side_a = from.offset(dc, 0);
    let side_b = from.offset(0, dr);
    side_a.is_some_and(|c| grid.is_walkable(c)) && side_b.is_some_and(|c| grid.is_walkable(c))
}

/// Find a route between two world points.
///
/// Returns cell-center waypoints at the start point's height, including the
/// start and goal cells.
///
/// # Errors
///
/// Returns [`GameError::InvalidState`] if either point is off the grid or
/// blocked, and [`GameError::NoPath`] if no route connects them.
pub fn find_path(grid: &NavGrid, start: Vec3Fixed, goal: Vec3Fixed) -> Result<Vec<Vec3Fixed>> {
    let start_cell = grid
        .world_to_grid(start)
        .ok_or_else(|| GameError::InvalidState("path start outside nav grid".into()))?;
    let goal_cell = grid
        .world_to_grid(goal)
        .ok_or_else(|| GameError::InvalidState("path goal outside nav grid".into()))?;

    if !grid.is_walkable(start_cell) {
        return Err(GameError::InvalidState("path start is blocked".into()));
    }
    if !grid.is_walkable(goal_cell) {
        return Err(GameError::InvalidState("path goal is blocked".into()));
    }

    let cells = if start_cell == goal_cell {
        vec![start_cell]
    } else {
        search(grid, start_cell, goal_cell)?
    };

    Ok(cells
        .into_iter()
        .map(|cell| grid.grid_to_world(cell, start.y))
        .collect())
}

fn search(grid: &NavGrid, start: GridCell, goal: GridCell) -> Result<Vec<GridCell>> {
    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
    let mut g_score: HashMap<GridCell, Fixed> = HashMap::new();

    g_score.insert(start, Fixed::ZERO);
    open_set.push(AStarNode {
        cell: start,
        f_score: octile_heuristic(start, goal),
    });

    while let Some(current) = open_set.pop() {
        if current.cell == goal {
            return Ok(reconstruct_path(&came_from, goal));
        }

        let current_g = g_score.get(&current.cell).copied().unwrap_or(Fixed::MAX);

        for &(dc, dr) in &DIRECTIONS {
            let Some(next) = current.cell.offset(dc, dr) else {
                continue;
            };
            let Some(cell_cost) = grid.movement_cost(next) else {
                continue;
            };
            if !is_diagonal_valid(grid, current.cell, dc, dr) {
                continue;
            }

            let step = if dc != 0 && dr != 0 {
                cell_cost * DIAGONAL_COST
            } else {
                cell_cost
            };
            let tentative_g = current_g + step;

            if tentative_g < g_score.get(&next).copied().unwrap_or(Fixed::MAX) {
                came_from.insert(next, current.cell);
                g_score.insert(next, tentative_g);
                open_set.push(AStarNode {
                    cell: next,
                    f_score: tentative_g + octile_heuristic(next, goal),
                });
            }
        }
    }

    Err(GameError::NoPath {
        from_x: start.col,
        from_z: start.row,
        to_x: goal.col,
        to_z: goal.row,
    })
}

fn reconstruct_path(came_from: &HashMap<GridCell, GridCell>, goal: GridCell) -> Vec<GridCell> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Drop waypoints that can be skipped without crossing blocked cells.
#[must_use]
pub fn smooth_path(grid: &NavGrid, path: Vec<Vec3Fixed>) -> Vec<Vec3Fixed> {
    if path.len() <= 2 {
        return path;
    }

    let mut smoothed = Vec::with_capacity(path.len());
    smoothed.push(path[0]);

    let mut current = 0;
    while current < path.len() - 1 {
        let mut furthest = current + 1;
        for candidate in (current + 2)..path.len() {
            if has_line_of_sight(grid, path[current], path[candidate]) {
                furthest = candidate;
            }
        }
        smoothed.push(path[furthest]);
        current = furthest;
    }

    smoothed
}

/// Whether a straight walk between two points stays on walkable cells.
///
/// Steps through cells Bresenham-style, refusing diagonal corner cuts.
#[must_use]
pub fn has_line_of_sight(grid: &NavGrid, start: Vec3Fixed, end: Vec3Fixed) -> bool {
    let (Some(from), Some(to)) = (grid.world_to_grid(start), grid.world_to_grid(end)) else {
        return false;
    };

    let (x1, z1) = (i64::from(to.col), i64::from(to.row));
    let dx = (x1 - i64::from(from.col)).abs();
    let dz = (z1 - i64::from(from.row)).abs();
    let sx = if from.col < to.col { 1 } else { -1 };
    let sz = if from.row < to.row { 1 } else { -1 };
    let mut err = dx - dz;
    let (mut x, mut z) = (i64::from(from.col), i64::from(from.row));

    let walkable = |x: i64, z: i64| match (u32::try_from(x), u32::try_from(z)) {
        (Ok(col), Ok(row)) => grid.is_walkable(GridCell::new(col, row)),
        _ => false,
    };

    loop {
        if !walkable(x, z) {
            return false;
        }
        if x == x1 && z == z1 {
            return true;
        }

        let e2 = 2 * err;
        if e2 > -dz && e2 < dx && (!walkable(x + sx, z) || !walkable(x, z + sz)) {
            return false;
        }
        if e2 > -dz {
            err -= dz;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            z += sz;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn point(x: i32, z: i32) -> Vec3Fixed {
        Vec3Fixed::ground(fixed(x), fixed(z))
    }

    fn grid(columns: u32, rows: u32) -> NavGrid {
        NavGrid::new(columns, rows, Fixed::ONE).unwrap()
    }

    #[test]
    fn test_cell_type_costs() {
        assert_eq!(CellType::Walkable.movement_cost(), Some(Fixed::ONE));
        assert_eq!(CellType::Blocked.movement_cost(), None);
        assert_eq!(CellType::SlowTerrain.movement_cost(), Some(fixed(2)));
    }

    #[test]
    fn test_invalid_grid_dimensions() {
        assert!(NavGrid::new(0, 4, Fixed::ONE).is_err());
        assert!(NavGrid::new(4, 4, Fixed::ZERO).is_err());
    }

    #[test]
    fn test_world_to_grid_uses_x_and_z() {
        let nav = NavGrid::new(10, 10, fixed(2)).unwrap();
        let high = Vec3Fixed::new(fixed(5), fixed(50), fixed(3));
        assert_eq!(nav.world_to_grid(high), Some(GridCell::new(2, 1)));
        assert_eq!(nav.world_to_grid(point(-1, 3)), None);
        assert_eq!(nav.world_to_grid(point(20, 3)), None);
    }

    #[test]
    fn test_origin_offset() {
        let nav = grid(4, 4).with_origin(point(-2, -2));
        assert_eq!(nav.world_to_grid(point(-2, -2)), Some(GridCell::new(0, 0)));
        let center = nav.grid_to_world(GridCell::new(0, 0), Fixed::ZERO);
        assert_eq!(center, Vec3Fixed::ground(fixed(-2) + Fixed::from_num(0.5), fixed(-2) + Fixed::from_num(0.5)));
    }

    #[test]
    fn test_straight_path() {
        let nav = grid(10, 10);
        let path = find_path(&nav, point(0, 0), point(5, 0)).unwrap();
        assert_eq!(path.len(), 6);
        assert_eq!(path[5], nav.grid_to_world(GridCell::new(5, 0), Fixed::ZERO));
    }

    #[test]
    fn test_path_around_wall() {
        let mut nav = grid(10, 10);
        for row in 0..8 {
            nav.set_cell(GridCell::new(5, row), CellType::Blocked);
        }

        let path = find_path(&nav, point(1, 1), point(8, 1)).unwrap();
        for waypoint in &path {
            let cell = nav.world_to_grid(*waypoint).unwrap();
            assert!(nav.is_walkable(cell));
        }
        assert!(path.iter().any(|p| nav.world_to_grid(*p).unwrap().row >= 8));
    }

    #[test]
    fn test_no_path() {
        let mut nav = grid(10, 10);
        for row in 0..10 {
            nav.set_cell(GridCell::new(5, row), CellType::Blocked);
        }
        let result = find_path(&nav, point(1, 1), point(8, 1));
        assert!(matches!(result, Err(GameError::NoPath { .. })));
    }

    #[test]
    fn test_blocked_endpoints() {
        let mut nav = grid(10, 10);
        nav.set_cell(GridCell::new(1, 1), CellType::Blocked);
        assert!(find_path(&nav, point(1, 1), point(5, 5)).is_err());
        assert!(find_path(&nav, point(5, 5), point(1, 1)).is_err());
    }

    #[test]
    fn test_no_corner_cutting() {
        let mut nav = grid(3, 3);
        nav.set_cell(GridCell::new(1, 0), CellType::Blocked);
        assert!(!is_diagonal_valid(&nav, GridCell::new(0, 0), 1, 1));
        assert!(!has_line_of_sight(&nav, point(0, 0), point(2, 2)));
    }

    #[test]
    fn test_smoothing_open_field() {
        let nav = grid(20, 20);
        let path = find_path(&nav, point(0, 0), point(10, 3)).unwrap();
        let smoothed = smooth_path(&nav, path.clone());
        assert_eq!(smoothed.len(), 2);
        assert_eq!(smoothed.first(), path.first());
        assert_eq!(smoothed.last(), path.last());
    }

    #[test]
    fn test_deterministic_routes() {
        let mut nav = grid(16, 16);
        for row in 2..14 {
            nav.set_cell(GridCell::new(8, row), CellType::Blocked);
        }
        let first = find_path(&nav, point(1, 8), point(14, 8)).unwrap();
        for _ in 0..10 {
            assert_eq!(find_path(&nav, point(1, 8), point(14, 8)).unwrap(), first);
        }
    }

    #[test]
    fn test_prefers_fast_terrain() {
        let mut nav = grid(10, 3);
        for col in 1..9 {
            nav.set_cell(GridCell::new(col, 1), CellType::SlowTerrain);
        }
        let path = find_path(&nav, point(0, 1), point(9, 1)).unwrap();
        let slow_steps = path
            .iter()
            .filter_map(|p| nav.world_to_grid(*p))
            .filter(|c| nav.get_cell(*c) == Some(CellType::SlowTerrain))
            .count();
        assert!(slow_steps < 8);
    }

    #[test]
    fn test_octile_heuristic() {
        let h = octile_heuristic(GridCell::new(0, 0), GridCell::new(3, 1));
        assert_eq!(h, fixed(2) + DIAGONAL_COST);
    }
}
