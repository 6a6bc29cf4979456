use crate::constants::{
    ROTATION_INTERVAL_MS, SHIFTING_WALL_MAX_LEN, SHIFTING_WALL_MIN_LEN, SHIFT_INTERVAL_MS,
};
use crate::grid::Grid;
use crate::rng::Rng;
use crate::types::{Occupant, Position, Terrain};

#[derive(Clone, Debug)]
pub struct RotatingRegion {
    pub center: Position,
    pub radius: i32,
    pub interval_ms: u64,
    pub last_fired_ms: u64,
}

impl RotatingRegion {
    pub fn new(center: Position, radius: i32, now_ms: u64) -> Self {
        Self {
            center,
            radius,
            interval_ms: ROTATION_INTERVAL_MS,
            last_fired_ms: now_ms,
        }
    }

    pub fn random(grid: &Grid, radius: i32, rng: &mut Rng, now_ms: u64) -> Option<Self> {
        let lo = radius + 1;
        let row_hi = grid.rows() - radius - 2;
        let col_hi = grid.cols() - radius - 2;
        if row_hi < lo || col_hi < lo {
            return None;
        }
        for _ in 0..32 {
            let center = Position::new(rng.int(lo, row_hi), rng.int(lo, col_hi));
            let region = Self::new(center, radius, now_ms);
            if region.cells().all(|pos| !grid.is_terminal(pos)) {
                return Some(region);
            }
        }
        None
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_fired_ms) >= self.interval_ms
    }

    pub fn contains(&self, pos: Position) -> bool {
        (pos.row - self.center.row).abs() <= self.radius
            && (pos.col - self.center.col).abs() <= self.radius
    }

    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        let r = self.radius;
        (-r..=r).flat_map(move |dr| {
            (-r..=r).map(move |dc| Position::new(self.center.row + dr, self.center.col + dc))
        })
    }

    /// (dr, dc) → (dc, -dr) about the center. Positions outside the window
    /// are returned unchanged.
    pub fn rotate_position(&self, pos: Position) -> Position {
        if !self.contains(pos) {
            return pos;
        }
        let dr = pos.row - self.center.row;
        let dc = pos.col - self.center.col;
        Position::new(self.center.row + dc, self.center.col - dr)
    }

    /// Rotates terrain and occupants of the window from a snapshot. Start/Exit
    /// are neither moved nor overwritten.
    pub fn rotate(&self, grid: &mut Grid) {
        let snapshot: Vec<(Position, Terrain, Option<Occupant>)> = self
            .cells()
            .filter(|pos| grid.in_bounds(*pos))
            .map(|pos| (pos, grid.terrain(pos), grid.occupant(pos)))
            .collect();
        for (src, terrain, occupant) in snapshot {
            if terrain.is_terminal() {
                continue;
            }
            let dest = self.rotate_position(src);
            if !self.contains(dest) || !grid.in_bounds(dest) || grid.is_terminal(dest) {
                continue;
            }
            grid.write_cell(dest, terrain, occupant);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Clone, Debug)]
pub struct ShiftingWall {
    pub anchor: Position,
    pub length: i32,
    pub orientation: Orientation,
    pub step: i32,
    pub interval_ms: u64,
    pub last_fired_ms: u64,
    pub footprint: Vec<Position>,
}

impl ShiftingWall {
    pub fn new(anchor: Position, length: i32, orientation: Orientation, now_ms: u64) -> Self {
        Self {
            anchor,
            length,
            orientation,
            step: 1,
            interval_ms: SHIFT_INTERVAL_MS,
            last_fired_ms: now_ms,
            footprint: Vec::new(),
        }
    }

    pub fn random(grid: &Grid, rng: &mut Rng, now_ms: u64) -> Self {
        let length = rng.int(SHIFTING_WALL_MIN_LEN, SHIFTING_WALL_MAX_LEN);
        let orientation = if rng.bool(0.5) {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        let (row_hi, col_hi) = match orientation {
            Orientation::Horizontal => (grid.rows() - 2, grid.cols() - 1 - length),
            Orientation::Vertical => (grid.rows() - 1 - length, grid.cols() - 2),
        };
        let anchor = Position::new(rng.int(1, row_hi.max(1)), rng.int(1, col_hi.max(1)));
        let mut wall = Self::new(anchor, length, orientation, now_ms);
        if rng.bool(0.5) {
            wall.step = -1;
        }
        wall
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_fired_ms) >= self.interval_ms
    }

    pub fn segment_at(&self, anchor: Position) -> Vec<Position> {
        (0..self.length)
            .map(|i| match self.orientation {
                Orientation::Horizontal => Position::new(anchor.row, anchor.col + i),
                Orientation::Vertical => Position::new(anchor.row + i, anchor.col),
            })
            .collect()
    }

    fn next_anchor(&self, grid: &Grid) -> Position {
        let moved = |step: i32| match self.orientation {
            Orientation::Horizontal => Position::new(self.anchor.row + step, self.anchor.col),
            Orientation::Vertical => Position::new(self.anchor.row, self.anchor.col + step),
        };
        let inside = |anchor: Position| match self.orientation {
            Orientation::Horizontal => anchor.row >= 1 && anchor.row <= grid.rows() - 2,
            Orientation::Vertical => anchor.col >= 1 && anchor.col <= grid.cols() - 2,
        };
        let forward = moved(self.step);
        if inside(forward) {
            forward
        } else {
            moved(-self.step)
        }
    }

    pub fn follow_rotation(&mut self, region: &RotatingRegion) {
        for pos in &mut self.footprint {
            *pos = region.rotate_position(*pos);
        }
    }

    pub fn shift(&mut self, grid: &mut Grid, blocked: &[Position]) {
        for pos in self.footprint.drain(..) {
            if grid.terrain(pos) == Terrain::Wall {
                grid.set_terrain(pos, Terrain::Open);
            }
        }

        let next = self.next_anchor(grid);
        let delta = match self.orientation {
            Orientation::Horizontal => next.row - self.anchor.row,
            Orientation::Vertical => next.col - self.anchor.col,
        };
        self.step = delta;
        self.anchor = next;

        for pos in self.segment_at(next) {
            if !grid.is_interior(pos)
                || grid.terrain(pos) != Terrain::Open
                || grid.occupant(pos).is_some()
                || blocked.contains(&pos)
            {
                continue;
            }
            if grid.set_terrain(pos, Terrain::Wall) {
                self.footprint.push(pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PickupKind;
    use crate::world::generate_maze;

    fn window_kinds(grid: &Grid, region: &RotatingRegion) -> Vec<(Terrain, Option<Occupant>)> {
        region
            .cells()
            .map(|pos| (grid.terrain(pos), grid.occupant(pos)))
            .collect()
    }

    #[test]
    fn four_rotations_restore_a_three_by_three_window() {
        for seed in 0..30u64 {
            let mut rng = Rng::new(seed);
            let mut grid = generate_maze(15, 15, &mut rng).expect("maze");
            let region = RotatingRegion::random(&grid, 1, &mut rng, 0).expect("window");
            let before = window_kinds(&grid, &region);
            region.rotate(&mut grid);
            assert_ne!(window_kinds(&grid, &region), Vec::new());
            for _ in 0..3 {
                region.rotate(&mut grid);
            }
            assert_eq!(window_kinds(&grid, &region), before, "seed={seed}");
        }
    }

    #[test]
    fn rotation_moves_cells_clockwise() {
        let mut grid = Grid::from_rows(&[
            "#######",
            "S.....#",
            "#.#...#",
            "#.....#",
            "#.....#",
            "#.....E",
            "#######",
        ])
        .expect("valid grid");
        let region = RotatingRegion::new(Position::new(3, 3), 1, 0);
        // Top-left wall of the window goes to the top-right corner.
        assert_eq!(grid.terrain(Position::new(2, 2)), Terrain::Wall);
        grid.place_occupant(
            Position::new(2, 3),
            Occupant::Pickup {
                kind: PickupKind::Lantern,
            },
        );
        region.rotate(&mut grid);
        assert_eq!(grid.terrain(Position::new(2, 2)), Terrain::Open);
        assert_eq!(grid.terrain(Position::new(2, 4)), Terrain::Wall);
        assert_eq!(grid.occupant(Position::new(2, 3)), None);
        assert_eq!(
            grid.occupant(Position::new(3, 4)),
            Some(Occupant::Pickup {
                kind: PickupKind::Lantern
            })
        );
        assert_eq!(region.rotate_position(Position::new(2, 3)), Position::new(3, 4));
        assert_eq!(region.rotate_position(Position::new(3, 3)), Position::new(3, 3));
        assert_eq!(region.rotate_position(Position::new(5, 5)), Position::new(5, 5));
    }

    #[test]
    fn rotation_never_touches_terminals() {
        let mut grid = Grid::from_rows(&["#####", "S...#", "#...#", "#...E", "#####"])
            .expect("valid grid");
        let region = RotatingRegion::new(Position::new(2, 2), 2, 0);
        for _ in 0..3 {
            region.rotate(&mut grid);
            assert!(grid.check_terminals().is_ok());
        }
    }

    #[test]
    fn random_windows_stay_inside_and_avoid_terminals() {
        let mut rng = Rng::new(8);
        let grid = generate_maze(21, 21, &mut rng).expect("maze");
        for _ in 0..50 {
            let region = RotatingRegion::random(&grid, 2, &mut rng, 0).expect("window");
            assert!(region.cells().all(|p| grid.is_interior(p) && !grid.is_terminal(p)));
        }
    }

    #[test]
    fn shifting_wall_erases_old_footprint_and_paints_new_one() {
        let mut grid = Grid::from_rows(&[
            "#########",
            "S.......#",
            "#.......#",
            "#.......#",
            "#.......#",
            "#.......E",
            "#########",
        ])
        .expect("valid grid");
        let mut wall = ShiftingWall::new(Position::new(2, 2), 3, Orientation::Horizontal, 0);
        wall.shift(&mut grid, &[]);
        assert_eq!(wall.anchor, Position::new(3, 2));
        assert_eq!(
            wall.footprint,
            vec![Position::new(3, 2), Position::new(3, 3), Position::new(3, 4)]
        );
        assert!(wall.footprint.iter().all(|p| grid.terrain(*p) == Terrain::Wall));

        wall.shift(&mut grid, &[Position::new(4, 3)]);
        assert_eq!(wall.anchor, Position::new(4, 2));
        assert!(grid.is_open(Position::new(3, 3)));
        assert!(grid.is_open(Position::new(4, 3)));
        assert_eq!(wall.footprint, vec![Position::new(4, 2), Position::new(4, 4)]);
    }

    #[test]
    fn shifting_wall_bounces_at_the_interior_edge() {
        let mut grid = Grid::new(9, 9).expect("extents");
        for pos in grid.positions().collect::<Vec<_>>() {
            if grid.is_interior(pos) {
                grid.set_terrain(pos, Terrain::Open);
            }
        }
        let mut wall = ShiftingWall::new(Position::new(7, 2), 3, Orientation::Horizontal, 0);
        wall.shift(&mut grid, &[]);
        assert_eq!(wall.anchor, Position::new(6, 2));
        assert_eq!(wall.step, -1);
        for _ in 0..20 {
            wall.shift(&mut grid, &[]);
            assert!(wall.anchor.row >= 1 && wall.anchor.row <= 7);
        }
        let walls = grid
            .positions()
            .filter(|p| grid.is_interior(*p) && grid.terrain(*p) == Terrain::Wall)
            .count();
        assert_eq!(walls, wall.footprint.len());
    }

    #[test]
    fn shifting_wall_footprint_follows_a_rotation() {
        let mut grid = Grid::new(9, 9).expect("extents");
        for pos in grid.positions().collect::<Vec<_>>() {
            if grid.is_interior(pos) {
                grid.set_terrain(pos, Terrain::Open);
            }
        }
        let interior_walls = |grid: &Grid| {
            grid.positions()
                .filter(|p| grid.is_interior(*p) && grid.terrain(*p) == Terrain::Wall)
                .count()
        };
        let mut wall = ShiftingWall::new(Position::new(2, 3), 3, Orientation::Horizontal, 0);
        wall.shift(&mut grid, &[]);
        assert_eq!(wall.footprint[0], Position::new(3, 3));

        let region = RotatingRegion::new(Position::new(4, 4), 2, 0);
        region.rotate(&mut grid);
        wall.follow_rotation(&region);
        assert_eq!(
            wall.footprint,
            vec![Position::new(3, 5), Position::new(4, 5), Position::new(5, 5)]
        );
        assert!(wall.footprint.iter().all(|p| grid.terrain(*p) == Terrain::Wall));

        wall.shift(&mut grid, &[]);
        assert_eq!(
            wall.footprint,
            vec![Position::new(4, 3), Position::new(4, 4), Position::new(4, 5)]
        );
        assert_eq!(interior_walls(&grid), 3);
    }

    #[test]
    fn shifting_wall_never_paints_over_items_or_terminals() {
        let mut grid = Grid::from_rows(&["#######", "S.....#", "#.....#", "#.....E", "#######"])
            .expect("valid grid");
        grid.place_occupant(Position::new(2, 2), Occupant::Trap);
        let mut wall = ShiftingWall::new(Position::new(1, 1), 3, Orientation::Horizontal, 0);
        wall.shift(&mut grid, &[]);
        assert_eq!(grid.occupant(Position::new(2, 2)), Some(Occupant::Trap));
        assert!(!wall.footprint.contains(&Position::new(2, 2)));
        assert!(grid.check_terminals().is_ok());
    }
}
