use tracing::debug;

use crate::grid::Grid;
use crate::pathfinding::{reachable, shortest};
use crate::rng::Rng;
use crate::types::{Position, Terrain};

#[derive(Clone, Debug)]
pub struct MutationContext<'a> {
    pub anchors: &'a [Position],
    pub protected: &'a [Position],
    pub attempts: usize,
    pub shortcut_probability: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub walls_added: usize,
    pub walls_removed: usize,
    pub repairs: Vec<(Position, usize)>,
}

impl MutationReport {
    pub fn repaired(&self) -> bool {
        !self.repairs.is_empty()
    }
}

pub fn mutation_attempts(grid: &Grid, factor: f32) -> usize {
    ((grid.len() as f32 * factor).round() as usize).max(1)
}

pub fn precheck(grid: &Grid, anchor: Position) -> bool {
    reachable(grid, anchor, grid.exit()).is_some()
}

pub fn repair_escape_path(grid: &mut Grid, from: Position) -> usize {
    let Some(path) = shortest(grid, from, grid.exit(), true) else {
        return 0;
    };
    let mut opened = 0;
    for pos in path {
        if grid.terrain(pos) == Terrain::Wall && grid.set_terrain(pos, Terrain::Open) {
            opened += 1;
        }
    }
    debug!(row = from.row, col = from.col, opened, "escape path repaired");
    opened
}

pub fn repair_disconnected(grid: &mut Grid, anchors: &[Position]) -> Vec<(Position, usize)> {
    let mut repairs = Vec::new();
    for anchor in anchors {
        if !grid.in_bounds(*anchor) || precheck(grid, *anchor) {
            continue;
        }
        let opened = repair_escape_path(grid, *anchor);
        repairs.push((*anchor, opened));
    }
    repairs
}

/// One mutation cycle: precheck (repair and stop on failure), then wall
/// additions that keep every anchor connected, then probabilistic shortcuts.
pub fn mutate(grid: &mut Grid, ctx: &MutationContext<'_>, rng: &mut Rng) -> MutationReport {
    let mut report = MutationReport {
        repairs: repair_disconnected(grid, ctx.anchors),
        ..MutationReport::default()
    };
    if report.repaired() {
        return report;
    }

    for _ in 0..ctx.attempts {
        let pos = random_interior(grid, rng);
        if !is_wall_candidate(grid, ctx, pos) {
            continue;
        }
        grid.set_terrain(pos, Terrain::Wall);
        if ctx.anchors.iter().all(|anchor| precheck(grid, *anchor)) {
            report.walls_added += 1;
        } else {
            grid.set_terrain(pos, Terrain::Open);
        }
    }

    for _ in 0..ctx.attempts {
        let pos = random_interior(grid, rng);
        if grid.terrain(pos) != Terrain::Wall || grid.open_neighbor_count(pos) < 2 {
            continue;
        }
        if rng.bool(ctx.shortcut_probability) && grid.set_terrain(pos, Terrain::Open) {
            report.walls_removed += 1;
        }
    }

    report
}

fn random_interior(grid: &Grid, rng: &mut Rng) -> Position {
    Position::new(rng.int(1, grid.rows() - 2), rng.int(1, grid.cols() - 2))
}

fn is_wall_candidate(grid: &Grid, ctx: &MutationContext<'_>, pos: Position) -> bool {
    grid.terrain(pos) == Terrain::Open
        && grid.occupant(pos).is_none()
        && !ctx.anchors.contains(&pos)
        && !ctx.protected.contains(&pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::generate_maze;

    fn context<'a>(anchors: &'a [Position], attempts: usize) -> MutationContext<'a> {
        MutationContext {
            anchors,
            protected: &[],
            attempts,
            shortcut_probability: 0.3,
        }
    }

    #[test]
    fn walled_corridor_triggers_repair_and_reconnects() {
        let mut grid = Grid::from_rows(&["#####", "S...#", "###.#", "#...E", "#####"])
            .expect("valid grid");
        grid.set_terrain(Position::new(2, 3), Terrain::Wall);
        let player = grid.start();
        assert!(!precheck(&grid, player));

        let mut rng = Rng::new(1);
        let report = mutate(&mut grid, &context(&[player], 10), &mut rng);
        assert_eq!(report.repairs.len(), 1);
        assert_eq!(report.repairs[0].0, player);
        assert!(report.repairs[0].1 >= 1);
        assert_eq!(report.walls_added, 0);
        assert_eq!(report.walls_removed, 0);
        assert!(precheck(&grid, player));
    }

    #[test]
    fn precheck_is_idempotent() {
        let mut grid = Grid::from_rows(&["#####", "S...#", "###.#", "#...E", "#####"])
            .expect("valid grid");
        let player = Position::new(1, 2);
        assert_eq!(precheck(&grid, player), precheck(&grid, player));
        grid.set_terrain(Position::new(1, 3), Terrain::Wall);
        let first = precheck(&grid, player);
        let second = precheck(&grid, player);
        assert!(!first);
        assert_eq!(first, second);
    }

    #[test]
    fn connectivity_holds_after_every_mutation() {
        for seed in 0..40u64 {
            let mut rng = Rng::new(seed);
            let mut grid = generate_maze(21, 21, &mut rng).expect("maze");
            let open: Vec<Position> = grid
                .positions()
                .filter(|p| grid.terrain(*p) == Terrain::Open)
                .collect();
            let player = open[rng.pick_index(open.len())];
            for _ in 0..20 {
                let attempts = mutation_attempts(&grid, 0.04);
                mutate(&mut grid, &context(&[player], attempts), &mut rng);
                assert!(precheck(&grid, player), "seed={seed}");
                assert!(grid.check_terminals().is_ok());
            }
        }
    }

    #[test]
    fn connectivity_restored_even_from_a_sealed_player() {
        let mut rng = Rng::new(9);
        let mut grid = generate_maze(15, 15, &mut rng).expect("maze");
        let player = Position::new(7, 7);
        grid.set_terrain(player, Terrain::Open);
        for n in grid.neighbors4(player) {
            grid.set_terrain(n, Terrain::Wall);
        }
        assert!(!precheck(&grid, player));
        let report = mutate(&mut grid, &context(&[player], 5), &mut rng);
        assert!(report.repaired());
        assert!(precheck(&grid, player));
    }

    #[test]
    fn protected_and_anchor_cells_are_never_walled() {
        let mut rng = Rng::new(21);
        let mut grid = generate_maze(21, 21, &mut rng).expect("maze");
        let open: Vec<Position> = grid
            .positions()
            .filter(|p| grid.terrain(*p) == Terrain::Open)
            .collect();
        let protected = open[..open.len() / 2].to_vec();
        let player = open[open.len() - 1];
        let ctx = MutationContext {
            anchors: &[player],
            protected: &protected,
            attempts: 200,
            shortcut_probability: 0.0,
        };
        let report = mutate(&mut grid, &ctx, &mut rng);
        assert_eq!(report.walls_removed, 0);
        assert!(protected.iter().all(|p| grid.is_open(*p)));
        assert!(grid.is_open(player));
    }

    #[test]
    fn shortcuts_only_open_walls_with_two_open_neighbours() {
        let mut grid = Grid::from_rows(&[
            "#######",
            "S.....#",
            "#.###.#",
            "#.....#",
            "#####.#",
            "#.....E",
            "#######",
        ])
        .expect("valid grid");
        let before = grid.clone();
        let all_open: Vec<Position> = grid.positions().filter(|p| grid.is_open(*p)).collect();
        let mut rng = Rng::new(3);
        let ctx = MutationContext {
            anchors: &[],
            protected: &all_open,
            attempts: 0,
            shortcut_probability: 1.0,
        };
        assert_eq!(mutate(&mut grid, &ctx, &mut rng), MutationReport::default());

        let ctx = MutationContext { attempts: 400, ..ctx };
        let report = mutate(&mut grid, &ctx, &mut rng);
        assert_eq!(report.walls_added, 0);
        assert!(report.walls_removed > 0);
        for pos in grid.positions() {
            if before.terrain(pos) == Terrain::Wall && grid.is_open(pos) {
                assert!(grid.is_interior(pos), "{pos:?}");
                assert!(grid.open_neighbor_count(pos) >= 2, "{pos:?}");
            }
        }
    }
}
