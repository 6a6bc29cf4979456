use tracing::{debug, info};

use crate::constants::{difficulty_for_level, ITEM_MIN_DISTANCE_FROM_START, LOOP_FRACTION};
use crate::error::LevelError;
use crate::grid::Grid;
use crate::pathfinding::reachable;
use crate::rng::Rng;
use crate::types::{DifficultySettings, Occupant, PickupKind, Position, Terrain};

#[derive(Clone, Debug)]
pub struct GeneratedLevel {
    pub grid: Grid,
    pub settings: DifficultySettings,
}

pub fn generate_level(level: u32, rng: &mut Rng) -> Result<GeneratedLevel, LevelError> {
    let settings = difficulty_for_level(level);
    let mut grid = generate_maze(settings.rows, settings.cols, rng)?;
    if reachable(&grid, grid.start(), grid.exit()).is_none() {
        return Err(LevelError::Disconnected { from: grid.start() });
    }

    let mut items = Vec::new();
    for idx in 0..settings.pickup_count {
        // Every third pickup is a lantern once hazards can hide.
        let kind = if settings.hidden_hazards && idx % 3 == 2 {
            PickupKind::Lantern
        } else {
            PickupKind::TimeBonus
        };
        items.push(Occupant::Pickup { kind });
    }
    items.extend(std::iter::repeat_n(Occupant::Trap, settings.trap_count));
    items.extend(std::iter::repeat_n(Occupant::Checkpoint, settings.checkpoint_count));
    items.extend(std::iter::repeat_n(Occupant::Sabotage, settings.sabotage_count));
    let placed = scatter_items(&mut grid, &items, rng);

    info!(
        level,
        rows = settings.rows,
        cols = settings.cols,
        items = placed,
        "level generated"
    );
    Ok(GeneratedLevel { grid, settings })
}

pub fn generate_maze(rows: i32, cols: i32, rng: &mut Rng) -> Result<Grid, LevelError> {
    let mut grid = Grid::new(rows, cols)?;
    let seed = Position::new(odd_in(rows, rng), odd_in(cols, rng));
    carve_passages(&mut grid, seed, rng);
    augment_loops(&mut grid, rng);

    let start = grid.start();
    let exit = grid.exit();
    grid.set_terrain(Position::new(start.row, start.col + 1), Terrain::Open);
    grid.set_terrain(Position::new(exit.row, exit.col - 1), Terrain::Open);
    Ok(grid)
}

fn odd_in(extent: i32, rng: &mut Rng) -> i32 {
    let slots = (extent - 1) / 2;
    rng.int(0, slots - 1) * 2 + 1
}

fn carve_passages(grid: &mut Grid, seed: Position, rng: &mut Rng) {
    grid.set_terrain(seed, Terrain::Open);
    let mut stack = vec![(seed, rng.shuffled_directions(), 0usize)];

    while let Some((cell, dirs, next)) = stack.last_mut() {
        if *next >= dirs.len() {
            stack.pop();
            continue;
        }
        let dir = dirs[*next];
        *next += 1;
        let cell = *cell;

        let (dr, dc) = dir.delta();
        let target = Position::new(cell.row + dr * 2, cell.col + dc * 2);
        if !grid.is_interior(target) || grid.terrain(target) != Terrain::Wall {
            continue;
        }
        grid.set_terrain(Position::new(cell.row + dr, cell.col + dc), Terrain::Open);
        grid.set_terrain(target, Terrain::Open);
        stack.push((target, rng.shuffled_directions(), 0));
    }
}

fn augment_loops(grid: &mut Grid, rng: &mut Rng) {
    let attempts = (grid.len() as f32 * LOOP_FRACTION).round() as usize;
    let mut opened = 0;
    for _ in 0..attempts {
        let pos = Position::new(
            rng.int(1, grid.rows() - 2),
            rng.int(1, grid.cols() - 2),
        );
        if grid.terrain(pos) != Terrain::Wall {
            continue;
        }
        if grid.open_neighbor_count(pos) >= 2 && grid.set_terrain(pos, Terrain::Open) {
            opened += 1;
        }
    }
    debug!(attempts, opened, "loop augmentation");
}

pub fn scatter_items(grid: &mut Grid, items: &[Occupant], rng: &mut Rng) -> usize {
    let start = grid.start();
    let mut candidates: Vec<Position> = grid
        .positions()
        .filter(|pos| {
            grid.terrain(*pos) == Terrain::Open
                && grid.occupant(*pos).is_none()
                && pos.manhattan(start) >= ITEM_MIN_DISTANCE_FROM_START
        })
        .collect();
    rng.shuffle(&mut candidates);

    let mut placed = 0;
    for (item, pos) in items.iter().zip(candidates) {
        if grid.place_occupant(pos, *item) {
            placed += 1;
        }
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathfinding::reachable_cells;

    fn open_cells(grid: &Grid) -> Vec<Position> {
        grid.positions().filter(|p| grid.is_open(*p)).collect()
    }

    #[test]
    fn generated_mazes_connect_start_to_exit() {
        for seed in 0..100u64 {
            let mut rng = Rng::new(seed);
            let grid = generate_maze(21, 21, &mut rng).expect("maze");
            assert!(
                reachable(&grid, grid.start(), grid.exit()).is_some(),
                "seed={seed}"
            );
            assert!(grid.check_terminals().is_ok());
        }
    }

    #[test]
    fn every_open_cell_is_reachable_from_start() {
        for seed in 0..100u64 {
            let mut rng = Rng::new(seed);
            let grid = generate_maze(25, 31, &mut rng).expect("maze");
            let reached = reachable_cells(&grid, grid.start());
            for pos in open_cells(&grid) {
                assert!(reached.contains(&pos), "isolated pocket: seed={seed}, pos={pos:?}");
            }
        }
    }

    #[test]
    fn backtracker_alone_carves_a_perfect_maze() {
        for seed in 0..30u64 {
            let mut rng = Rng::new(seed);
            let mut grid = Grid::new(15, 15).expect("extents");
            let origin = Position::new(odd_in(15, &mut rng), odd_in(15, &mut rng));
            carve_passages(&mut grid, origin, &mut rng);

            let interior: Vec<Position> = open_cells(&grid)
                .into_iter()
                .filter(|p| grid.is_interior(*p))
                .collect();
            // A spanning tree over odd cells: 7*7 nodes, one fewer edge.
            assert_eq!(interior.len(), 49 + 48, "seed={seed}");
            let reached = reachable_cells(&grid, origin);
            assert!(interior.iter().all(|p| reached.contains(p)));
        }
    }

    #[test]
    fn loop_augmentation_keeps_the_border_closed() {
        let mut rng = Rng::new(5);
        let grid = generate_maze(21, 21, &mut rng).expect("maze");
        for pos in grid.positions().filter(|p| !grid.is_interior(*p)) {
            if grid.is_terminal(pos) {
                continue;
            }
            assert_eq!(grid.terrain(pos), Terrain::Wall, "{pos:?}");
        }
    }

    #[test]
    fn loop_augmentation_adds_cycles_without_flooding() {
        let mut rng = Rng::new(11);
        let grid = generate_maze(31, 31, &mut rng).expect("maze");
        let interior_open = open_cells(&grid)
            .into_iter()
            .filter(|p| grid.is_interior(*p))
            .count();
        let tree_cells = 15 * 15 * 2 - 1;
        assert!(interior_open > tree_cells);
        assert!(interior_open < (29 * 29) * 3 / 4);
    }

    #[test]
    fn same_seed_reproduces_the_same_maze() {
        let a = generate_maze(21, 21, &mut Rng::new(77)).expect("maze");
        let b = generate_maze(21, 21, &mut Rng::new(77)).expect("maze");
        assert_eq!(a.to_tiles(), b.to_tiles());
    }

    #[test]
    fn generated_level_places_items_off_terminals() {
        for seed in 0..20u64 {
            let mut rng = Rng::new(seed);
            let level = generate_level(7, &mut rng).expect("level");
            let settings = &level.settings;
            let grid = &level.grid;
            let expected = settings.pickup_count
                + settings.trap_count
                + settings.checkpoint_count
                + settings.sabotage_count;
            let placed = grid.positions().filter(|p| grid.occupant(*p).is_some()).count();
            assert_eq!(placed, expected);
            assert!(grid.occupant(grid.start()).is_none());
            assert!(grid.occupant(grid.exit()).is_none());
            for pos in grid.positions().filter(|p| grid.occupant(*p).is_some()) {
                assert!(pos.manhattan(grid.start()) >= ITEM_MIN_DISTANCE_FROM_START);
            }
            assert_eq!(grid.rows(), settings.rows);
        }
    }
}
