use crate::error::LevelError;
use crate::types::{CellKind, Occupant, Position, Terrain};

/// The single shared maze. Terrain and transient occupants live on separate
/// layers so clearing an occupant always restores the cell underneath.
#[derive(Clone, Debug)]
pub struct Grid {
    rows: i32,
    cols: i32,
    terrain: Vec<Terrain>,
    occupants: Vec<Option<Occupant>>,
    start: Position,
    exit: Position,
}

impl Grid {
    pub fn new(rows: i32, cols: i32) -> Result<Self, LevelError> {
        if rows < 5 || cols < 5 || rows % 2 == 0 || cols % 2 == 0 {
            return Err(LevelError::InvalidExtents { rows, cols });
        }
        let len = (rows * cols) as usize;
        let start = Position::new(1, 0);
        let exit = Position::new(rows - 2, cols - 1);
        let mut grid = Self {
            rows,
            cols,
            terrain: vec![Terrain::Wall; len],
            occupants: vec![None; len],
            start,
            exit,
        };
        let start_idx = grid.index(start);
        let exit_idx = grid.index(exit);
        grid.terrain[start_idx] = Terrain::Start;
        grid.terrain[exit_idx] = Terrain::Exit;
        Ok(grid)
    }

    pub fn from_rows(rows: &[&str]) -> Result<Self, LevelError> {
        let height = rows.len() as i32;
        let width = rows.first().map(|row| row.chars().count()).unwrap_or(0) as i32;
        if rows.iter().any(|row| row.chars().count() as i32 != width) {
            return Err(LevelError::MalformedGrid("ragged rows".to_string()));
        }
        let mut terrain = Vec::with_capacity((height * width).max(0) as usize);
        let mut start = None;
        let mut exit = None;
        for (r, row) in rows.iter().enumerate() {
            for (c, ch) in row.chars().enumerate() {
                let pos = Position::new(r as i32, c as i32);
                let cell = match ch {
                    '#' => Terrain::Wall,
                    '.' => Terrain::Open,
                    'S' => {
                        if start.replace(pos).is_some() {
                            return Err(LevelError::MalformedGrid("more than one start".into()));
                        }
                        Terrain::Start
                    }
                    'E' => {
                        if exit.replace(pos).is_some() {
                            return Err(LevelError::MalformedGrid("more than one exit".into()));
                        }
                        Terrain::Exit
                    }
                    other => {
                        return Err(LevelError::MalformedGrid(format!(
                            "unexpected cell '{other}' at ({r}, {c})"
                        )))
                    }
                };
                terrain.push(cell);
            }
        }
        let (Some(start), Some(exit)) = (start, exit) else {
            return Err(LevelError::MalformedGrid("missing start or exit".into()));
        };
        let len = terrain.len();
        Ok(Self {
            rows: height,
            cols: width,
            terrain,
            occupants: vec![None; len],
            start,
            exit,
        })
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn exit(&self) -> Position {
        self.exit
    }

    pub fn len(&self) -> usize {
        self.terrain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terrain.is_empty()
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.col >= 0 && pos.row < self.rows && pos.col < self.cols
    }

    pub fn is_interior(&self, pos: Position) -> bool {
        pos.row > 0 && pos.col > 0 && pos.row < self.rows - 1 && pos.col < self.cols - 1
    }

    pub(crate) fn index(&self, pos: Position) -> usize {
        (pos.row * self.cols + pos.col) as usize
    }

    pub(crate) fn position_of(&self, index: usize) -> Position {
        Position::new(index as i32 / self.cols, index as i32 % self.cols)
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.len()).map(|idx| self.position_of(idx))
    }

    pub fn terrain(&self, pos: Position) -> Terrain {
        if !self.in_bounds(pos) {
            return Terrain::Wall;
        }
        self.terrain[self.index(pos)]
    }

    pub fn occupant(&self, pos: Position) -> Option<Occupant> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.occupants[self.index(pos)]
    }

    pub fn classify(&self, pos: Position) -> CellKind {
        match self.occupant(pos) {
            Some(occupant) => occupant.into(),
            None => self.terrain(pos).into(),
        }
    }

    pub fn is_open(&self, pos: Position) -> bool {
        self.terrain(pos) != Terrain::Wall
    }

    pub fn is_terminal(&self, pos: Position) -> bool {
        pos == self.start || pos == self.exit
    }

    pub fn neighbors4(&self, pos: Position) -> Vec<Position> {
        [
            Position::new(pos.row - 1, pos.col),
            Position::new(pos.row + 1, pos.col),
            Position::new(pos.row, pos.col - 1),
            Position::new(pos.row, pos.col + 1),
        ]
        .into_iter()
        .filter(|n| self.in_bounds(*n))
        .collect()
    }

    pub fn open_neighbor_count(&self, pos: Position) -> usize {
        self.neighbors4(pos)
            .into_iter()
            .filter(|n| self.is_open(*n))
            .count()
    }

    /// Writes `Wall` or `Open`. Terminals are never overwritten and occupied
    /// cells are never walled over.
    pub fn set_terrain(&mut self, pos: Position, terrain: Terrain) -> bool {
        if !self.in_bounds(pos) || terrain.is_terminal() || self.is_terminal(pos) {
            return false;
        }
        let idx = self.index(pos);
        if terrain == Terrain::Wall && self.occupants[idx].is_some() {
            return false;
        }
        self.terrain[idx] = terrain;
        true
    }

    pub fn place_occupant(&mut self, pos: Position, occupant: Occupant) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        let idx = self.index(pos);
        if self.terrain[idx] != Terrain::Open || self.occupants[idx].is_some() {
            return false;
        }
        self.occupants[idx] = Some(occupant);
        true
    }

    pub fn clear_occupant(&mut self, pos: Position) -> Option<Occupant> {
        if !self.in_bounds(pos) {
            return None;
        }
        let idx = self.index(pos);
        self.occupants[idx].take()
    }

    /// Raw cell write used by topology transforms. Terminal cells are skipped.
    pub(crate) fn write_cell(&mut self, pos: Position, terrain: Terrain, occupant: Option<Occupant>) {
        if !self.in_bounds(pos) || self.is_terminal(pos) || terrain.is_terminal() {
            return;
        }
        let idx = self.index(pos);
        self.terrain[idx] = terrain;
        self.occupants[idx] = if terrain == Terrain::Open { occupant } else { None };
    }

    pub fn check_terminals(&self) -> Result<(), LevelError> {
        for (pos, expected) in [(self.start, Terrain::Start), (self.exit, Terrain::Exit)] {
            let idx = self.index(pos);
            if self.terrain[idx] != expected || self.occupants[idx].is_some() {
                return Err(LevelError::TerminalOverwritten {
                    expected,
                    position: pos,
                });
            }
        }
        let starts = self.terrain.iter().filter(|t| **t == Terrain::Start).count();
        let exits = self.terrain.iter().filter(|t| **t == Terrain::Exit).count();
        if starts != 1 {
            return Err(LevelError::TerminalOverwritten {
                expected: Terrain::Start,
                position: self.start,
            });
        }
        if exits != 1 {
            return Err(LevelError::TerminalOverwritten {
                expected: Terrain::Exit,
                position: self.exit,
            });
        }
        Ok(())
    }

    pub fn to_tiles(&self) -> Vec<String> {
        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| tile_char(self.classify(Position::new(row, col))))
                    .collect()
            })
            .collect()
    }
}

fn tile_char(kind: CellKind) -> char {
    match kind {
        CellKind::Wall => '#',
        CellKind::Open => '.',
        CellKind::Start => 'S',
        CellKind::Exit => 'E',
        CellKind::Obstacle => 'O',
        CellKind::Hazard => 'H',
        CellKind::Pickup(_) => '+',
        CellKind::Trap => '^',
        CellKind::Checkpoint => 'C',
        CellKind::Sabotage => '$',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PickupKind;

    fn corridor() -> Grid {
        Grid::from_rows(&["#####", "S...#", "###.#", "#...E", "#####"]).expect("valid grid")
    }

    #[test]
    fn new_rejects_even_or_tiny_extents() {
        assert!(Grid::new(4, 5).is_err());
        assert!(Grid::new(5, 6).is_err());
        assert!(Grid::new(3, 3).is_err());
        let grid = Grid::new(7, 9).expect("valid extents");
        assert_eq!(grid.classify(Position::new(1, 0)), CellKind::Start);
        assert_eq!(grid.classify(Position::new(5, 8)), CellKind::Exit);
        assert!(grid.check_terminals().is_ok());
    }

    #[test]
    fn from_rows_rejects_missing_or_duplicate_terminals() {
        assert!(Grid::from_rows(&["#####", "S...#", "#####"]).is_err());
        assert!(Grid::from_rows(&["SS..E"]).is_err());
        assert!(Grid::from_rows(&["S..", "..E."]).is_err());
        assert!(Grid::from_rows(&["S.x.E"]).is_err());
    }

    #[test]
    fn neighbors_are_filtered_to_bounds() {
        let grid = corridor();
        assert_eq!(grid.neighbors4(Position::new(0, 0)).len(), 2);
        assert_eq!(grid.neighbors4(Position::new(2, 2)).len(), 4);
        assert_eq!(grid.open_neighbor_count(Position::new(2, 3)), 2);
    }

    #[test]
    fn occupants_are_exclusive_and_restore_terrain() {
        let mut grid = corridor();
        let cell = Position::new(1, 2);
        assert!(grid.place_occupant(cell, Occupant::Trap));
        assert!(!grid.place_occupant(cell, Occupant::Obstacle));
        assert_eq!(grid.classify(cell), CellKind::Trap);
        assert!(grid.is_open(cell));
        assert!(!grid.set_terrain(cell, Terrain::Wall));

        assert_eq!(grid.clear_occupant(cell), Some(Occupant::Trap));
        assert_eq!(grid.classify(cell), CellKind::Open);
        assert!(grid.place_occupant(
            cell,
            Occupant::Pickup {
                kind: PickupKind::TimeBonus
            }
        ));
    }

    #[test]
    fn terminals_cannot_be_overwritten_or_occupied() {
        let mut grid = corridor();
        let start = grid.start();
        let exit = grid.exit();
        assert!(!grid.set_terrain(start, Terrain::Wall));
        assert!(!grid.set_terrain(exit, Terrain::Open));
        assert!(!grid.place_occupant(start, Occupant::Hazard));
        assert!(!grid.place_occupant(exit, Occupant::Checkpoint));
        assert!(!grid.set_terrain(Position::new(2, 2), Terrain::Start));
        grid.write_cell(exit, Terrain::Wall, None);
        assert!(grid.check_terminals().is_ok());
    }

    #[test]
    fn out_of_bounds_reads_as_wall() {
        let grid = corridor();
        assert_eq!(grid.classify(Position::new(-1, 2)), CellKind::Wall);
        assert!(!grid.is_open(Position::new(9, 9)));
        assert_eq!(grid.occupant(Position::new(5, 0)), None);
    }

    #[test]
    fn tiles_render_occupants_over_terrain() {
        let mut grid = corridor();
        grid.place_occupant(Position::new(3, 1), Occupant::Hazard);
        let tiles = grid.to_tiles();
        assert_eq!(tiles[1], "S...#");
        assert_eq!(tiles[3], "#H..E");
    }
}
