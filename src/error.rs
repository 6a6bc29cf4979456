use crate::types::{Position, Terrain};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    #[error("maze extents must be odd and at least 5x5, got {rows}x{cols}")]
    InvalidExtents { rows: i32, cols: i32 },

    #[error("malformed grid: {0}")]
    MalformedGrid(String),

    #[error("{expected:?} cell at ({}, {}) was overwritten", .position.row, .position.col)]
    TerminalOverwritten {
        expected: Terrain,
        position: Position,
    },

    #[error("exit unreachable from ({}, {}) after repair", .from.row, .from.col)]
    Disconnected { from: Position },
}
