use serde::Serialize;

pub type Path = Vec<Position>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn manhattan(self, other: Position) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }

    pub fn offset(self, dir: Direction) -> Position {
        let (dr, dc) = dir.delta();
        Position::new(self.row + dr, self.col + dc)
    }

    pub fn direction_to(self, other: Position) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|dir| self.offset(*dir) == other)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Wall,
    Open,
    Start,
    Exit,
}

impl Terrain {
    pub fn is_terminal(self) -> bool {
        matches!(self, Terrain::Start | Terrain::Exit)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupKind {
    TimeBonus,
    Lantern,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Occupant {
    Obstacle,
    Hazard,
    Pickup { kind: PickupKind },
    Trap,
    Checkpoint,
    Sabotage,
}

impl Occupant {
    pub fn is_agent_marker(self) -> bool {
        matches!(self, Occupant::Obstacle | Occupant::Hazard)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Wall,
    Open,
    Start,
    Exit,
    Obstacle,
    Hazard,
    Pickup(PickupKind),
    Trap,
    Checkpoint,
    Sabotage,
}

impl From<Terrain> for CellKind {
    fn from(terrain: Terrain) -> Self {
        match terrain {
            Terrain::Wall => CellKind::Wall,
            Terrain::Open => CellKind::Open,
            Terrain::Start => CellKind::Start,
            Terrain::Exit => CellKind::Exit,
        }
    }
}

impl From<Occupant> for CellKind {
    fn from(occupant: Occupant) -> Self {
        match occupant {
            Occupant::Obstacle => CellKind::Obstacle,
            Occupant::Hazard => CellKind::Hazard,
            Occupant::Pickup { kind } => CellKind::Pickup(kind),
            Occupant::Trap => CellKind::Trap,
            Occupant::Checkpoint => CellKind::Checkpoint,
            Occupant::Sabotage => CellKind::Sabotage,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Obstacle,
    Hazard,
    Competitor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactOutcome {
    Penalty,
    Fatal,
    Harmless,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    RotatingRegion,
    ShiftingWall,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DifficultySettings {
    pub level: u32,
    pub rows: i32,
    pub cols: i32,
    #[serde(rename = "obstacleCount")]
    pub obstacle_count: usize,
    #[serde(rename = "hazardCount")]
    pub hazard_count: usize,
    #[serde(rename = "pickupCount")]
    pub pickup_count: usize,
    #[serde(rename = "trapCount")]
    pub trap_count: usize,
    #[serde(rename = "checkpointCount")]
    pub checkpoint_count: usize,
    #[serde(rename = "sabotageCount")]
    pub sabotage_count: usize,
    #[serde(rename = "timeLimitMs")]
    pub time_limit_ms: u64,
    #[serde(rename = "mutationIntervalMs")]
    pub mutation_interval_ms: u64,
    #[serde(rename = "mutationFactor")]
    pub mutation_factor: f32,
    #[serde(rename = "competitorEnabled")]
    pub competitor_enabled: bool,
    #[serde(rename = "shiftingWallCount")]
    pub shifting_wall_count: usize,
    #[serde(rename = "rotatingRegionCount")]
    pub rotating_region_count: usize,
    #[serde(rename = "hiddenHazards")]
    pub hidden_hazards: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    Running,
    PlayerEscaped,
    CompetitorEscaped,
    TimeExpired,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TickEvent {
    MutationApplied {
        #[serde(rename = "wallsAdded")]
        walls_added: usize,
        #[serde(rename = "wallsRemoved")]
        walls_removed: usize,
    },
    AgentMoved {
        #[serde(rename = "agentId")]
        agent_id: String,
        position: Position,
    },
    AgentRelocated {
        #[serde(rename = "agentId")]
        agent_id: String,
        position: Position,
    },
    AgentReachedExit {
        #[serde(rename = "agentId")]
        agent_id: String,
    },
    AgentCollided {
        #[serde(rename = "agentId")]
        agent_id: String,
        kind: AgentKind,
        outcome: ContactOutcome,
    },
    ConnectivityRepaired {
        from: Position,
        #[serde(rename = "cellsOpened")]
        cells_opened: usize,
    },
    TopologyTransformed {
        kind: TopologyKind,
    },
    ItemCollected {
        occupant: Occupant,
        position: Position,
    },
    TimeExpired,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MoveResult {
    Moved {
        position: Position,
    },
    BlockedByWall,
    BlockedByCooldown {
        #[serde(rename = "readyAtMs")]
        ready_at_ms: u64,
    },
    ReachedExit,
    CollidedWithObstacle {
        #[serde(rename = "agentId")]
        agent_id: String,
    },
    CollidedWithHazard {
        #[serde(rename = "agentId")]
        agent_id: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HintStatus {
    pub used: u32,
    pub max: u32,
    #[serde(rename = "readyAtMs")]
    pub ready_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub position: Position,
    pub checkpoint: Position,
    #[serde(rename = "stunnedUntil")]
    pub stunned_until: u64,
    #[serde(rename = "itemsCollected")]
    pub items_collected: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentView {
    pub id: String,
    pub kind: AgentKind,
    pub position: Position,
    pub visible: bool,
    #[serde(rename = "cadenceMs")]
    pub cadence_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    pub level: u32,
    pub status: LevelStatus,
    #[serde(rename = "timeLeftMs")]
    pub time_left_ms: u64,
    pub tiles: Vec<String>,
    pub player: PlayerView,
    pub agents: Vec<AgentView>,
    pub hints: HintStatus,
}
