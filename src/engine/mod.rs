use tracing::{debug, info, warn};

use crate::agents::{choose_step, find_spawn, Agent};
use crate::constants::{
    HINT_COOLDOWN_MS, LANTERN_DURATION_MS, MAX_HINTS_PER_LEVEL, PICKUP_TIME_BONUS_MS,
    PLAYER_MOVE_COOLDOWN_MS, ROTATION_RADIUS, SABOTAGE_DURATION_MS, SHORTCUT_PROBABILITY,
    TRAP_STUN_MS,
};
use crate::error::LevelError;
use crate::grid::Grid;
use crate::mutator::{mutate, mutation_attempts, precheck, repair_disconnected, MutationContext};
use crate::pathfinding::shortest;
use crate::rng::Rng;
use crate::topology::{RotatingRegion, ShiftingWall};
use crate::types::{
    AgentKind, AgentView, DifficultySettings, Direction, HintStatus, LevelStatus, MoveResult,
    Occupant, Path, PickupKind, PlayerView, Position, Snapshot, TickEvent, TopologyKind,
};
use crate::world::generate_level;

mod agent_system;
mod mutation_system;
mod player_system;
mod topology_system;

#[derive(Clone, Debug)]
struct PlayerInternal {
    position: Position,
    checkpoint: Position,
    last_move_ms: Option<u64>,
    stunned_until: u64,
    items_collected: u32,
}

impl PlayerInternal {
    fn at(start: Position) -> Self {
        Self {
            position: start,
            checkpoint: start,
            last_move_ms: None,
            stunned_until: 0,
            items_collected: 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct HintState {
    used: u32,
    last_used_ms: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct GameEngineOptions {
    pub time_limit_ms_override: Option<u64>,
    pub start_level: u32,
    pub hint_cooldown_ms: u64,
    pub max_hints_per_level: u32,
    pub player_move_cooldown_ms: u64,
}

impl Default for GameEngineOptions {
    fn default() -> Self {
        Self {
            time_limit_ms_override: None,
            start_level: 1,
            hint_cooldown_ms: HINT_COOLDOWN_MS,
            max_hints_per_level: MAX_HINTS_PER_LEVEL,
            player_move_cooldown_ms: PLAYER_MOVE_COOLDOWN_MS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameEngine {
    pub level: u32,
    pub settings: DifficultySettings,

    options: GameEngineOptions,
    grid: Grid,
    rng: Rng,
    player: PlayerInternal,
    agents: Vec<Agent>,
    rotating_regions: Vec<RotatingRegion>,
    shifting_walls: Vec<ShiftingWall>,
    hints: HintState,
    pending_events: Vec<TickEvent>,
    status: LevelStatus,
    /// Agent id and cell of the contact already reported to the caller.
    last_contact: Option<(String, Position)>,

    deadline_ms: u64,
    last_mutation_ms: u64,
    lantern_until_ms: u64,
    tick_counter: u64,
    next_id_counter: u64,
}

impl GameEngine {
    pub fn new(seed: u64, options: GameEngineOptions, now_ms: u64) -> Result<Self, LevelError> {
        let mut rng = Rng::new(seed);
        let generated = generate_level(options.start_level.max(1), &mut rng)?;
        let start = generated.grid.start();
        let mut engine = Self {
            level: generated.settings.level,
            settings: generated.settings,
            options,
            grid: generated.grid,
            rng,
            player: PlayerInternal::at(start),
            agents: Vec::new(),
            rotating_regions: Vec::new(),
            shifting_walls: Vec::new(),
            hints: HintState::default(),
            pending_events: Vec::new(),
            status: LevelStatus::Running,
            last_contact: None,
            deadline_ms: now_ms,
            last_mutation_ms: now_ms,
            lantern_until_ms: 0,
            tick_counter: 0,
            next_id_counter: 1,
        };
        engine.reset_level_state(now_ms)?;
        Ok(engine)
    }

    pub fn start_level(&mut self, level: u32, now_ms: u64) -> Result<(), LevelError> {
        let generated = generate_level(level.max(1), &mut self.rng)?;
        self.level = generated.settings.level;
        self.settings = generated.settings;
        self.grid = generated.grid;
        self.reset_level_state(now_ms)
    }

    pub fn next_level(&mut self, now_ms: u64) -> Result<(), LevelError> {
        self.start_level(self.level + 1, now_ms)
    }

    pub fn restart(&mut self, now_ms: u64) -> Result<(), LevelError> {
        self.start_level(1, now_ms)
    }

    fn reset_level_state(&mut self, now_ms: u64) -> Result<(), LevelError> {
        self.player = PlayerInternal::at(self.grid.start());
        self.agents.clear();
        self.rotating_regions.clear();
        self.shifting_walls.clear();
        self.hints = HintState::default();
        self.pending_events.clear();
        self.status = LevelStatus::Running;
        self.last_contact = None;
        self.deadline_ms = now_ms.saturating_add(
            self.options
                .time_limit_ms_override
                .unwrap_or(self.settings.time_limit_ms),
        );
        self.last_mutation_ms = now_ms;
        self.lantern_until_ms = 0;

        self.spawn_agents(now_ms);
        self.spawn_modifiers(now_ms);
        self.update_visibility(now_ms);
        self.check_invariants()?;

        info!(
            level = self.level,
            agents = self.agents.len(),
            rotating_regions = self.rotating_regions.len(),
            shifting_walls = self.shifting_walls.len(),
            "level started"
        );
        Ok(())
    }

    pub fn status(&self) -> LevelStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == LevelStatus::Running
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn player_position(&self) -> Position {
        self.player.position
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn time_left_ms(&self, now_ms: u64) -> u64 {
        self.deadline_ms.saturating_sub(now_ms)
    }

    /// Advances one frame. Phases run in a fixed order: events queued by
    /// player moves, mutation, topology, agents, then collision and timer
    /// checks against the settled positions.
    pub fn tick(&mut self, now_ms: u64) -> Result<Vec<TickEvent>, LevelError> {
        let mut events = std::mem::take(&mut self.pending_events);
        if !self.is_running() {
            return Ok(events);
        }
        self.tick_counter += 1;

        self.update_visibility(now_ms);
        self.update_mutation(now_ms, &mut events);
        self.update_topology(now_ms, &mut events);
        self.update_agents(now_ms, &mut events);
        if self.is_running() {
            self.check_collisions(&mut events);
            self.check_time(now_ms, &mut events);
        }
        self.check_invariants()?;
        Ok(events)
    }

    pub fn build_snapshot(&self, now_ms: u64) -> Snapshot {
        let mut tiles = self.grid.to_tiles();
        for agent in self.agents.iter().filter(|agent| !agent.visible) {
            let row = agent.position.row as usize;
            let col = agent.position.col as usize;
            if let Some(line) = tiles.get_mut(row) {
                if col < line.len() {
                    line.replace_range(col..col + 1, ".");
                }
            }
        }

        Snapshot {
            tick: self.tick_counter,
            now_ms,
            level: self.level,
            status: self.status,
            time_left_ms: self.time_left_ms(now_ms),
            tiles,
            player: PlayerView {
                position: self.player.position,
                checkpoint: self.player.checkpoint,
                stunned_until: self.player.stunned_until,
                items_collected: self.player.items_collected,
            },
            agents: self
                .agents
                .iter()
                .map(|agent| agent.view(now_ms))
                .collect::<Vec<AgentView>>(),
            hints: self.hint_status(),
        }
    }

    fn anchor_positions(&self) -> Vec<Position> {
        let mut anchors = vec![self.player.position];
        anchors.extend(
            self.agents
                .iter()
                .filter(|agent| agent.kind == AgentKind::Competitor)
                .map(|agent| agent.position),
        );
        anchors
    }

    fn agent_positions(&self, exclude: Option<usize>) -> Vec<Position> {
        self.agents
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != exclude)
            .map(|(_, agent)| agent.position)
            .collect()
    }

    fn entity_positions(&self) -> Vec<Position> {
        let mut positions = self.agent_positions(None);
        positions.push(self.player.position);
        positions
    }

    fn check_invariants(&mut self) -> Result<(), LevelError> {
        self.grid.check_terminals()?;
        for anchor in self.anchor_positions() {
            if precheck(&self.grid, anchor) {
                continue;
            }
            let repairs = repair_disconnected(&mut self.grid, &[anchor]);
            debug!(?repairs, "late connectivity repair");
            if !precheck(&self.grid, anchor) {
                return Err(LevelError::Disconnected { from: anchor });
            }
            for (from, cells_opened) in repairs {
                self.pending_events
                    .push(TickEvent::ConnectivityRepaired { from, cells_opened });
            }
        }
        Ok(())
    }

    fn make_id(&mut self, prefix: &str) -> String {
        let id = format!("{}_{}", prefix, self.next_id_counter);
        self.next_id_counter = self.next_id_counter.saturating_add(1);
        id
    }
}
