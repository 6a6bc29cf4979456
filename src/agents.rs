use tracing::debug;

use crate::constants::{
    COMPETITOR_BASE_CADENCE_MS, COMPETITOR_BASE_INTELLIGENCE, COMPETITOR_CADENCE_STEP_MS,
    COMPETITOR_INTELLIGENCE_STEP, COMPETITOR_MIN_CADENCE_MS, HAZARD_AGGRESSION,
    HAZARD_CADENCE_MS, OBSTACLE_AGGRESSION, OBSTACLE_CADENCE_MS, SABOTAGE_CADENCE_PENALTY_MS,
    SPAWN_MIN_DISTANCE, SPAWN_RELAXED_DISTANCE, SPAWN_RETRY_LIMIT,
};
use crate::grid::Grid;
use crate::pathfinding::{reachable_avoiding, shortest};
use crate::rng::Rng;
use crate::types::{AgentKind, AgentView, ContactOutcome, Occupant, Position, Terrain};

#[derive(Clone, Debug, PartialEq)]
pub struct AgentPolicy {
    pub aggression: f32,
    pub cadence_ms: u64,
    pub contact: ContactOutcome,
    pub marker: Option<Occupant>,
}

impl AgentPolicy {
    pub fn obstacle() -> Self {
        Self {
            aggression: OBSTACLE_AGGRESSION,
            cadence_ms: OBSTACLE_CADENCE_MS,
            contact: ContactOutcome::Penalty,
            marker: Some(Occupant::Obstacle),
        }
    }

    pub fn hazard() -> Self {
        Self {
            aggression: HAZARD_AGGRESSION,
            cadence_ms: HAZARD_CADENCE_MS,
            contact: ContactOutcome::Fatal,
            marker: Some(Occupant::Hazard),
        }
    }

    pub fn competitor(level: u32) -> Self {
        Self {
            aggression: competitor_intelligence(level),
            cadence_ms: competitor_cadence_ms(level),
            contact: ContactOutcome::Harmless,
            marker: None,
        }
    }

    pub fn for_kind(kind: AgentKind, level: u32) -> Self {
        match kind {
            AgentKind::Obstacle => Self::obstacle(),
            AgentKind::Hazard => Self::hazard(),
            AgentKind::Competitor => Self::competitor(level),
        }
    }
}

pub fn competitor_intelligence(level: u32) -> f32 {
    let steps = level.max(1) - 1;
    (COMPETITOR_BASE_INTELLIGENCE + COMPETITOR_INTELLIGENCE_STEP * steps as f32).min(1.0)
}

pub fn competitor_cadence_ms(level: u32) -> u64 {
    let steps = (level.max(1) - 1) as u64;
    COMPETITOR_BASE_CADENCE_MS
        .saturating_sub(COMPETITOR_CADENCE_STEP_MS * steps)
        .max(COMPETITOR_MIN_CADENCE_MS)
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub id: String,
    pub kind: AgentKind,
    pub position: Position,
    pub policy: AgentPolicy,
    pub last_move_ms: u64,
    pub visible: bool,
    pub slowed_until_ms: u64,
}

impl Agent {
    pub fn new(id: String, kind: AgentKind, position: Position, level: u32, now_ms: u64) -> Self {
        Self {
            id,
            kind,
            position,
            policy: AgentPolicy::for_kind(kind, level),
            last_move_ms: now_ms,
            visible: true,
            slowed_until_ms: 0,
        }
    }

    pub fn scale_with_level(&mut self, level: u32) {
        if self.kind != AgentKind::Competitor {
            return;
        }
        self.policy.aggression = competitor_intelligence(level);
        self.policy.cadence_ms = competitor_cadence_ms(level);
    }

    pub fn effective_cadence_ms(&self, now_ms: u64) -> u64 {
        if now_ms < self.slowed_until_ms {
            self.policy.cadence_ms + SABOTAGE_CADENCE_PENALTY_MS
        } else {
            self.policy.cadence_ms
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_move_ms) >= self.effective_cadence_ms(now_ms)
    }

    pub fn view(&self, now_ms: u64) -> AgentView {
        AgentView {
            id: self.id.clone(),
            kind: self.kind,
            position: self.position,
            visible: self.visible,
            cadence_ms: self.effective_cadence_ms(now_ms),
        }
    }
}

pub fn can_enter(grid: &Grid, agent: &Agent, pos: Position, others: &[Position]) -> bool {
    if !grid.in_bounds(pos) || !grid.is_open(pos) || others.contains(&pos) {
        return false;
    }
    match agent.policy.marker {
        Some(_) => grid.terrain(pos) == Terrain::Open && grid.occupant(pos).is_none(),
        None => !grid.occupant(pos).is_some_and(|o| o.is_agent_marker()),
    }
}

/// One movement decision: the first step of a searched path with probability
/// `aggression`, otherwise a shuffled-direction wander. `None` means stay.
pub fn choose_step(
    grid: &Grid,
    agent: &Agent,
    target: Position,
    others: &[Position],
    rng: &mut Rng,
) -> Option<Position> {
    if rng.bool(agent.policy.aggression) {
        if let Some(path) = shortest(grid, agent.position, target, false) {
            if path.len() > 1 && can_enter(grid, agent, path[1], others) {
                return Some(path[1]);
            }
        }
    }
    wander_step(grid, agent, others, rng)
}

pub fn wander_step(grid: &Grid, agent: &Agent, others: &[Position], rng: &mut Rng) -> Option<Position> {
    rng.shuffled_directions()
        .into_iter()
        .map(|dir| agent.position.offset(dir))
        .find(|next| !grid.is_terminal(*next) && can_enter(grid, agent, *next, others))
}

fn is_spawnable(grid: &Grid, pos: Position, taken: &[Position]) -> bool {
    grid.terrain(pos) == Terrain::Open && grid.occupant(pos).is_none() && !taken.contains(&pos)
}

/// Picks a spawn cell at least `SPAWN_MIN_DISTANCE` from every position in
/// `keep_away`, rejecting cells whose blocking would cut Start from Exit.
/// Falls back to a scan with a relaxed distance.
pub fn find_spawn(
    grid: &Grid,
    keep_away: &[Position],
    taken: &[Position],
    rng: &mut Rng,
) -> Option<Position> {
    let far_enough = |pos: Position, min: i32| keep_away.iter().all(|p| p.manhattan(pos) >= min);

    for _ in 0..SPAWN_RETRY_LIMIT {
        let pos = Position::new(rng.int(0, grid.rows() - 1), rng.int(0, grid.cols() - 1));
        if !is_spawnable(grid, pos, taken) || !far_enough(pos, SPAWN_MIN_DISTANCE) {
            continue;
        }
        if reachable_avoiding(grid, grid.start(), grid.exit(), &[pos]).is_none() {
            continue;
        }
        return Some(pos);
    }

    let fallback: Vec<Position> = grid
        .positions()
        .filter(|pos| is_spawnable(grid, *pos, taken) && far_enough(*pos, SPAWN_RELAXED_DISTANCE))
        .collect();
    if fallback.is_empty() {
        debug!("no spawn cell satisfies the relaxed distance");
        return None;
    }
    Some(fallback[rng.pick_index(fallback.len())])
}
