use crate::types::DifficultySettings;

pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const BASE_MAZE_SIDE: i32 = 21;
pub const MAX_MAZE_SIDE: i32 = 41;
pub const LOOP_FRACTION: f32 = 0.15;
pub const SHORTCUT_PROBABILITY: f32 = 0.3;

pub const PLAYER_MOVE_COOLDOWN_MS: u64 = 100;
pub const HINT_COOLDOWN_MS: u64 = 10_000;
pub const MAX_HINTS_PER_LEVEL: u32 = 3;

pub const OBSTACLE_AGGRESSION: f32 = 0.7;
pub const HAZARD_AGGRESSION: f32 = 0.9;
pub const OBSTACLE_CADENCE_MS: u64 = 600;
pub const HAZARD_CADENCE_MS: u64 = 450;

pub const COMPETITOR_BASE_INTELLIGENCE: f32 = 0.5;
pub const COMPETITOR_INTELLIGENCE_STEP: f32 = 0.08;
pub const COMPETITOR_BASE_CADENCE_MS: u64 = 500;
pub const COMPETITOR_CADENCE_STEP_MS: u64 = 30;
pub const COMPETITOR_MIN_CADENCE_MS: u64 = 200;

pub const SPAWN_RETRY_LIMIT: usize = 100;
pub const SPAWN_MIN_DISTANCE: i32 = 8;
pub const SPAWN_RELAXED_DISTANCE: i32 = 3;
pub const ITEM_MIN_DISTANCE_FROM_START: i32 = 4;

pub const ROTATION_RADIUS: i32 = 2;
pub const ROTATION_INTERVAL_MS: u64 = 7_000;
pub const SHIFT_INTERVAL_MS: u64 = 1_500;
pub const SHIFTING_WALL_MIN_LEN: i32 = 3;
pub const SHIFTING_WALL_MAX_LEN: i32 = 5;

pub const PICKUP_TIME_BONUS_MS: u64 = 10_000;
pub const LANTERN_DURATION_MS: u64 = 8_000;
pub const TRAP_STUN_MS: u64 = 1_500;
pub const SABOTAGE_DURATION_MS: u64 = 5_000;
pub const SABOTAGE_CADENCE_PENALTY_MS: u64 = 300;
pub const OBSTACLE_TIME_PENALTY_MS: u64 = 5_000;

pub const SHIFTING_WALL_MIN_LEVEL: u32 = 3;
pub const ROTATING_REGION_MIN_LEVEL: u32 = 4;
pub const HIDDEN_HAZARD_MIN_LEVEL: u32 = 6;

pub fn get_maze_side(level: u32) -> i32 {
    let grow = (level.max(1) - 1).min(10) as i32;
    (BASE_MAZE_SIDE + grow * 2).min(MAX_MAZE_SIDE)
}

pub fn get_obstacle_count(level: u32) -> usize {
    (1 + level as usize / 2).min(8)
}

pub fn get_hazard_count(level: u32) -> usize {
    if level < 3 {
        return 0;
    }
    ((level as usize - 1) / 2).min(5)
}

pub fn get_pickup_count(level: u32) -> usize {
    (3 + level as usize / 3).min(6)
}

pub fn get_trap_count(level: u32) -> usize {
    if level < 2 {
        return 0;
    }
    (level as usize / 2).min(6)
}

pub fn get_checkpoint_count(level: u32) -> usize {
    (1 + level as usize / 5).min(3)
}

pub fn get_time_limit_ms(level: u32) -> u64 {
    if level <= 2 {
        return 90_000;
    }
    if level <= 5 {
        return 120_000;
    }
    if level <= 8 {
        return 150_000;
    }
    180_000
}

pub fn get_mutation_interval_ms(level: u32) -> u64 {
    let reduction = 800 * (level.max(1) as u64 - 1);
    12_000u64.saturating_sub(reduction).max(4_000)
}

pub fn get_mutation_factor(level: u32) -> f32 {
    (0.01 + 0.002 * level as f32).min(0.04)
}

pub fn get_shifting_wall_count(level: u32) -> usize {
    if level < SHIFTING_WALL_MIN_LEVEL {
        return 0;
    }
    (1 + level as usize / 6).min(3)
}

pub fn get_rotating_region_count(level: u32) -> usize {
    if level < ROTATING_REGION_MIN_LEVEL {
        return 0;
    }
    if level < 8 {
        return 1;
    }
    2
}

pub fn difficulty_for_level(level: u32) -> DifficultySettings {
    let level = level.max(1);
    let side = get_maze_side(level);
    let competitor_enabled = level >= 2;
    DifficultySettings {
        level,
        rows: side,
        cols: side,
        obstacle_count: get_obstacle_count(level),
        hazard_count: get_hazard_count(level),
        pickup_count: get_pickup_count(level),
        trap_count: get_trap_count(level),
        checkpoint_count: get_checkpoint_count(level),
        sabotage_count: if competitor_enabled {
            (1 + level as usize / 4).min(3)
        } else {
            0
        },
        time_limit_ms: get_time_limit_ms(level),
        mutation_interval_ms: get_mutation_interval_ms(level),
        mutation_factor: get_mutation_factor(level),
        competitor_enabled,
        shifting_wall_count: get_shifting_wall_count(level),
        rotating_region_count: get_rotating_region_count(level),
        hidden_hazards: level >= HIDDEN_HAZARD_MIN_LEVEL,
    }
}
