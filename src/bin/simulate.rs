use chrono::{SecondsFormat, Utc};
use clap::Parser;
use maze_escape::constants::{OBSTACLE_TIME_PENALTY_MS, TICK_MS};
use maze_escape::engine::{GameEngine, GameEngineOptions};
use maze_escape::grid::Grid;
use maze_escape::pathfinding::{reachable, shortest};
use maze_escape::types::{
    AgentKind, ContactOutcome, LevelStatus, MoveResult, Position, Snapshot, TickEvent,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const MAX_LEVELS: u32 = 30;
const TICK_SAFETY_PER_LEVEL: u64 = 20 * 60 * 5;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    levels: Option<u32>,
    #[arg(long)]
    start_level: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    #[serde(rename = "startLevel")]
    start_level: u32,
    levels: u32,
    seed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RunOutcome {
    Cleared,
    CompetitorEscaped,
    TimeExpired,
    HazardContact,
    InvariantViolation,
    Stuck,
}

#[derive(Clone, Debug, Default, Serialize)]
struct RunCounters {
    mutations: u32,
    repairs: u32,
    #[serde(rename = "topologyTransforms")]
    topology_transforms: u32,
    #[serde(rename = "itemsCollected")]
    items_collected: u32,
    penalties: u32,
    relocations: u32,
    #[serde(rename = "hintsUsed")]
    hints_used: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u64,
    #[serde(rename = "startLevel")]
    start_level: u32,
    #[serde(rename = "levelsCleared")]
    levels_cleared: u32,
    #[serde(rename = "finalLevel")]
    final_level: u32,
    outcome: RunOutcome,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(flatten)]
    counters: RunCounters,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    level: u32,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Default)]
struct AnomalyLog {
    messages: Vec<String>,
    records: Vec<AnomalyRecord>,
    seen: HashSet<String>,
}

impl AnomalyLog {
    fn push(&mut self, tick: u64, level: u32, message: String) {
        self.records.push(AnomalyRecord {
            tick,
            level,
            message: message.clone(),
        });
        if self.seen.insert(message.clone()) {
            self.messages.push(message);
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let started_at = timestamp();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, Utc::now().timestamp_millis()));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_duration_ms = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            start_level = scenario.start_level,
            levels = scenario.levels,
            "scenario_started"
        );
        let scenario_run = run_scenario(&scenario);

        for anomaly in &scenario_run.anomaly_records {
            warn!(
                match_id = %match_id,
                scenario = %scenario.name,
                seed = scenario.seed,
                tick = anomaly.tick,
                level = anomaly.level,
                message = %anomaly.message,
                "anomaly_detected"
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_duration_ms += scenario_run.result.duration_ms;
        *outcome_counts
            .entry(outcome_key(scenario_run.result.outcome).to_string())
            .or_insert(0) += 1;

        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            tick = scenario_run.finished_tick,
            outcome = outcome_key(scenario_run.result.outcome),
            levels_cleared = scenario_run.result.levels_cleared,
            duration_ms = scenario_run.result.duration_ms,
            anomaly_count = scenario_run.anomaly_records.len(),
            "scenario_finished"
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(err) => error!(error = %err, "scenario result did not serialize"),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        started_at,
        timestamp(),
        scenario_results,
        outcome_counts,
        total_anomalies,
        total_duration_ms,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(err) = write_summary(path, &summary) {
            error!(
                match_id = %match_id,
                path = %path.to_string_lossy(),
                error = %err,
                "summary_write_failed"
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    info!(
        match_id = %match_id,
        scenario_count = summary.scenario_count,
        anomaly_count = summary.anomaly_count,
        average_duration_ms = summary.average_duration_ms,
        outcome_counts = ?summary.outcome_counts,
        summary_out = ?summary_out_written,
        "run_finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("maze_escape=info,simulate=info"));
    let subscriber = FmtSubscriber::builder()
        .json()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("logging already initialised: {err}");
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let mut now_ms = 0u64;
    let mut anomalies = AnomalyLog::default();
    let mut counters = RunCounters::default();
    let mut levels_cleared = 0u32;
    let mut last_tick = 0u64;

    let options = GameEngineOptions {
        start_level: scenario.start_level,
        ..GameEngineOptions::default()
    };
    let mut engine = match GameEngine::new(scenario.seed, options, now_ms) {
        Ok(engine) => engine,
        Err(err) => {
            anomalies.push(0, scenario.start_level, format!("level generation failed: {err}"));
            return finish(
                scenario,
                ScenarioTally {
                    outcome: RunOutcome::InvariantViolation,
                    levels_cleared,
                    final_level: scenario.start_level,
                    duration_ms: 0,
                    counters,
                    finished_tick: 0,
                },
                anomalies,
            );
        }
    };

    let mut level_ticks = 0u64;
    let outcome = loop {
        now_ms += TICK_MS;
        level_ticks += 1;

        let mut fatal = drive_player(&mut engine, now_ms, &mut counters);

        let events = match engine.tick(now_ms) {
            Ok(events) => events,
            Err(err) => {
                anomalies.push(last_tick, engine.level, format!("invariant violated: {err}"));
                break RunOutcome::InvariantViolation;
            }
        };
        for event in &events {
            match event {
                TickEvent::MutationApplied { .. } => counters.mutations += 1,
                TickEvent::ConnectivityRepaired { .. } => counters.repairs += 1,
                TickEvent::TopologyTransformed { .. } => counters.topology_transforms += 1,
                TickEvent::ItemCollected { .. } => counters.items_collected += 1,
                TickEvent::AgentRelocated { .. } => counters.relocations += 1,
                TickEvent::AgentCollided {
                    outcome: ContactOutcome::Penalty,
                    ..
                } => {
                    engine.reset_player_to_checkpoint();
                    engine.apply_time_penalty(OBSTACLE_TIME_PENALTY_MS);
                    counters.penalties += 1;
                }
                TickEvent::AgentCollided {
                    outcome: ContactOutcome::Fatal,
                    ..
                } => fatal = true,
                _ => {}
            }
        }

        let snapshot = engine.build_snapshot(now_ms);
        last_tick = snapshot.tick;
        for message in collect_snapshot_anomalies(&snapshot, engine.grid()) {
            anomalies.push(snapshot.tick, snapshot.level, message);
        }

        if fatal {
            break RunOutcome::HazardContact;
        }
        match engine.status() {
            LevelStatus::Running => {}
            LevelStatus::PlayerEscaped => {
                levels_cleared += 1;
                if levels_cleared >= scenario.levels {
                    break RunOutcome::Cleared;
                }
                if let Err(err) = engine.next_level(now_ms) {
                    anomalies.push(
                        last_tick,
                        engine.level + 1,
                        format!("level generation failed: {err}"),
                    );
                    break RunOutcome::InvariantViolation;
                }
                level_ticks = 0;
            }
            LevelStatus::CompetitorEscaped => break RunOutcome::CompetitorEscaped,
            LevelStatus::TimeExpired => break RunOutcome::TimeExpired,
        }

        if level_ticks > TICK_SAFETY_PER_LEVEL {
            anomalies.push(last_tick, engine.level, "tick safety limit exceeded".to_string());
            break RunOutcome::Stuck;
        }
    };

    finish(
        scenario,
        ScenarioTally {
            outcome,
            levels_cleared,
            final_level: engine.level,
            duration_ms: now_ms,
            counters,
            finished_tick: last_tick,
        },
        anomalies,
    )
}

struct ScenarioTally {
    outcome: RunOutcome,
    levels_cleared: u32,
    final_level: u32,
    duration_ms: u64,
    counters: RunCounters,
    finished_tick: u64,
}

fn finish(scenario: &Scenario, tally: ScenarioTally, anomalies: AnomalyLog) -> ScenarioRunResult {
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            start_level: scenario.start_level,
            levels_cleared: tally.levels_cleared,
            final_level: tally.final_level,
            outcome: tally.outcome,
            duration_ms: tally.duration_ms,
            counters: tally.counters,
            anomalies: anomalies.messages,
        },
        anomaly_records: anomalies.records,
        finished_tick: tally.finished_tick,
    }
}

/// Autopilot: follows a hint while one is available, otherwise its own
/// shortest path, and waits rather than walk into a visible hazard. Returns
/// true when the move ended on a hazard.
fn drive_player(engine: &mut GameEngine, now_ms: u64, counters: &mut RunCounters) -> bool {
    let from = engine.player_position();
    let exit = engine.grid().exit();
    let route = match engine.request_hint(from, now_ms) {
        Some(path) => {
            counters.hints_used += 1;
            Some(path)
        }
        None => shortest(engine.grid(), from, exit, false),
    };
    let Some(next) = route.and_then(|path| path.get(1).copied()) else {
        return false;
    };
    let Some(direction) = from.direction_to(next) else {
        return false;
    };
    if hazard_at(engine, next) {
        return false;
    }

    match engine.move_player(direction, now_ms) {
        MoveResult::CollidedWithObstacle { .. } => {
            engine.reset_player_to_checkpoint();
            engine.apply_time_penalty(OBSTACLE_TIME_PENALTY_MS);
            counters.penalties += 1;
            false
        }
        MoveResult::CollidedWithHazard { .. } => true,
        _ => false,
    }
}

fn hazard_at(engine: &GameEngine, pos: Position) -> bool {
    engine
        .agents()
        .iter()
        .any(|agent| agent.kind == AgentKind::Hazard && agent.visible && agent.position == pos)
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, grid: &Grid) -> Vec<String> {
    let mut anomalies = Vec::new();

    let count = |ch: char| -> usize {
        snapshot
            .tiles
            .iter()
            .map(|line| line.chars().filter(|c| *c == ch).count())
            .sum()
    };
    if count('S') != 1 {
        anomalies.push(format!("start cell count is {}", count('S')));
    }
    if count('E') != 1 {
        anomalies.push(format!("exit cell count is {}", count('E')));
    }

    let player = snapshot.player.position;
    if tile_at(snapshot, player.row, player.col) == Some('#') {
        anomalies.push("player embedded in a wall".to_string());
    }
    for agent in &snapshot.agents {
        if tile_at(snapshot, agent.position.row, agent.position.col) == Some('#') {
            anomalies.push(format!("agent embedded in a wall: {}", agent.id));
        }
    }

    if snapshot.status == LevelStatus::Running && reachable(grid, player, grid.exit()).is_none() {
        anomalies.push("exit unreachable from player".to_string());
    }
    if snapshot.hints.used > snapshot.hints.max {
        anomalies.push(format!(
            "hint cap exceeded: {}/{}",
            snapshot.hints.used, snapshot.hints.max
        ));
    }
    anomalies
}

fn tile_at(snapshot: &Snapshot, row: i32, col: i32) -> Option<char> {
    if row < 0 || col < 0 {
        return None;
    }
    snapshot.tiles.get(row as usize)?.chars().nth(col as usize)
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli
        .seed
        .unwrap_or_else(|| Utc::now().timestamp_millis().unsigned_abs());
    let start_level = cli.start_level.unwrap_or(1).clamp(1, MAX_LEVELS);

    if cli.single || cli.levels.is_some() || cli.start_level.is_some() {
        let levels = cli.levels.unwrap_or(3).clamp(1, MAX_LEVELS);
        return vec![Scenario {
            name: format!("custom-l{start_level}x{levels}"),
            start_level,
            levels,
            seed,
        }];
    }

    vec![
        Scenario {
            name: "quick-check-early".to_string(),
            start_level: 1,
            levels: 3,
            seed,
        },
        Scenario {
            name: "modifier-check-deep".to_string(),
            start_level: 6,
            levels: 3,
            seed: seed.wrapping_add(1),
        },
    ]
}

fn default_match_id(seed: u64, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn build_run_summary(
    match_id: String,
    started_at: String,
    finished_at: String,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_duration_ms: u64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_duration_ms = if scenario_count == 0 {
        0
    } else {
        total_duration_ms / scenario_count as u64
    };
    RunSummary {
        match_id,
        started_at,
        finished_at,
        scenario_count,
        anomaly_count,
        average_duration_ms,
        outcome_counts,
        scenarios,
    }
}

fn outcome_key(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Cleared => "cleared",
        RunOutcome::CompetitorEscaped => "competitor_escaped",
        RunOutcome::TimeExpired => "time_expired",
        RunOutcome::HazardContact => "hazard_contact",
        RunOutcome::InvariantViolation => "invariant_violation",
        RunOutcome::Stuck => "stuck",
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, summary_text)
}
