use super::*;

impl GameEngine {
    /// Moves the player one cell. Contact with an obstacle or hazard is
    /// reported; the caller decides what it costs. Once the level has ended
    /// every move reads as blocked.
    pub fn move_player(&mut self, direction: Direction, now_ms: u64) -> MoveResult {
        if !self.is_running() {
            return MoveResult::BlockedByWall;
        }
        let ready_at_ms = self
            .player
            .last_move_ms
            .map(|last| last.saturating_add(self.options.player_move_cooldown_ms))
            .unwrap_or(0)
            .max(self.player.stunned_until);
        if now_ms < ready_at_ms {
            return MoveResult::BlockedByCooldown { ready_at_ms };
        }

        let next = self.player.position.offset(direction);
        if !self.grid.is_open(next) {
            return MoveResult::BlockedByWall;
        }
        self.player.position = next;
        self.player.last_move_ms = Some(now_ms);

        if next == self.grid.exit() {
            info!(level = self.level, "player escaped");
            self.status = LevelStatus::PlayerEscaped;
            return MoveResult::ReachedExit;
        }

        let contact = self
            .agents
            .iter()
            .find(|agent| agent.position == next && agent.kind != AgentKind::Competitor);
        if let Some(agent) = contact {
            let agent_id = agent.id.clone();
            self.last_contact = Some((agent_id.clone(), next));
            return match agent.kind {
                AgentKind::Hazard => MoveResult::CollidedWithHazard { agent_id },
                _ => MoveResult::CollidedWithObstacle { agent_id },
            };
        }

        self.collect_item(next, now_ms);
        MoveResult::Moved { position: next }
    }

    fn collect_item(&mut self, pos: Position, now_ms: u64) {
        let Some(occupant) = self.grid.occupant(pos) else {
            return;
        };
        if occupant.is_agent_marker() {
            return;
        }
        self.grid.clear_occupant(pos);

        match occupant {
            Occupant::Pickup {
                kind: PickupKind::TimeBonus,
            } => {
                self.deadline_ms = self.deadline_ms.saturating_add(PICKUP_TIME_BONUS_MS);
            }
            Occupant::Pickup {
                kind: PickupKind::Lantern,
            } => {
                self.lantern_until_ms = now_ms + LANTERN_DURATION_MS;
            }
            Occupant::Trap => {
                self.player.stunned_until = now_ms + TRAP_STUN_MS;
            }
            Occupant::Checkpoint => {
                self.player.checkpoint = pos;
            }
            Occupant::Sabotage => {
                for agent in &mut self.agents {
                    if agent.kind == AgentKind::Competitor {
                        agent.slowed_until_ms = now_ms + SABOTAGE_DURATION_MS;
                    }
                }
            }
            Occupant::Obstacle | Occupant::Hazard => {}
        }

        self.player.items_collected += 1;
        debug!(?occupant, row = pos.row, col = pos.col, "item collected");
        self.pending_events
            .push(TickEvent::ItemCollected { occupant, position: pos });
    }

    /// Shortest route from `from` to Exit, subject to the per-level cap and
    /// the cooldown. A failed search does not consume a hint.
    pub fn request_hint(&mut self, from: Position, now_ms: u64) -> Option<Path> {
        let status = self.hint_status();
        if status.used >= status.max || now_ms < status.ready_at_ms {
            return None;
        }
        let path = shortest(&self.grid, from, self.grid.exit(), false)?;
        self.hints.used += 1;
        self.hints.last_used_ms = Some(now_ms);
        Some(path)
    }

    pub fn hint_status(&self) -> HintStatus {
        HintStatus {
            used: self.hints.used,
            max: self.options.max_hints_per_level,
            ready_at_ms: self
                .hints
                .last_used_ms
                .map(|last| last.saturating_add(self.options.hint_cooldown_ms))
                .unwrap_or(0),
        }
    }

    pub fn reset_player_to_checkpoint(&mut self) {
        let target = if self.grid.is_open(self.player.checkpoint) {
            self.player.checkpoint
        } else {
            self.grid.start()
        };
        self.player.position = target;
    }

    pub fn apply_time_penalty(&mut self, penalty_ms: u64) {
        self.deadline_ms = self.deadline_ms.saturating_sub(penalty_ms);
    }

    pub(super) fn check_time(&mut self, now_ms: u64, events: &mut Vec<TickEvent>) {
        if now_ms < self.deadline_ms {
            return;
        }
        info!(level = self.level, "time expired");
        self.status = LevelStatus::TimeExpired;
        events.push(TickEvent::TimeExpired);
    }
}
