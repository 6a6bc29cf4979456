use super::*;

impl GameEngine {
    pub(super) fn spawn_agents(&mut self, now_ms: u64) {
        if self.settings.competitor_enabled {
            let id = self.make_id("competitor");
            self.agents.push(Agent::new(
                id,
                AgentKind::Competitor,
                self.grid.start(),
                self.level,
                now_ms,
            ));
        }

        let plan = [
            (AgentKind::Obstacle, self.settings.obstacle_count),
            (AgentKind::Hazard, self.settings.hazard_count),
        ];
        for (kind, count) in plan {
            for _ in 0..count {
                if !self.spawn_agent(kind, now_ms) {
                    warn!(level = self.level, ?kind, "agent placement exhausted, skipping");
                }
            }
        }
    }

    fn spawn_agent(&mut self, kind: AgentKind, now_ms: u64) -> bool {
        let keep_away = self.anchor_positions();
        let taken = self.agent_positions(None);
        let Some(pos) = find_spawn(&self.grid, &keep_away, &taken, &mut self.rng) else {
            return false;
        };
        let prefix = match kind {
            AgentKind::Obstacle => "obstacle",
            AgentKind::Hazard => "hazard",
            AgentKind::Competitor => "competitor",
        };
        let id = self.make_id(prefix);
        let agent = Agent::new(id, kind, pos, self.level, now_ms);
        if let Some(marker) = agent.policy.marker {
            self.grid.place_occupant(pos, marker);
        }
        self.agents.push(agent);
        true
    }

    pub(super) fn update_visibility(&mut self, now_ms: u64) {
        let lit = now_ms < self.lantern_until_ms;
        let hidden = self.settings.hidden_hazards;
        for agent in &mut self.agents {
            agent.visible = agent.kind != AgentKind::Hazard || !hidden || lit;
        }
    }

    pub(super) fn update_agents(&mut self, now_ms: u64, events: &mut Vec<TickEvent>) {
        for idx in 0..self.agents.len() {
            if !self.agents[idx].is_due(now_ms) {
                continue;
            }
            let target = match self.agents[idx].kind {
                AgentKind::Competitor => self.grid.exit(),
                AgentKind::Obstacle | AgentKind::Hazard => self.player.position,
            };
            let others = self.agent_positions(Some(idx));
            let next = choose_step(&self.grid, &self.agents[idx], target, &others, &mut self.rng);
            self.agents[idx].last_move_ms = now_ms;
            let Some(next) = next else {
                continue;
            };

            self.move_agent(idx, next);
            events.push(TickEvent::AgentMoved {
                agent_id: self.agents[idx].id.clone(),
                position: next,
            });

            if self.agents[idx].kind == AgentKind::Competitor && next == self.grid.exit() {
                info!(level = self.level, agent_id = %self.agents[idx].id, "competitor escaped");
                events.push(TickEvent::AgentReachedExit {
                    agent_id: self.agents[idx].id.clone(),
                });
                self.status = LevelStatus::CompetitorEscaped;
                return;
            }
        }
    }

    fn move_agent(&mut self, idx: usize, next: Position) {
        let from = self.agents[idx].position;
        if let Some(marker) = self.agents[idx].policy.marker {
            if self.grid.occupant(from) == Some(marker) {
                self.grid.clear_occupant(from);
            }
            self.grid.place_occupant(next, marker);
        }
        self.agents[idx].position = next;
    }

    pub(super) fn relocate_embedded_agents(&mut self, now_ms: u64, events: &mut Vec<TickEvent>) {
        for idx in 0..self.agents.len() {
            let agent = &self.agents[idx];
            let embedded = !self.grid.is_open(agent.position)
                || agent
                    .policy
                    .marker
                    .is_some_and(|marker| self.grid.occupant(agent.position) != Some(marker));
            if embedded {
                self.relocate_agent(idx, now_ms, events);
            }
        }
    }

    fn relocate_agent(&mut self, idx: usize, now_ms: u64, events: &mut Vec<TickEvent>) {
        let from = self.agents[idx].position;
        if let Some(marker) = self.agents[idx].policy.marker {
            if self.grid.occupant(from) == Some(marker) {
                self.grid.clear_occupant(from);
            }
        }
        let keep_away = self.anchor_positions();
        let taken = self.agent_positions(Some(idx));
        let Some(pos) = find_spawn(&self.grid, &keep_away, &taken, &mut self.rng) else {
            warn!(agent_id = %self.agents[idx].id, "no cell to relocate embedded agent");
            return;
        };
        if let Some(marker) = self.agents[idx].policy.marker {
            self.grid.place_occupant(pos, marker);
        }
        self.agents[idx].position = pos;
        self.agents[idx].last_move_ms = now_ms;
        debug!(agent_id = %self.agents[idx].id, row = pos.row, col = pos.col, "agent relocated");
        events.push(TickEvent::AgentRelocated {
            agent_id: self.agents[idx].id.clone(),
            position: pos,
        });
    }

    /// Contacts are reported once, never resolved here. A contact already
    /// returned by `move_player` is not repeated.
    pub(super) fn check_collisions(&mut self, events: &mut Vec<TickEvent>) {
        let contact = self.agents.iter().find(|agent| {
            agent.kind != AgentKind::Competitor && agent.position == self.player.position
        });
        let Some(agent) = contact else {
            self.last_contact = None;
            return;
        };
        let key = (agent.id.clone(), agent.position);
        if self.last_contact.as_ref() == Some(&key) {
            return;
        }
        events.push(TickEvent::AgentCollided {
            agent_id: agent.id.clone(),
            kind: agent.kind,
            outcome: agent.policy.contact,
        });
        self.last_contact = Some(key);
    }
}
