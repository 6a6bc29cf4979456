use super::*;

impl GameEngine {
    pub(super) fn update_mutation(&mut self, now_ms: u64, events: &mut Vec<TickEvent>) {
        if now_ms.saturating_sub(self.last_mutation_ms) < self.settings.mutation_interval_ms {
            return;
        }
        self.last_mutation_ms = now_ms;

        let anchors = self.anchor_positions();
        let protected = self.entity_positions();
        let ctx = MutationContext {
            anchors: &anchors,
            protected: &protected,
            attempts: mutation_attempts(&self.grid, self.settings.mutation_factor),
            shortcut_probability: SHORTCUT_PROBABILITY,
        };
        let report = mutate(&mut self.grid, &ctx, &mut self.rng);
        debug!(
            walls_added = report.walls_added,
            walls_removed = report.walls_removed,
            repairs = report.repairs.len(),
            "mutation cycle"
        );

        if !report.repaired() {
            events.push(TickEvent::MutationApplied {
                walls_added: report.walls_added,
                walls_removed: report.walls_removed,
            });
        }
        for (from, cells_opened) in report.repairs {
            events.push(TickEvent::ConnectivityRepaired { from, cells_opened });
        }
    }

    pub(super) fn repair_anchors(&mut self, events: &mut Vec<TickEvent>) {
        let anchors = self.anchor_positions();
        for (from, cells_opened) in repair_disconnected(&mut self.grid, &anchors) {
            events.push(TickEvent::ConnectivityRepaired { from, cells_opened });
        }
    }
}
