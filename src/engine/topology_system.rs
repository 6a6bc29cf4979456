use super::*;

impl GameEngine {
    pub(super) fn spawn_modifiers(&mut self, now_ms: u64) {
        for _ in 0..self.settings.rotating_region_count {
            match RotatingRegion::random(&self.grid, ROTATION_RADIUS, &mut self.rng, now_ms) {
                Some(region) => self.rotating_regions.push(region),
                None => warn!(level = self.level, "no room for a rotating region"),
            }
        }
        for _ in 0..self.settings.shifting_wall_count {
            let wall = ShiftingWall::random(&self.grid, &mut self.rng, now_ms);
            self.shifting_walls.push(wall);
        }
    }

    pub(super) fn update_topology(&mut self, now_ms: u64, events: &mut Vec<TickEvent>) {
        let mut transformed = false;

        for idx in 0..self.rotating_regions.len() {
            if !self.rotating_regions[idx].is_due(now_ms) {
                continue;
            }
            let region = &self.rotating_regions[idx];
            region.rotate(&mut self.grid);
            self.player.position = region.rotate_position(self.player.position);
            self.player.checkpoint = region.rotate_position(self.player.checkpoint);
            for agent in &mut self.agents {
                agent.position = region.rotate_position(agent.position);
            }
            for wall in &mut self.shifting_walls {
                wall.follow_rotation(region);
            }
            self.rotating_regions[idx].last_fired_ms = now_ms;
            events.push(TickEvent::TopologyTransformed {
                kind: TopologyKind::RotatingRegion,
            });
            transformed = true;
        }

        for idx in 0..self.shifting_walls.len() {
            if !self.shifting_walls[idx].is_due(now_ms) {
                continue;
            }
            let blocked = self.entity_positions();
            self.shifting_walls[idx].shift(&mut self.grid, &blocked);
            self.shifting_walls[idx].last_fired_ms = now_ms;
            events.push(TickEvent::TopologyTransformed {
                kind: TopologyKind::ShiftingWall,
            });
            transformed = true;
        }

        if transformed {
            self.relocate_embedded_agents(now_ms, events);
            self.repair_anchors(events);
        }
    }
}
