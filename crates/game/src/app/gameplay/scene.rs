use engine::{Scene, TickContext, Vec2};
use tracing::info;

use super::enemy::{random_point, Enemy};
use super::player::Player;
use super::wall::Wall;
use crate::app::config::ArenaConfig;

/// Opening layout: walls first, then the configured number of enemies at
/// random canvas positions, then the player.
pub(crate) struct ArenaScene {
    config: ArenaConfig,
}

impl ArenaScene {
    pub(crate) fn new(config: ArenaConfig) -> Self {
        Self { config }
    }
}

impl Scene for ArenaScene {
    fn name(&self) -> &str {
        "arena"
    }

    fn load(&mut self, ctx: &mut TickContext<'_>) {
        let tuning = self.config.tuning();
        let canvas = ctx.canvas();

        for rect in &self.config.walls {
            let wall = Wall::new(rect.width, rect.height);
            ctx.spawn(wall.template(Vec2::new(rect.x, rect.y)), wall);
        }

        for _ in 0..self.config.enemy_count {
            let position = random_point(canvas, ctx.rng());
            let target = random_point(canvas, ctx.rng());
            ctx.spawn(
                Enemy::template(position),
                Enemy::new(tuning.enemy_speed, target, tuning.blood_particles),
            );
        }

        let player = ctx.spawn(
            Player::template(self.config.player_spawn.into()),
            Player::new(tuning),
        );
        info!(
            enemies = self.config.enemy_count,
            walls = self.config.walls.len(),
            player = player.0,
            "arena_populated"
        );
    }
}
