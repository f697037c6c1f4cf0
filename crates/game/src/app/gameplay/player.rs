use engine::{
    Behavior, ButtonCode, Color, DrawList, Entity, EntityTemplate, InputEvent, InputPhase,
    InputSource, KeyCode, TickContext, Vec2,
};

use super::blood::spawn_splatter;
use super::bullet::Bullet;
use super::{Tuning, ENEMY, PLAYER};

const PLAYER_HALF_EXTENT: f32 = 16.0;
const PLAYER_DEPTH: i32 = -1;
const PLAYER_IMAGE: &str = "person";
const PLAYER_IMAGE_SIZE: Vec2 = Vec2::new(39.0, 39.0);
const PLAYER_TINT: Color = Color::rgb(40, 40, 160);
const AIM_LINE_COLOR: Color = Color::rgb(0, 0, 255);

/// The user-controlled entity. Its destruction ends the game.
pub(crate) struct Player {
    tuning: Tuning,
    aim: Vec2,
}

impl Player {
    pub(crate) fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            aim: Vec2::ZERO,
        }
    }

    pub(crate) fn template(position: Vec2) -> EntityTemplate {
        EntityTemplate::new(PLAYER, position)
            .with_solid(PLAYER_HALF_EXTENT, PLAYER_HALF_EXTENT)
            .with_depth(PLAYER_DEPTH)
    }
}

/// Unit step for a movement key, W/A/S/D or the arrows.
fn movement_direction(code: KeyCode) -> Option<Vec2> {
    match code {
        KeyCode::W | KeyCode::UP => Some(Vec2::new(0.0, -1.0)),
        KeyCode::A | KeyCode::LEFT => Some(Vec2::new(-1.0, 0.0)),
        KeyCode::S | KeyCode::DOWN => Some(Vec2::new(0.0, 1.0)),
        KeyCode::D | KeyCode::RIGHT => Some(Vec2::new(1.0, 0.0)),
        _ => None,
    }
}

impl Behavior for Player {
    fn on_input(&mut self, entity: &mut Entity, event: InputEvent, ctx: &mut TickContext<'_>) {
        match (event.source, event.phase) {
            (InputSource::Key(code), InputPhase::Held) => {
                if let Some(direction) = movement_direction(code) {
                    entity.position += direction.scale(self.tuning.player_move_speed);
                }
            }
            (InputSource::Button(ButtonCode::PRIMARY), InputPhase::Press) => {
                let heading = entity.position.angle_to(ctx.pointer());
                ctx.spawn(
                    Bullet::template(entity.position, heading),
                    Bullet::new(self.tuning.bullet_speed),
                );
            }
            _ => {}
        }
    }

    fn step(&mut self, entity: &mut Entity, ctx: &mut TickContext<'_>) {
        self.aim = ctx.pointer();
        entity.rotation_radians = entity.position.angle_to(self.aim);
    }

    fn on_collision(&mut self, entity: &mut Entity, other: &Entity, _ctx: &mut TickContext<'_>) {
        if other.kind == ENEMY {
            entity.destroy();
        }
    }

    fn render(&self, entity: &Entity, draw: &mut DrawList) {
        draw.line(entity.position, self.aim, AIM_LINE_COLOR);
        draw.image(
            PLAYER_IMAGE,
            entity.position,
            PLAYER_IMAGE_SIZE,
            entity.rotation_radians,
            PLAYER_TINT,
        );
    }

    fn on_destroyed(&mut self, entity: &Entity, ctx: &mut TickContext<'_>) {
        spawn_splatter(ctx, entity.position, self.tuning.blood_particles);
        ctx.raise_game_over("player_destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasd_and_arrows_share_directions() {
        assert_eq!(movement_direction(KeyCode::W), movement_direction(KeyCode::UP));
        assert_eq!(movement_direction(KeyCode::A), movement_direction(KeyCode::LEFT));
        assert_eq!(movement_direction(KeyCode::S), movement_direction(KeyCode::DOWN));
        assert_eq!(movement_direction(KeyCode::D), movement_direction(KeyCode::RIGHT));
        assert_eq!(movement_direction(KeyCode::SPACE), None);
    }
}
