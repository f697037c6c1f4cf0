use engine::{Behavior, Color, DrawList, Entity, EntityTemplate, TickContext, Vec2};

use super::{BULLET, ENEMY, WALL};

const BULLET_HALF_EXTENT: f32 = 16.0;
const BULLET_DEPTH: i32 = -2;
const BULLET_RADIUS: f32 = 5.0;
const BULLET_COLOR: Color = Color::rgb(0, 0, 0);

pub(crate) struct Bullet {
    speed: f32,
}

impl Bullet {
    pub(crate) fn new(speed: f32) -> Self {
        Self { speed }
    }

    pub(crate) fn template(position: Vec2, rotation_radians: f32) -> EntityTemplate {
        EntityTemplate::new(BULLET, position)
            .with_solid(BULLET_HALF_EXTENT, BULLET_HALF_EXTENT)
            .with_depth(BULLET_DEPTH)
            .with_rotation(rotation_radians)
    }
}

impl Behavior for Bullet {
    fn step(&mut self, entity: &mut Entity, ctx: &mut TickContext<'_>) {
        entity.position += Vec2::from_angle(entity.rotation_radians, self.speed);
        let canvas = ctx.canvas();
        let Vec2 { x, y } = entity.position;
        // Inclusive far edge: a bullet sitting exactly on the border survives.
        if x < 0.0 || y < 0.0 || x > canvas.width as f32 || y > canvas.height as f32 {
            entity.destroy();
        }
    }

    fn on_collision(&mut self, entity: &mut Entity, other: &Entity, _ctx: &mut TickContext<'_>) {
        if other.kind == ENEMY || other.kind == WALL {
            entity.destroy();
        }
    }

    fn render(&self, entity: &Entity, draw: &mut DrawList) {
        draw.circle(entity.position, BULLET_RADIUS, BULLET_COLOR);
    }
}
