use engine::{Behavior, Canvas, Color, DrawList, Entity, EntityTemplate, TickContext, Vec2};
use rand::Rng;

use super::blood::spawn_splatter;
use super::{BULLET, ENEMY};

const ENEMY_HALF_EXTENT: f32 = 16.0;
const ENEMY_RADIUS: f32 = 20.0;
const ENEMY_COLOR: Color = Color::rgb(255, 0, 0);
const RETARGET_DISTANCE: f32 = 10.0;
const MAX_RETARGET_ATTEMPTS: u32 = 16;

pub(crate) struct Enemy {
    speed: f32,
    target: Vec2,
    blood_particles: u32,
}

impl Enemy {
    pub(crate) fn new(speed: f32, target: Vec2, blood_particles: u32) -> Self {
        Self {
            speed,
            target,
            blood_particles,
        }
    }

    pub(crate) fn template(position: Vec2) -> EntityTemplate {
        EntityTemplate::new(ENEMY, position).with_solid(ENEMY_HALF_EXTENT, ENEMY_HALF_EXTENT)
    }
}

pub(super) fn random_point(canvas: Canvas, rng: &mut impl Rng) -> Vec2 {
    Vec2::new(
        rng.gen::<f32>() * canvas.width as f32,
        rng.gen::<f32>() * canvas.height as f32,
    )
}

/// Moves `position` toward `target` by `speed`, then picks fresh targets until
/// one is at least [`RETARGET_DISTANCE`] away. Returns the new position and
/// target.
pub(super) fn wander_step(
    position: Vec2,
    target: Vec2,
    speed: f32,
    canvas: Canvas,
    rng: &mut impl Rng,
) -> (Vec2, Vec2) {
    let position = position + Vec2::from_angle(position.angle_to(target), speed);
    let mut target = target;
    let mut attempts = 0;
    while position.distance(target) < RETARGET_DISTANCE && attempts < MAX_RETARGET_ATTEMPTS {
        target = random_point(canvas, rng);
        attempts += 1;
    }
    (position, target)
}

impl Behavior for Enemy {
    fn step(&mut self, entity: &mut Entity, ctx: &mut TickContext<'_>) {
        let canvas = ctx.canvas();
        let (position, target) =
            wander_step(entity.position, self.target, self.speed, canvas, ctx.rng());
        entity.position = position;
        self.target = target;
    }

    fn on_collision(&mut self, entity: &mut Entity, other: &Entity, _ctx: &mut TickContext<'_>) {
        if other.kind == BULLET {
            entity.destroy();
        }
    }

    fn render(&self, entity: &Entity, draw: &mut DrawList) {
        draw.circle(entity.position, ENEMY_RADIUS, ENEMY_COLOR);
    }

    fn on_destroyed(&mut self, entity: &Entity, ctx: &mut TickContext<'_>) {
        spawn_splatter(ctx, entity.position, self.blood_particles);
    }
}
