use std::f32::consts::TAU;

use engine::{Color, Particle, ParticleSystem, TickContext, Vec2};
use rand::Rng;

const SPLATTER_DEPTH: i32 = -2;
const SPLATTER_DRAG: f32 = 0.92;

/// Blood drops bursting outward from `origin`, each with its own speed and
/// lifetime.
pub(super) fn splatter(origin: Vec2, count: u32, rng: &mut impl Rng) -> ParticleSystem {
    let mut system = ParticleSystem::new().with_drag(SPLATTER_DRAG);
    for _ in 0..count {
        let heading = rng.gen_range(0.0..TAU);
        let speed = rng.gen_range(0.5..4.0);
        let shade = rng.gen_range(110..=200);
        system.add_particle(Particle {
            position: origin,
            velocity: Vec2::from_angle(heading, speed),
            remaining_ticks: rng.gen_range(20..60),
            radius: rng.gen_range(2.0..4.5),
            color: Color::rgb(shade, 0, 0),
        });
    }
    system
}

pub(super) fn spawn_splatter(ctx: &mut TickContext<'_>, origin: Vec2, count: u32) {
    let system = splatter(origin, count, ctx.rng());
    ctx.spawn(ParticleSystem::template(origin, SPLATTER_DEPTH), system);
}
