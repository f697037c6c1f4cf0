use super::context::TickContext;
use super::entity::{Behavior, Entity, EntityKind, EntityTemplate, Vec2};
use super::rendering::{Color, DrawList};

pub const PARTICLE_SYSTEM_KIND: EntityKind = EntityKind("particle_system");

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub remaining_ticks: u32,
    pub radius: f32,
    pub color: Color,
}

impl Particle {
    /// Moves one tick and burns one tick of lifetime. Returns whether the
    /// particle is still alive afterwards.
    fn advance(&mut self, drag: f32) -> bool {
        if self.remaining_ticks == 0 {
            return false;
        }
        self.position += self.velocity;
        self.velocity = self.velocity.scale(drag);
        self.remaining_ticks -= 1;
        self.remaining_ticks > 0
    }
}

/// Entity behavior owning a private, ordered set of short-lived particles.
/// The owning entity destroys itself on the first step that finds the set
/// empty, so it is swept in that same tick.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    drag: f32,
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self {
            particles: Vec::new(),
            drag: 1.0,
        }
    }
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Velocity multiplier applied after every step; 1.0 keeps speed constant.
    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag;
        self
    }

    pub fn template(position: Vec2, depth: i32) -> EntityTemplate {
        EntityTemplate::new(PARTICLE_SYSTEM_KIND, position).with_depth(depth)
    }

    pub fn add_particle(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

impl Behavior for ParticleSystem {
    fn step(&mut self, entity: &mut Entity, _ctx: &mut TickContext<'_>) {
        let drag = self.drag;
        self.particles.retain_mut(|particle| particle.advance(drag));
        if self.particles.is_empty() {
            entity.destroy();
        }
    }

    fn render(&self, _entity: &Entity, draw: &mut DrawList) {
        for particle in &self.particles {
            draw.circle(particle.position, particle.radius, particle.color);
        }
    }
}
