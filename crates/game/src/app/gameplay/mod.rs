use engine::EntityKind;

mod blood;
mod bullet;
mod enemy;
mod player;
mod scene;
mod wall;

pub(crate) use scene::ArenaScene;

pub(crate) const PLAYER: EntityKind = EntityKind("player");
pub(crate) const ENEMY: EntityKind = EntityKind("enemy");
pub(crate) const BULLET: EntityKind = EntityKind("bullet");
pub(crate) const WALL: EntityKind = EntityKind("wall");

/// Gameplay speeds and effect sizes shared by every behavior in the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Tuning {
    pub(crate) player_move_speed: f32,
    pub(crate) enemy_speed: f32,
    pub(crate) bullet_speed: f32,
    pub(crate) blood_particles: u32,
}
