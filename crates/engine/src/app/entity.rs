use std::ops::{Add, AddAssign, Sub};

use tracing::debug;

use super::collision::Aabb;
use super::context::TickContext;
use super::input::InputEvent;
use super::rendering::DrawList;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_angle(radians: f32, length: f32) -> Self {
        Self {
            x: radians.cos() * length,
            y: radians.sin() * length,
        }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Angle in radians of the direction from `self` toward `target`.
    pub fn angle_to(self, target: Vec2) -> f32 {
        (target.y - self.y).atan2(target.x - self.x)
    }

    pub fn scale(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub(crate) struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub(crate) fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Game-defined tag used by collision handlers to tell entity variants apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKind(pub &'static str);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfExtents {
    pub x: f32,
    pub y: f32,
}

/// Everything needed to create an entity except its id, which the registry
/// assigns on insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTemplate {
    pub kind: EntityKind,
    pub position: Vec2,
    pub rotation_radians: f32,
    pub solid: Option<HalfExtents>,
    pub depth: i32,
}

impl EntityTemplate {
    pub fn new(kind: EntityKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            rotation_radians: 0.0,
            solid: None,
            depth: 0,
        }
    }

    pub fn with_solid(mut self, half_width: f32, half_height: f32) -> Self {
        self.solid = Some(HalfExtents {
            x: half_width,
            y: half_height,
        });
        self
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_rotation(mut self, rotation_radians: f32) -> Self {
        self.rotation_radians = rotation_radians;
        self
    }

    pub(crate) fn into_entity(self, id: EntityId) -> Entity {
        Entity {
            id,
            kind: self.kind,
            position: self.position,
            rotation_radians: self.rotation_radians,
            solid: self.solid,
            depth: self.depth,
            destroyed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    pub rotation_radians: f32,
    pub solid: Option<HalfExtents>,
    pub depth: i32,
    destroyed: bool,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Flags the entity for removal at the next sweep. Returns `false` when the
    /// flag was already set.
    pub fn destroy(&mut self) -> bool {
        if self.destroyed {
            debug!(entity = self.id.0, kind = self.kind.0, "destroy_already_requested");
            return false;
        }
        self.destroyed = true;
        true
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.solid
            .map(|half| Aabb::from_center(self.position, half))
    }

    pub fn is_solid(&self) -> bool {
        self.solid.is_some() && !self.destroyed
    }
}

/// Per-variant behavior attached to an [`Entity`]. Every hook has a no-op
/// default so variants only implement what they react to.
///
/// Hooks receive the entity they are attached to by `&mut` and may only mutate
/// that entity. Effects on other entities go through the [`TickContext`]
/// (spawning, destroy requests).
pub trait Behavior {
    fn on_input(&mut self, _entity: &mut Entity, _event: InputEvent, _ctx: &mut TickContext<'_>) {}

    fn step(&mut self, _entity: &mut Entity, _ctx: &mut TickContext<'_>) {}

    fn on_collision(&mut self, _entity: &mut Entity, _other: &Entity, _ctx: &mut TickContext<'_>) {}

    fn render(&self, _entity: &Entity, _draw: &mut DrawList) {}

    /// Runs exactly once, during the sweep that removes the entity.
    fn on_destroyed(&mut self, _entity: &Entity, _ctx: &mut TickContext<'_>) {}
}
