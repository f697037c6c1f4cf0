use engine::{Behavior, Color, DrawList, Entity, EntityTemplate, Vec2};

use super::WALL;

const WALL_IMAGE: &str = "wall";
const WALL_TINT: Color = Color::rgb(64, 64, 64);

/// Static solid block. Stops bullets and never moves.
pub(crate) struct Wall {
    size: Vec2,
}

impl Wall {
    pub(crate) fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
        }
    }

    pub(crate) fn template(&self, top_left: Vec2) -> EntityTemplate {
        let half_width = self.size.x * 0.5;
        let half_height = self.size.y * 0.5;
        EntityTemplate::new(WALL, top_left + Vec2::new(half_width, half_height))
            .with_solid(half_width, half_height)
    }
}

impl Behavior for Wall {
    fn render(&self, entity: &Entity, draw: &mut DrawList) {
        draw.image(WALL_IMAGE, entity.position, self.size, 0.0, WALL_TINT);
    }
}
