use tracing::trace;

use super::context::TickEnv;
use super::entity::{EntityId, HalfExtents, Vec2};
use super::registry::{DispatchSnapshot, EntityRegistry};

/// Axis-aligned box covering the half-open region `[min.x, max.x) x [min.y, max.y)`.
///
/// Two boxes whose edges only touch do not overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center(center: Vec2, half: HalfExtents) -> Self {
        Self {
            min: Vec2::new(center.x - half.x, center.y - half.y),
            max: Vec2::new(center.x + half.x, center.y + half.y),
        }
    }

    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + width, y + height),
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// Every unordered overlapping pair, each reported once, lower index first.
pub fn overlapping_pairs(boxes: &[(EntityId, Aabb)]) -> Vec<(EntityId, EntityId)> {
    let mut pairs = Vec::new();
    collect_overlapping_pairs(boxes, &mut pairs);
    pairs
}

fn collect_overlapping_pairs(boxes: &[(EntityId, Aabb)], out: &mut Vec<(EntityId, EntityId)>) {
    out.clear();
    for (index, (first_id, first_box)) in boxes.iter().enumerate() {
        for (second_id, second_box) in &boxes[index + 1..] {
            if first_id != second_id && first_box.overlaps(second_box) {
                out.push((*first_id, *second_id));
            }
        }
    }
}

/// Brute-force pairwise resolver. Scratch buffers are kept between ticks.
#[derive(Debug, Default)]
pub struct CollisionResolver {
    boxes: Vec<(EntityId, Aabb)>,
    pairs: Vec<(EntityId, EntityId)>,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifies both sides of every overlapping pair among the solid, live
    /// entities of `snapshot`, using their current positions. A pair is
    /// skipped when either side was destroyed by an earlier pair this tick.
    /// Returns the number of pairs notified.
    pub(crate) fn resolve(
        &mut self,
        registry: &mut EntityRegistry,
        snapshot: &DispatchSnapshot,
        env: &mut TickEnv,
    ) -> usize {
        registry.collect_solid_bounds(snapshot, &mut self.boxes);
        collect_overlapping_pairs(&self.boxes, &mut self.pairs);

        let mut notified = 0;
        for &(first, second) in &self.pairs {
            if registry.notify_collision(first, second, snapshot, env) {
                notified += 1;
            } else {
                trace!(first = first.0, second = second.0, "collision_pair_skipped");
            }
        }
        notified
    }
}
