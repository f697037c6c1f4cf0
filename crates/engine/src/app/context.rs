use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use super::entity::{Behavior, Entity, EntityId, EntityIdAllocator, EntityTemplate, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Half-open bounds check: `[0, width) x [0, height)`.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && x < self.width as f32 && y >= 0.0 && y < self.height as f32
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Process-wide game-over flag. Cloned handles share the same flag; it can be
/// raised once and never lowered.
#[derive(Debug, Clone, Default)]
pub struct GameOverSignal {
    raised: Arc<AtomicBool>,
}

impl GameOverSignal {
    /// Returns `true` only for the call that actually raised the flag.
    pub fn raise(&self, reason: &str) -> bool {
        let first = self
            .raised
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            info!(reason, "game_over_raised");
        }
        first
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// Driver-owned state that behaviors can read (and, for the rng, advance)
/// while a tick is in progress.
#[derive(Debug)]
pub(crate) struct TickEnv {
    pub(crate) frame: u64,
    pub(crate) pointer: Vec2,
    pub(crate) canvas: Canvas,
    pub(crate) rng: StdRng,
    pub(crate) game_over: GameOverSignal,
}

impl TickEnv {
    pub(crate) fn new(canvas: Canvas, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            frame: 0,
            pointer: Vec2::ZERO,
            canvas,
            rng,
            game_over: GameOverSignal::default(),
        }
    }
}

pub(crate) struct PendingSpawn {
    pub(crate) entity: Entity,
    pub(crate) behavior: Box<dyn Behavior>,
}

/// Deferred membership changes requested from inside callbacks.
#[derive(Default)]
pub(crate) struct Commands {
    allocator: EntityIdAllocator,
    pub(crate) spawns: Vec<PendingSpawn>,
    pub(crate) destroy_requests: Vec<EntityId>,
}

impl Commands {
    pub(crate) fn allocate(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.destroy_requests.is_empty()
    }
}

pub struct TickContext<'a> {
    env: &'a mut TickEnv,
    commands: &'a mut Commands,
    roster: &'a [Entity],
}

impl<'a> TickContext<'a> {
    pub(crate) fn new(
        env: &'a mut TickEnv,
        commands: &'a mut Commands,
        roster: &'a [Entity],
    ) -> Self {
        Self {
            env,
            commands,
            roster,
        }
    }

    pub fn frame(&self) -> u64 {
        self.env.frame
    }

    /// Last in-bounds pointer position reported by the platform layer.
    pub fn pointer(&self) -> Vec2 {
        self.env.pointer
    }

    pub fn canvas(&self) -> Canvas {
        self.env.canvas
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.env.rng
    }

    /// Queues a new entity. It joins the registry once the current phase
    /// finishes and receives its first callbacks on the next tick.
    pub fn spawn(
        &mut self,
        template: EntityTemplate,
        behavior: impl Behavior + 'static,
    ) -> EntityId {
        let id = self.commands.allocate();
        self.commands.spawns.push(PendingSpawn {
            entity: template.into_entity(id),
            behavior: Box::new(behavior),
        });
        id
    }

    /// Asks the registry to flag another entity as destroyed once the current
    /// phase finishes.
    pub fn request_destroy(&mut self, id: EntityId) {
        self.commands.destroy_requests.push(id);
    }

    /// Copy of an entity as it was when the tick's dispatch snapshot was taken.
    pub fn lookup(&self, id: EntityId) -> Option<&Entity> {
        self.roster
            .binary_search_by_key(&id, Entity::id)
            .ok()
            .map(|index| &self.roster[index])
    }

    pub fn roster(&self) -> &[Entity] {
        self.roster
    }

    pub fn raise_game_over(&self, reason: &str) -> bool {
        self.env.game_over.raise(reason)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn canvas_bounds_are_half_open() {
        let canvas = Canvas::new(640, 480);
        assert!(canvas.contains(0.0, 0.0));
        assert!(canvas.contains(639.5, 479.5));
        assert!(!canvas.contains(640.0, 10.0));
        assert!(!canvas.contains(10.0, 480.0));
        assert!(!canvas.contains(-0.5, 10.0));
    }

    #[test]
    fn game_over_is_raised_exactly_once_across_threads() {
        let signal = GameOverSignal::default();
        let raised = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let signal = signal.clone();
                    scope.spawn(move || signal.raise("test"))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("join"))
                .filter(|first| *first)
                .count()
        });

        assert_eq!(raised, 1);
        assert!(signal.is_raised());
        assert!(!signal.raise("again"));
    }

    #[test]
    fn seeded_env_is_deterministic() {
        use rand::Rng;

        let mut first = TickEnv::new(Canvas::default(), Some(7));
        let mut second = TickEnv::new(Canvas::default(), Some(7));
        let a: u64 = first.rng.gen();
        let b: u64 = second.rng.gen();
        assert_eq!(a, b);
    }
}
