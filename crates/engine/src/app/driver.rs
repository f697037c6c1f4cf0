use tracing::{debug, info};

use super::collision::CollisionResolver;
use super::context::{Canvas, GameOverSignal, TickContext, TickEnv};
use super::input::InputStateMachine;
use super::registry::EntityRegistry;
use super::rendering::DrawList;

/// Populates a fresh driver with its initial entities.
pub trait Scene {
    fn name(&self) -> &str;
    fn load(&mut self, ctx: &mut TickContext<'_>);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub frame: u64,
    pub input_events: usize,
    pub stepped: usize,
    pub collision_pairs: usize,
    pub swept: usize,
    pub spawned: usize,
    pub live_entities: usize,
}

/// Runs one simulation tick per call:
/// input dispatch, logic step, collisions, sweep. Rendering is a separate,
/// read-only pass the caller makes once per frame.
///
/// A behavior hook that panics has its entity flagged destroyed; the tick
/// runs to completion and the next sweep removes it.
pub struct GameLoopDriver {
    input: InputStateMachine,
    registry: EntityRegistry,
    collisions: CollisionResolver,
    env: TickEnv,
}

impl GameLoopDriver {
    pub fn new(canvas: Canvas, seed: Option<u64>) -> Self {
        Self {
            input: InputStateMachine::new(canvas),
            registry: EntityRegistry::new(),
            collisions: CollisionResolver::new(),
            env: TickEnv::new(canvas, seed),
        }
    }

    /// Handle for the platform layer. Clones share the driver's edge buffer.
    pub fn input(&self) -> &InputStateMachine {
        &self.input
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn game_over(&self) -> GameOverSignal {
        self.env.game_over.clone()
    }

    pub fn frame(&self) -> u64 {
        self.env.frame
    }

    pub fn load_scene(&mut self, scene: &mut dyn Scene) -> usize {
        self.env.canvas = self.input.canvas();
        self.registry.with_context(&mut self.env, |ctx| scene.load(ctx));
        let spawned = self.registry.apply_commands();
        info!(
            scene = scene.name(),
            entity_count = self.registry.len(),
            "scene_loaded"
        );
        spawned
    }

    pub fn tick(&mut self) -> TickReport {
        self.env.frame = self.env.frame.saturating_add(1);
        let mut report = TickReport {
            frame: self.env.frame,
            ..TickReport::default()
        };

        // Dispatch input.
        let drain = self.input.drain_and_advance();
        self.env.pointer = drain.pointer;
        self.env.canvas = self.input.canvas();
        let snapshot = self.registry.snapshot_for_dispatch();
        for event in &drain.events {
            // Every entity sees this code before the next code is dispatched.
            self.registry
                .dispatch_each(&snapshot, &mut self.env, "on_input", |entity, behavior, ctx| {
                    behavior.on_input(entity, *event, ctx)
                });
        }
        report.input_events = drain.events.len();
        report.spawned += self.registry.apply_commands();

        // Step logic.
        report.stepped = self
            .registry
            .dispatch_each(&snapshot, &mut self.env, "step", |entity, behavior, ctx| {
                behavior.step(entity, ctx)
            });
        report.spawned += self.registry.apply_commands();

        // Resolve collisions against post-step positions.
        report.collision_pairs =
            self.collisions
                .resolve(&mut self.registry, &snapshot, &mut self.env);
        report.spawned += self.registry.apply_commands();

        // Sweep.
        let sweep = self.registry.sweep(&mut self.env);
        report.swept = sweep.removed;
        report.spawned += sweep.spawned;

        report.live_entities = self.registry.len();
        debug!(
            frame = report.frame,
            input_events = report.input_events,
            collision_pairs = report.collision_pairs,
            swept = report.swept,
            spawned = report.spawned,
            live_entities = report.live_entities,
            "tick_complete"
        );
        report
    }

    /// Fills `draw` with this frame's commands. Calling it again without a
    /// tick in between yields the same list.
    pub fn render(&self, draw: &mut DrawList) {
        draw.clear();
        self.registry.render(draw);
    }
}
