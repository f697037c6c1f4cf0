mod collision;
mod context;
mod driver;
mod entity;
mod input;
mod loop_runner;
mod metrics;
mod particles;
mod registry;
mod rendering;

pub use collision::{overlapping_pairs, Aabb, CollisionResolver};
pub use context::{Canvas, GameOverSignal, TickContext};
pub use driver::{GameLoopDriver, Scene, TickReport};
pub use entity::{Behavior, Entity, EntityId, EntityKind, EntityTemplate, HalfExtents, Vec2};
pub use input::{
    ButtonCode, EdgeState, InputDrain, InputEvent, InputPhase, InputSource, InputStateMachine,
    KeyCode,
};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use particles::{Particle, ParticleSystem, PARTICLE_SYSTEM_KIND};
pub use registry::{DispatchSnapshot, EntityRegistry, SweepReport};
pub use rendering::{Color, DrawCommand, DrawList, Renderer, BACKGROUND_COLOR};
