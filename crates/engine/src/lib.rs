pub mod app;

pub use app::{
    overlapping_pairs, run_app, run_app_with_metrics, Aabb, AppError, Behavior, ButtonCode,
    Canvas, CollisionResolver, Color, DispatchSnapshot, DrawCommand, DrawList, EdgeState, Entity,
    EntityId, EntityKind, EntityRegistry, EntityTemplate, GameLoopDriver, GameOverSignal,
    HalfExtents, InputDrain, InputEvent, InputPhase, InputSource, InputStateMachine, KeyCode,
    LoopConfig, LoopMetricsSnapshot, MetricsHandle, Particle, ParticleSystem, Renderer, Scene,
    SweepReport, TickContext, TickReport, Vec2, BACKGROUND_COLOR, PARTICLE_SYSTEM_KIND,
};
