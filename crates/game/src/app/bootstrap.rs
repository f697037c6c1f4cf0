use engine::{LoopConfig, Scene};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{ArenaConfig, ConfigError};
use super::gameplay::ArenaScene;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, ConfigError> {
    init_tracing();
    info!("=== Arcade Startup ===");

    let arena = ArenaConfig::from_env()?;
    info!(
        enemy_count = arena.enemy_count,
        canvas_width = arena.canvas_width,
        canvas_height = arena.canvas_height,
        seed = ?arena.seed,
        "arena_config"
    );

    Ok(AppWiring {
        config: arena.loop_config(),
        scene: Box::new(ArenaScene::new(arena)),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
