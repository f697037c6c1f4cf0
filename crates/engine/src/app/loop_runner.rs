use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::window::WindowBuilder;

use super::context::Canvas;
use super::driver::{GameLoopDriver, Scene};
use super::input::{ButtonCode, InputStateMachine, KeyCode};
use super::metrics::MetricsAccumulator;
use super::rendering::{DrawList, Renderer};
use super::MetricsHandle;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
    /// Seed for the simulation rng; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Arcade".to_string(),
            window_width: 800,
            window_height: 600,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: None,
            seed: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, scene, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window: &'static winit::window::Window = Box::leak(Box::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .with_resizable(false)
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    ));
    let mut renderer = Renderer::new(window).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);

    let size = window.inner_size();
    let mut driver = GameLoopDriver::new(Canvas::new(size.width, size.height), config.seed);
    driver.load_scene(scene.as_mut());
    let game_over = driver.game_over();
    let mut platform_input = PlatformInput::new(driver.input().clone());

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        seed = ?config.seed,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut draw_list = DrawList::new();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    platform_input.set_canvas(new_size.width, new_size.height);
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    platform_input.set_canvas(size.width, size.height);
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    platform_input.cursor_moved(position.x as f32, position.y as f32);
                }
                WindowEvent::CursorLeft { .. } => {
                    platform_input.cursor_left();
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    platform_input.mouse_input(button, state);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.repeat {
                        return;
                    }
                    if event.state == ElementState::Pressed
                        && event.physical_key == PhysicalKey::Code(WinitKey::Escape)
                    {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                        return;
                    }
                    platform_input.key_input(event.physical_key, event.state);
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let report = driver.tick();
                        metrics_accumulator.record_tick(&report);
                        if game_over.is_raised() {
                            break;
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    if game_over.is_raised() {
                        info!(
                            reason = "game_over",
                            frame = driver.frame(),
                            "shutdown_requested"
                        );
                        window_target.exit();
                        return;
                    }

                    // Single authoritative FPS cap sleep point for render pacing.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    driver.render(&mut draw_list);
                    if let Err(error) = renderer.draw(&draw_list) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();
                    metrics_accumulator.record_frame(raw_frame_dt);

                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            entity_count = snapshot.entity_count,
                            collision_pairs = snapshot.collision_pairs,
                            swept = snapshot.swept,
                            spawned = snapshot.spawned,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!(
                    frame = driver.frame(),
                    entity_count = driver.registry().len(),
                    game_over = game_over.is_raised(),
                    "shutdown"
                );
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Translates window events into input state machine notifications. Mouse
/// buttons carry the last known cursor position, since winit reports it
/// separately.
#[derive(Debug)]
struct PlatformInput {
    input: InputStateMachine,
    cursor_px: Option<(f32, f32)>,
}

impl PlatformInput {
    fn new(input: InputStateMachine) -> Self {
        Self {
            input,
            cursor_px: None,
        }
    }

    fn set_canvas(&mut self, width: u32, height: u32) {
        self.input.set_canvas(Canvas::new(width, height));
    }

    fn cursor_moved(&mut self, x: f32, y: f32) {
        self.cursor_px = Some((x, y));
        self.input.on_mouse_move(x, y);
    }

    fn cursor_left(&mut self) {
        self.cursor_px = None;
    }

    fn mouse_input(&mut self, button: MouseButton, state: ElementState) {
        let Some(code) = button_code_from_winit(button) else {
            return;
        };
        let Some((x, y)) = self.cursor_px else {
            return;
        };
        match state {
            ElementState::Pressed => self.input.on_mouse_down(x, y, code),
            ElementState::Released => self.input.on_mouse_up(x, y, code),
        };
    }

    fn key_input(&mut self, key: PhysicalKey, state: ElementState) {
        let Some(code) = key_code_from_winit(key) else {
            return;
        };
        match state {
            ElementState::Pressed => self.input.notify_key_down(code),
            ElementState::Released => self.input.notify_key_up(code),
        }
    }
}

const LETTER_KEYS: [WinitKey; 26] = [
    WinitKey::KeyA,
    WinitKey::KeyB,
    WinitKey::KeyC,
    WinitKey::KeyD,
    WinitKey::KeyE,
    WinitKey::KeyF,
    WinitKey::KeyG,
    WinitKey::KeyH,
    WinitKey::KeyI,
    WinitKey::KeyJ,
    WinitKey::KeyK,
    WinitKey::KeyL,
    WinitKey::KeyM,
    WinitKey::KeyN,
    WinitKey::KeyO,
    WinitKey::KeyP,
    WinitKey::KeyQ,
    WinitKey::KeyR,
    WinitKey::KeyS,
    WinitKey::KeyT,
    WinitKey::KeyU,
    WinitKey::KeyV,
    WinitKey::KeyW,
    WinitKey::KeyX,
    WinitKey::KeyY,
    WinitKey::KeyZ,
];

const DIGIT_KEYS: [WinitKey; 10] = [
    WinitKey::Digit0,
    WinitKey::Digit1,
    WinitKey::Digit2,
    WinitKey::Digit3,
    WinitKey::Digit4,
    WinitKey::Digit5,
    WinitKey::Digit6,
    WinitKey::Digit7,
    WinitKey::Digit8,
    WinitKey::Digit9,
];

/// Maps a physical key to its virtual key code. Letters and digits use their
/// ASCII uppercase value.
fn key_code_from_winit(key: PhysicalKey) -> Option<KeyCode> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    if let Some(index) = LETTER_KEYS.iter().position(|letter| *letter == code) {
        return Some(KeyCode(KeyCode::A.0 + index as u32));
    }
    if let Some(index) = DIGIT_KEYS.iter().position(|digit| *digit == code) {
        return Some(KeyCode(48 + index as u32));
    }
    match code {
        WinitKey::Enter | WinitKey::NumpadEnter => Some(KeyCode::ENTER),
        WinitKey::Escape => Some(KeyCode::ESCAPE),
        WinitKey::Space => Some(KeyCode::SPACE),
        WinitKey::ArrowLeft => Some(KeyCode::LEFT),
        WinitKey::ArrowUp => Some(KeyCode::UP),
        WinitKey::ArrowRight => Some(KeyCode::RIGHT),
        WinitKey::ArrowDown => Some(KeyCode::DOWN),
        WinitKey::Tab => Some(KeyCode(9)),
        WinitKey::Backspace => Some(KeyCode(8)),
        WinitKey::ShiftLeft | WinitKey::ShiftRight => Some(KeyCode(16)),
        WinitKey::ControlLeft | WinitKey::ControlRight => Some(KeyCode(17)),
        _ => None,
    }
}

fn button_code_from_winit(button: MouseButton) -> Option<ButtonCode> {
    match button {
        MouseButton::Left => Some(ButtonCode::PRIMARY),
        MouseButton::Middle => Some(ButtonCode::MIDDLE),
        MouseButton::Right => Some(ButtonCode::SECONDARY),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}
