use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{trace, warn};

use super::context::Canvas;
use super::entity::Vec2;

static INPUT_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_input_lock_poison_once(operation: &'static str) {
    if INPUT_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "input lock poisoned; recovered inner value");
    }
}

/// Integer key code. Values follow the classic virtual-key numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const ENTER: KeyCode = KeyCode(10);
    pub const ESCAPE: KeyCode = KeyCode(27);
    pub const SPACE: KeyCode = KeyCode(32);
    pub const LEFT: KeyCode = KeyCode(37);
    pub const UP: KeyCode = KeyCode(38);
    pub const RIGHT: KeyCode = KeyCode(39);
    pub const DOWN: KeyCode = KeyCode(40);
    pub const A: KeyCode = KeyCode(65);
    pub const D: KeyCode = KeyCode(68);
    pub const S: KeyCode = KeyCode(83);
    pub const W: KeyCode = KeyCode(87);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonCode(pub u32);

impl ButtonCode {
    pub const PRIMARY: ButtonCode = ButtonCode(1);
    pub const MIDDLE: ButtonCode = ButtonCode(2);
    pub const SECONDARY: ButtonCode = ButtonCode(3);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeState {
    Pressed,
    Held,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPhase {
    Press,
    Held,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Key(KeyCode),
    Button(ButtonCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub source: InputSource,
    pub phase: InputPhase,
}

impl InputEvent {
    pub fn key(&self) -> Option<KeyCode> {
        match self.source {
            InputSource::Key(code) => Some(code),
            InputSource::Button(_) => None,
        }
    }

    pub fn button(&self) -> Option<ButtonCode> {
        match self.source {
            InputSource::Button(code) => Some(code),
            InputSource::Key(_) => None,
        }
    }

    pub fn is_key(&self, code: KeyCode, phase: InputPhase) -> bool {
        self.phase == phase && self.key() == Some(code)
    }

    pub fn is_button(&self, code: ButtonCode, phase: InputPhase) -> bool {
        self.phase == phase && self.button() == Some(code)
    }
}

/// Result of one drain: the events to fan out this tick, in dispatch order,
/// and the pointer position at drain time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputDrain {
    pub events: Vec<InputEvent>,
    pub pointer: Vec2,
}

#[derive(Debug, Default)]
struct EdgeBuffers {
    keys: HashMap<KeyCode, EdgeState>,
    buttons: HashMap<ButtonCode, EdgeState>,
    pointer: Vec2,
    canvas: Canvas,
}

/// Converts raw down/up edge notifications into press/held/release
/// transitions consumed once per tick.
///
/// Clones share one buffer, so a clone can be handed to the platform layer
/// and notified from any thread while the driver drains its own handle.
#[derive(Debug, Clone, Default)]
pub struct InputStateMachine {
    shared: Arc<Mutex<EdgeBuffers>>,
}

impl InputStateMachine {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            shared: Arc::new(Mutex::new(EdgeBuffers {
                canvas,
                ..EdgeBuffers::default()
            })),
        }
    }

    pub fn notify_key_down(&self, code: KeyCode) {
        self.lock("key_down").keys.insert(code, EdgeState::Pressed);
    }

    pub fn notify_key_up(&self, code: KeyCode) {
        self.lock("key_up").keys.insert(code, EdgeState::Released);
    }

    pub fn notify_button_down(&self, code: ButtonCode) {
        self.lock("button_down")
            .buttons
            .insert(code, EdgeState::Pressed);
    }

    pub fn notify_button_up(&self, code: ButtonCode) {
        self.lock("button_up")
            .buttons
            .insert(code, EdgeState::Released);
    }

    /// Platform entry point for a button press at a pointer position. Events
    /// outside the canvas are dropped; returns whether the event was accepted.
    pub fn on_mouse_down(&self, x: f32, y: f32, button: ButtonCode) -> bool {
        let mut buffers = self.lock("mouse_down");
        if !buffers.canvas.contains(x, y) {
            trace!(x, y, button = button.0, "mouse_down_out_of_canvas");
            return false;
        }
        buffers.buttons.insert(button, EdgeState::Pressed);
        true
    }

    pub fn on_mouse_up(&self, x: f32, y: f32, button: ButtonCode) -> bool {
        let mut buffers = self.lock("mouse_up");
        if !buffers.canvas.contains(x, y) {
            trace!(x, y, button = button.0, "mouse_up_out_of_canvas");
            return false;
        }
        buffers.buttons.insert(button, EdgeState::Released);
        true
    }

    pub fn on_mouse_move(&self, x: f32, y: f32) -> bool {
        let mut buffers = self.lock("mouse_move");
        if !buffers.canvas.contains(x, y) {
            trace!(x, y, "mouse_move_out_of_canvas");
            return false;
        }
        buffers.pointer = Vec2::new(x, y);
        true
    }

    pub fn set_canvas(&self, canvas: Canvas) {
        self.lock("set_canvas").canvas = canvas;
    }

    pub fn canvas(&self) -> Canvas {
        self.lock("canvas").canvas
    }

    pub fn pointer(&self) -> Vec2 {
        self.lock("pointer").pointer
    }

    pub fn key_state(&self, code: KeyCode) -> Option<EdgeState> {
        self.lock("key_state").keys.get(&code).copied()
    }

    pub fn button_state(&self, code: ButtonCode) -> Option<EdgeState> {
        self.lock("button_state").buttons.get(&code).copied()
    }

    /// Takes this tick's transitions and advances every code in one critical
    /// section: pressed codes become held, released codes are forgotten.
    /// Keys come before buttons, each in ascending code order.
    ///
    /// Notifications racing with the caller land either before the drain
    /// (and are part of it) or after it (and wait for the next tick); an edge
    /// is never overwritten by the advance.
    pub fn drain_and_advance(&self) -> InputDrain {
        let mut buffers = self.lock("drain");
        let mut events = Vec::with_capacity(buffers.keys.len() + buffers.buttons.len());

        for (code, phase) in advance_codes(&mut buffers.keys) {
            events.push(InputEvent {
                source: InputSource::Key(code),
                phase,
            });
        }
        for (code, phase) in advance_codes(&mut buffers.buttons) {
            events.push(InputEvent {
                source: InputSource::Button(code),
                phase,
            });
        }

        InputDrain {
            events,
            pointer: buffers.pointer,
        }
    }

    fn lock(&self, operation: &'static str) -> MutexGuard<'_, EdgeBuffers> {
        match self.shared.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_input_lock_poison_once(operation);
                poisoned.into_inner()
            }
        }
    }
}

fn advance_codes<C>(states: &mut HashMap<C, EdgeState>) -> Vec<(C, InputPhase)>
where
    C: Copy + Ord + std::hash::Hash,
{
    let mut codes: Vec<C> = states.keys().copied().collect();
    codes.sort_unstable();

    let mut transitions = Vec::with_capacity(codes.len());
    for code in codes {
        let Some(state) = states.get(&code).copied() else {
            continue;
        };
        match state {
            EdgeState::Pressed => {
                states.insert(code, EdgeState::Held);
                transitions.push((code, InputPhase::Press));
            }
            EdgeState::Held => transitions.push((code, InputPhase::Held)),
            EdgeState::Released => {
                states.remove(&code);
                transitions.push((code, InputPhase::Release));
            }
        }
    }
    transitions
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn key_phases(drain: &InputDrain, code: KeyCode) -> Vec<InputPhase> {
        drain
            .events
            .iter()
            .filter(|event| event.key() == Some(code))
            .map(|event| event.phase)
            .collect()
    }

    #[test]
    fn key_down_then_three_ticks_is_press_held_held() {
        let input = InputStateMachine::new(Canvas::default());
        input.notify_key_down(KeyCode(87));

        let first = input.drain_and_advance();
        let second = input.drain_and_advance();
        let third = input.drain_and_advance();

        assert_eq!(key_phases(&first, KeyCode::W), vec![InputPhase::Press]);
        assert_eq!(key_phases(&second, KeyCode::W), vec![InputPhase::Held]);
        assert_eq!(key_phases(&third, KeyCode::W), vec![InputPhase::Held]);
    }

    #[test]
    fn release_is_dispatched_once_then_code_is_forgotten() {
        let input = InputStateMachine::new(Canvas::default());
        input.notify_key_down(KeyCode::A);
        let _ = input.drain_and_advance();
        input.notify_key_up(KeyCode::A);

        let release = input.drain_and_advance();
        assert_eq!(key_phases(&release, KeyCode::A), vec![InputPhase::Release]);
        assert_eq!(input.key_state(KeyCode::A), None);

        let after = input.drain_and_advance();
        assert!(after.events.is_empty());
    }

    #[test]
    fn down_and_up_before_a_drain_only_releases() {
        let input = InputStateMachine::new(Canvas::default());
        input.notify_key_down(KeyCode::S);
        input.notify_key_up(KeyCode::S);

        let drain = input.drain_and_advance();
        assert_eq!(key_phases(&drain, KeyCode::S), vec![InputPhase::Release]);
    }

    #[test]
    fn keys_and_buttons_are_independent_namespaces() {
        let input = InputStateMachine::new(Canvas::default());
        input.notify_key_down(KeyCode(1));
        input.notify_button_down(ButtonCode(1));
        let _ = input.drain_and_advance();
        input.notify_button_up(ButtonCode(1));

        let drain = input.drain_and_advance();
        assert_eq!(
            drain.events,
            vec![
                InputEvent {
                    source: InputSource::Key(KeyCode(1)),
                    phase: InputPhase::Held,
                },
                InputEvent {
                    source: InputSource::Button(ButtonCode(1)),
                    phase: InputPhase::Release,
                },
            ]
        );
        assert_eq!(input.key_state(KeyCode(1)), Some(EdgeState::Held));
        assert_eq!(input.button_state(ButtonCode(1)), None);
    }

    #[test]
    fn drain_orders_keys_then_buttons_by_code() {
        let input = InputStateMachine::new(Canvas::default());
        input.notify_button_down(ButtonCode::SECONDARY);
        input.notify_key_down(KeyCode::W);
        input.notify_button_down(ButtonCode::PRIMARY);
        input.notify_key_down(KeyCode::A);

        let sources: Vec<InputSource> = input
            .drain_and_advance()
            .events
            .into_iter()
            .map(|event| event.source)
            .collect();
        assert_eq!(
            sources,
            vec![
                InputSource::Key(KeyCode::A),
                InputSource::Key(KeyCode::W),
                InputSource::Button(ButtonCode::PRIMARY),
                InputSource::Button(ButtonCode::SECONDARY),
            ]
        );
    }

    #[test]
    fn pointer_move_on_canvas_edge_is_dropped() {
        let input = InputStateMachine::new(Canvas::new(320, 240));
        assert!(input.on_mouse_move(10.0, 20.0));
        assert!(!input.on_mouse_move(10.0, 240.0));
        assert!(!input.on_mouse_move(320.0, 20.0));
        assert!(!input.on_mouse_move(-1.0, 20.0));
        assert_eq!(input.pointer(), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn out_of_canvas_buttons_are_ignored() {
        let input = InputStateMachine::new(Canvas::new(320, 240));
        assert!(!input.on_mouse_down(400.0, 10.0, ButtonCode::PRIMARY));
        assert!(!input.on_mouse_up(10.0, 300.0, ButtonCode::PRIMARY));
        assert!(input.drain_and_advance().events.is_empty());

        assert!(input.on_mouse_down(5.0, 5.0, ButtonCode::PRIMARY));
        assert_eq!(
            input.button_state(ButtonCode::PRIMARY),
            Some(EdgeState::Pressed)
        );
    }

    #[test]
    fn canvas_resize_changes_accepted_region() {
        let input = InputStateMachine::new(Canvas::new(100, 100));
        assert!(!input.on_mouse_move(150.0, 50.0));
        input.set_canvas(Canvas::new(200, 100));
        assert!(input.on_mouse_move(150.0, 50.0));
    }

    #[test]
    fn concurrent_notifications_are_never_lost() {
        let input = InputStateMachine::new(Canvas::default());
        let platform = input.clone();

        let mut presses = 0usize;
        let mut releases = 0usize;
        thread::scope(|scope| {
            let producer = scope.spawn(move || {
                for code in 0..200u32 {
                    platform.notify_key_down(KeyCode(code));
                    platform.notify_key_up(KeyCode(code));
                }
            });
            while !producer.is_finished() {
                for event in input.drain_and_advance().events {
                    match event.phase {
                        InputPhase::Press => presses += 1,
                        InputPhase::Release => releases += 1,
                        InputPhase::Held => {}
                    }
                }
            }
            producer.join().expect("producer");
        });
        for event in input.drain_and_advance().events {
            match event.phase {
                InputPhase::Press => presses += 1,
                InputPhase::Release => releases += 1,
                InputPhase::Held => {}
            }
        }

        assert_eq!(releases, 200);
        assert!(presses <= 200);
        assert!(input.drain_and_advance().events.is_empty());
    }
}
