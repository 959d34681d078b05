use crate::action::{Action, Key, KeyBindings};
use cubelit_camera::Camera;
use cubelit_common::Direction;
use glam::{DVec2, Vec2};
use std::collections::BTreeSet;

/// Raw event recorded by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key { key: Key, pressed: bool },
    /// Absolute pointer position in window pixels, y growing downward.
    CursorMoved { x: f64, y: f64 },
    Scroll { x: f64, y: f64 },
    CloseRequested,
}

/// Events accumulated between frames.
///
/// The windowing layer only pushes; the frame loop drains once per tick.
#[derive(Debug, Default)]
pub struct InputBuffer {
    events: Vec<InputEvent>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take every pending event, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Everything the frame absorbed from input this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    /// Held movement directions, in `Direction::ALL` order.
    pub movement: Vec<Direction>,
    /// Pointer delta in pixels; positive y means the pointer moved up.
    pub look: Vec2,
    pub scroll: Vec2,
    pub exit_requested: bool,
}

impl FrameInput {
    /// Feed this frame's input to the camera: movement scaled by `dt`,
    /// then look, then zoom.
    pub fn apply_to(&self, camera: &mut Camera, dt: f32) {
        for &direction in &self.movement {
            camera.handle_key_input(direction, dt);
        }
        if self.look != Vec2::ZERO {
            camera.handle_mouse_input(self.look.x, self.look.y);
        }
        if self.scroll != Vec2::ZERO {
            camera.handle_mouse_scroll_input(self.scroll.x, self.scroll.y);
        }
    }
}

/// Input state carried across frames: held keys and the last pointer sample.
#[derive(Debug, Clone)]
pub struct InputState {
    bindings: KeyBindings,
    held: BTreeSet<Key>,
    last_cursor: DVec2,
}

impl InputState {
    /// `initial_cursor` is the reference for the first pointer sample,
    /// normally the window centre.
    pub fn new(bindings: KeyBindings, initial_cursor: DVec2) -> Self {
        Self {
            bindings,
            held: BTreeSet::new(),
            last_cursor: initial_cursor,
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Fold a drained batch of events into this frame's input.
    pub fn apply(&mut self, events: impl IntoIterator<Item = InputEvent>) -> FrameInput {
        let mut frame = FrameInput::default();
        for event in events {
            match event {
                InputEvent::Key { key, pressed } => {
                    if pressed {
                        self.held.insert(key);
                        if self.bindings.action(key) == Some(Action::Exit) {
                            frame.exit_requested = true;
                        }
                    } else {
                        self.held.remove(&key);
                    }
                }
                InputEvent::CursorMoved { x, y } => {
                    let dx = x - self.last_cursor.x;
                    let dy = self.last_cursor.y - y;
                    self.last_cursor = DVec2::new(x, y);
                    frame.look += Vec2::new(dx as f32, dy as f32);
                }
                InputEvent::Scroll { x, y } => {
                    frame.scroll += Vec2::new(x as f32, y as f32);
                }
                InputEvent::CloseRequested => frame.exit_requested = true,
            }
        }

        let held_directions: BTreeSet<Direction> = self
            .held
            .iter()
            .filter_map(|&key| match self.bindings.action(key) {
                Some(Action::Move(direction)) => Some(direction),
                _ => None,
            })
            .collect();
        frame.movement = Direction::ALL
            .into_iter()
            .filter(|d| held_directions.contains(d))
            .collect();

        if frame.exit_requested {
            tracing::debug!("shutdown requested");
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> InputState {
        InputState::new(KeyBindings::default(), DVec2::new(600.0, 400.0))
    }

    fn key(key: Key, pressed: bool) -> InputEvent {
        InputEvent::Key { key, pressed }
    }

    #[test]
    fn buffer_drains_once() {
        let mut buffer = InputBuffer::new();
        buffer.push(key(Key::W, true));
        buffer.push(InputEvent::Scroll { x: 0.0, y: 1.0 });
        assert_eq!(buffer.len(), 2);
        let events = buffer.drain();
        assert_eq!(events.len(), 2);
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn held_keys_persist_across_frames() {
        let mut input = state();
        let f1 = input.apply([key(Key::D, true), key(Key::W, true)]);
        assert_eq!(f1.movement, vec![Direction::Forward, Direction::Right]);

        let f2 = input.apply(Vec::<InputEvent>::new());
        assert_eq!(f2.movement, vec![Direction::Forward, Direction::Right]);

        let f3 = input.apply([key(Key::W, false)]);
        assert_eq!(f3.movement, vec![Direction::Right]);
        assert!(!input.is_held(Key::W));
    }

    #[test]
    fn press_and_release_in_one_frame_does_not_move() {
        let mut input = state();
        let frame = input.apply([key(Key::S, true), key(Key::S, false)]);
        assert!(frame.movement.is_empty());
    }

    #[test]
    fn cursor_deltas_invert_y() {
        let mut input = state();
        let frame = input.apply([InputEvent::CursorMoved { x: 610.0, y: 390.0 }]);
        assert_eq!(frame.look, Vec2::new(10.0, 10.0));

        let frame = input.apply([
            InputEvent::CursorMoved { x: 600.0, y: 400.0 },
            InputEvent::CursorMoved { x: 590.0, y: 420.0 },
        ]);
        assert_eq!(frame.look, Vec2::new(-20.0, -30.0));
    }

    #[test]
    fn scroll_offsets_accumulate() {
        let mut input = state();
        let frame = input.apply([
            InputEvent::Scroll { x: 0.0, y: 1.0 },
            InputEvent::Scroll { x: 0.5, y: 2.0 },
        ]);
        assert_eq!(frame.scroll, Vec2::new(0.5, 3.0));
    }

    #[test]
    fn escape_and_close_request_exit() {
        let mut input = state();
        assert!(input.apply([key(Key::Escape, true)]).exit_requested);
        assert!(!input.apply([key(Key::Escape, false)]).exit_requested);
        assert!(input.apply([InputEvent::CloseRequested]).exit_requested);
        assert!(!input.apply([key(Key::Other, true)]).exit_requested);
    }

    #[test]
    fn apply_to_moves_rotates_and_zooms() {
        let mut input = state();
        let mut camera = Camera::default();
        let start = camera.position();

        let frame = input.apply([
            key(Key::W, true),
            InputEvent::Scroll { x: 0.0, y: 5.0 },
        ]);
        frame.apply_to(&mut camera, 0.1);

        let expected = start + camera.front() * camera.movement_speed() * 0.1;
        assert!(camera.position().abs_diff_eq(expected, 1e-3));
        assert_eq!(camera.zoom(), 40.0);

        let yaw = camera.yaw();
        let frame = input.apply([InputEvent::CursorMoved { x: 700.0, y: 400.0 }]);
        frame.apply_to(&mut camera, 0.0);
        assert!((camera.yaw() - yaw - 100.0 * camera.mouse_sensitivity()).abs() < 1e-3);
    }
}
