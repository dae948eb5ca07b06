use glam::Vec2;
use std::collections::HashSet;

/// Keys the scene reacts to. Hosts map their native key codes onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    Shift,
    Escape,
    Tab,
}

/// Snapshot of held keys, pointer motion and UI capture for one frame.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    keys_held: HashSet<Key>,
    pointer_delta: Vec2,
    primary_held: bool,
    keyboard_captured: bool,
    mouse_captured: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-frame accumulators. Held keys and buttons persist.
    pub fn begin_frame(&mut self) {
        self.pointer_delta = Vec2::ZERO;
    }

    pub fn press(&mut self, key: Key) {
        if self.keys_held.insert(key) {
            tracing::trace!(?key, "key down");
        }
    }

    pub fn release(&mut self, key: Key) {
        self.keys_held.remove(&key);
    }

    pub fn set_key(&mut self, key: Key, down: bool) {
        if down {
            self.press(key);
        } else {
            self.release(key);
        }
    }

    /// Add raw pointer motion in pixels.
    pub fn add_pointer_delta(&mut self, dx: f32, dy: f32) {
        self.pointer_delta += Vec2::new(dx, dy);
    }

    pub fn set_primary_button(&mut self, held: bool) {
        self.primary_held = held;
    }

    /// Record whether the UI overlay wants keyboard and mouse this frame.
    pub fn set_capture(&mut self, keyboard: bool, mouse: bool) {
        self.keyboard_captured = keyboard;
        self.mouse_captured = mouse;
    }

    pub fn key_down(&self, key: Key) -> bool {
        !self.keyboard_captured && self.keys_held.contains(&key)
    }

    /// Pointer motion since the last `begin_frame`.
    pub fn pointer_delta(&self) -> Vec2 {
        if self.mouse_captured {
            Vec2::ZERO
        } else {
            self.pointer_delta
        }
    }

    pub fn primary_held(&self) -> bool {
        !self.mouse_captured && self.primary_held
    }

    pub fn keyboard_captured(&self) -> bool {
        self.keyboard_captured
    }

    pub fn mouse_captured(&self) -> bool {
        self.mouse_captured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_hold_until_released() {
        let mut input = InputState::new();
        input.press(Key::W);
        input.begin_frame();
        assert!(input.key_down(Key::W));
        input.release(Key::W);
        assert!(!input.key_down(Key::W));
    }

    #[test]
    fn pointer_delta_accumulates_and_resets() {
        let mut input = InputState::new();
        input.add_pointer_delta(2.0, 1.0);
        input.add_pointer_delta(3.0, -4.0);
        assert_eq!(input.pointer_delta(), Vec2::new(5.0, -3.0));
        input.begin_frame();
        assert_eq!(input.pointer_delta(), Vec2::ZERO);
    }

    #[test]
    fn keyboard_capture_hides_keys() {
        let mut input = InputState::new();
        input.press(Key::Space);
        input.set_capture(true, false);
        assert!(!input.key_down(Key::Space));
        input.set_capture(false, false);
        assert!(input.key_down(Key::Space));
    }

    #[test]
    fn mouse_capture_hides_pointer() {
        let mut input = InputState::new();
        input.set_primary_button(true);
        input.add_pointer_delta(10.0, 0.0);
        input.set_capture(false, true);
        assert!(!input.primary_held());
        assert_eq!(input.pointer_delta(), Vec2::ZERO);
    }
}
