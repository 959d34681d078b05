use cubelit_common::Direction;
use std::collections::BTreeMap;

/// Keys the viewer reacts to. The windowing layer maps its own key codes
/// onto these; everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    W,
    A,
    S,
    D,
    Escape,
    Other,
}

/// A high-level action bound to a key.
///
/// The frame loop consumes actions, never raw key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move the camera while the key is held.
    Move(Direction),
    /// Request shutdown between frames.
    Exit,
}

/// Key to action table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    bindings: BTreeMap<Key, Action>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = BTreeMap::new();
        bindings.insert(Key::W, Action::Move(Direction::Forward));
        bindings.insert(Key::S, Action::Move(Direction::Backward));
        bindings.insert(Key::A, Action::Move(Direction::Left));
        bindings.insert(Key::D, Action::Move(Direction::Right));
        bindings.insert(Key::Escape, Action::Exit);
        Self { bindings }
    }
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Bind `key` to `action`, returning the previous binding.
    pub fn bind(&mut self, key: Key, action: Action) -> Option<Action> {
        self.bindings.insert(key, action)
    }

    pub fn action(&self, key: Key) -> Option<Action> {
        self.bindings.get(&key).copied()
    }
}
