//! Input snapshots: events are buffered by the windowing layer and drained
//! once per frame, so camera updates happen at one deterministic point.
//!
//! # Invariants
//! - Events are only absorbed in [`InputState::apply`].
//! - Movement is reported in a fixed direction order.

pub mod action;
pub mod snapshot;

pub use action::{Action, Key, KeyBindings};
pub use snapshot::{FrameInput, InputBuffer, InputEvent, InputState};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
