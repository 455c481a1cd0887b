//! X11-specific implementations.
//!
//! This module provides concrete backends for the
//! [`WindowSystem`](crate::traits::WindowSystem) and
//! [`EventSource`](crate::traits::EventSource) traits, powered by `x11rb`.
//!
//! Nothing outside this module should reference X11 directly.

pub mod events;
pub mod wm;

pub use events::X11Events;
pub use wm::{X11Error, X11Wm};
