//! **maxwm**: a minimal maximizing window manager.
//!
//! Windows float freely; the manager keeps them in a focus-ordered ring per
//! desktop, moves and resizes them in fixed steps from the keyboard or by
//! pointer drags, and toggles them between their own geometry and a
//! maximized one that leaves a band free at the top for a status bar.  Ten
//! desktops hold independent rings; only the active one is mapped.
//!
//! # Architecture
//!
//! The crate is organised around three core traits:
//!
//! * [`traits::WindowSystem`]: the primitive window operations (map, move,
//!   focus, grab…), so the state engine is not coupled to X11.
//! * [`traits::EventSource`]: a blocking stream of [`traits::Event`]s.
//! * [`traits::Launcher`]: starts helper programs.
//!
//! [`manager::Manager`] owns the state ([`desktop::Desktops`] of
//! [`registry::Registry`]s) and drives the traits.  Concrete implementations
//! live in [`x11`] (core X11 via `x11rb`) and [`launcher`] (detached child
//! processes).

pub mod bindings;
pub mod command;
pub mod config;
pub mod desktop;
pub mod geometry;
pub mod launcher;
pub mod manager;
pub mod registry;
pub mod status;
pub mod traits;
pub mod x11;

#[cfg(test)]
pub(crate) mod mock;
