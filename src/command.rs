//! Commands and types used throughout maxwm.
//!
//! This module defines the vocabulary that all components share:
//! [`Command`] describes every action a key binding can trigger, and
//! [`Direction`] / [`ModMask`] / [`Geometry`] / [`WindowHandle`] provide the
//! supporting data types.
//!
//! Directions and modifier masks are written as strings in the config file
//! (`"left"`, `"Mod1|Shift"`) and parsed case-insensitively here.

use bitflags::bitflags;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier of a window in the windowing system.
///
/// The manager never owns the window; the handle is only an identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub u32);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// A pixel value returned by the windowing system for a named color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorHandle(pub u32);

/// Direction for keyboard move / resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Left,
    Down,
    Up,
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Down => write!(f, "down"),
            Direction::Up => write!(f, "up"),
            Direction::Right => write!(f, "right"),
        }
    }
}

/// Parse a direction string (case-insensitive, surrounding whitespace ignored).
fn parse_direction(s: &str) -> Option<Direction> {
    match s.trim().to_lowercase().as_str() {
        "left" => Some(Direction::Left),
        "down" => Some(Direction::Down),
        "up" => Some(Direction::Up),
        "right" => Some(Direction::Right),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_direction(&s).ok_or_else(|| DeError::custom(format!("invalid direction: {:?}", s)))
    }
}

bitflags! {
    /// Keyboard modifier mask, bit-compatible with the core X11 protocol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModMask: u16 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
    }
}

impl ModMask {
    /// Modifiers that never take part in binding lookup (Caps Lock and, on
    /// almost every keyboard map, Num Lock).
    pub const IGNORED: ModMask = ModMask::LOCK.union(ModMask::MOD2);

    /// Strip the [`IGNORED`](Self::IGNORED) lock modifiers.
    pub fn clean(self) -> ModMask {
        self.difference(Self::IGNORED)
    }
}

/// Error from parsing a modifier string such as `"Mod1|Shift"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown modifier: {0:?}")]
pub struct ParseModMaskError(String);

impl FromStr for ModMask {
    type Err = ParseModMaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mask = ModMask::empty();
        for part in s.split(['|', '+']) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            mask |= match part.to_lowercase().as_str() {
                "shift" => ModMask::SHIFT,
                "lock" => ModMask::LOCK,
                "control" | "ctrl" => ModMask::CONTROL,
                "mod1" | "alt" => ModMask::MOD1,
                "mod2" => ModMask::MOD2,
                "mod3" => ModMask::MOD3,
                "mod4" | "super" => ModMask::MOD4,
                "mod5" => ModMask::MOD5,
                _ => return Err(ParseModMaskError(part.to_string())),
            };
        }
        Ok(mask)
    }
}

impl fmt::Display for ModMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ModMask, &str); 8] = [
            (ModMask::MOD1, "Mod1"),
            (ModMask::MOD2, "Mod2"),
            (ModMask::MOD3, "Mod3"),
            (ModMask::MOD4, "Mod4"),
            (ModMask::MOD5, "Mod5"),
            (ModMask::CONTROL, "Control"),
            (ModMask::SHIFT, "Shift"),
            (ModMask::LOCK, "Lock"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, n)| *n)
            .collect();
        write!(f, "{}", names.join("|"))
    }
}

impl<'de> Deserialize<'de> for ModMask {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(DeError::custom)
    }
}

impl Serialize for ModMask {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Position and size of a window in root-window pixels.
///
/// Width and height are kept signed so clamping arithmetic never wraps; the
/// geometry engine guarantees both stay at least `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Every action a key binding can trigger.
///
/// Commands are resolved from key chords by the
/// [`BindingTable`](crate::bindings::BindingTable) and executed by the
/// [`Manager`](crate::manager::Manager).
///
/// In the config file commands use serde's external tagging:
/// `"Raise"`, `{"Move": "left"}`, `{"SwitchDesktop": 3}`,
/// `{"Launch": ["urxvt"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Move the focused window one step in the given direction.
    Move(Direction),

    /// Grow (right / down) or shrink (left / up) the focused window by one
    /// step.
    Resize(Direction),

    /// Raise the window under the pointer, or the focused window when the
    /// pointer is over the root.
    Raise,

    /// Toggle the focused window between its normal and maximized geometry.
    ToggleMaximize,

    /// Ask the focused window to close itself.
    ///
    /// The client stays managed until the windowing system reports it
    /// destroyed.
    Close,

    /// Focus the next window of the active desktop, wrapping around.
    FocusNext,

    /// Focus the previous window of the active desktop, wrapping around.
    FocusPrev,

    /// Display desktop `n`.
    SwitchDesktop(usize),

    /// Send the focused window to desktop `n`; the active desktop stays.
    MoveToDesktop(usize),

    /// Launch a detached helper program.
    Launch(Vec<String>),

    /// Leave the event loop.
    Quit,
}

impl Command {
    /// The desktop index this command refers to, if any.
    pub fn desktop(&self) -> Option<usize> {
        match self {
            Command::SwitchDesktop(d) | Command::MoveToDesktop(d) => Some(*d),
            _ => None,
        }
    }
}
