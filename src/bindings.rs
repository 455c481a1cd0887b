//! The key binding table.
//!
//! A [`BindingTable`] is an ordered list of `(modifiers, keysym) -> command`
//! entries.  Lookup is a linear scan where the first exact match wins, so
//! the order of the table is significant when two entries share a chord.
//!
//! Keys are named the way X11 names keysyms (`"h"`, `"Tab"`, `"Return"`,
//! `"F1"`); [`parse_keysym`] turns a name into its [`Keysym`] value.

use crate::command::{Command, ModMask};
use crate::desktop::DESKTOP_COUNT;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An X11 keysym value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keysym(pub u32);

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Named keysyms that are not a single printable character.
const NAMED_KEYSYMS: &[(&str, u32)] = &[
    ("space", 0x0020),
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Escape", 0xff1b),
    ("Delete", 0xffff),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Prior", 0xff55),
    ("Next", 0xff56),
    ("End", 0xff57),
    ("Print", 0xff61),
    ("Insert", 0xff63),
];

/// Keysym of `F1`; `F2`..`F12` follow consecutively.
const XK_F1: u32 = 0xffbe;

/// Parse a key name into its keysym.
///
/// Single printable ASCII characters map to themselves, with letters folded
/// to lowercase (Shift belongs in the modifier mask).  Names are matched
/// case-insensitively against the table of special keys.
pub fn parse_keysym(name: &str) -> Option<Keysym> {
    let name = name.trim();
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_graphic() {
            return Some(Keysym(c.to_ascii_lowercase() as u32));
        }
    }

    if let Some((_, sym)) = NAMED_KEYSYMS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
    {
        return Some(Keysym(*sym));
    }

    let fkey = name.strip_prefix('F').or_else(|| name.strip_prefix('f'))?;
    match fkey.parse::<u32>() {
        Ok(n @ 1..=12) => Some(Keysym(XK_F1 + n - 1)),
        _ => None,
    }
}

/// One entry of the binding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub mods: ModMask,
    pub keysym: Keysym,
    pub command: Command,
}

/// A binding as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSpec {
    #[serde(default)]
    pub mods: ModMask,
    pub key: String,
    pub command: Command,
}

/// Error from turning [`BindingSpec`]s into a [`BindingTable`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("unknown key name: {0:?}")]
    UnknownKey(String),
    #[error("binding {key:?} refers to desktop {desktop}, but only 0..{count} exist")]
    DesktopOutOfRange {
        key: String,
        desktop: usize,
        count: usize,
    },
    #[error("binding {0:?} launches an empty command")]
    EmptyLaunch(String),
}

/// Ordered `(modifiers, keysym) -> command` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    /// Build a table from config entries, validating key names, desktop
    /// indices and launch commands.
    pub fn from_specs(specs: &[BindingSpec]) -> Result<Self, BindingError> {
        let mut bindings = Vec::with_capacity(specs.len());
        for spec in specs {
            let keysym =
                parse_keysym(&spec.key).ok_or_else(|| BindingError::UnknownKey(spec.key.clone()))?;
            if let Some(desktop) = spec.command.desktop() {
                if desktop >= DESKTOP_COUNT {
                    return Err(BindingError::DesktopOutOfRange {
                        key: spec.key.clone(),
                        desktop,
                        count: DESKTOP_COUNT,
                    });
                }
            }
            if matches!(&spec.command, Command::Launch(argv) if argv.is_empty()) {
                return Err(BindingError::EmptyLaunch(spec.key.clone()));
            }
            bindings.push(Binding {
                mods: spec.mods,
                keysym,
                command: spec.command.clone(),
            });
        }
        Ok(Self { bindings })
    }

    /// The command bound to exactly `mods` + `keysym`, if any.
    pub fn resolve_key(&self, mods: ModMask, keysym: Keysym) -> Option<&Command> {
        self.bindings
            .iter()
            .find(|b| b.mods == mods && b.keysym == keysym)
            .map(|b| &b.command)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// The built-in table, with every chord on `modifier`.
pub fn default_specs(modifier: ModMask) -> Vec<BindingSpec> {
    use crate::command::Direction::*;

    let shifted = modifier | ModMask::SHIFT;
    let spec = |mods: ModMask, key: &str, command: Command| BindingSpec {
        mods,
        key: key.to_string(),
        command,
    };
    let launch = |argv: &[&str]| Command::Launch(argv.iter().map(|s| s.to_string()).collect());

    let mut specs = vec![
        spec(modifier, "h", Command::Move(Left)),
        spec(modifier, "j", Command::Move(Down)),
        spec(modifier, "k", Command::Move(Up)),
        spec(modifier, "l", Command::Move(Right)),
        spec(shifted, "h", Command::Resize(Left)),
        spec(shifted, "j", Command::Resize(Down)),
        spec(shifted, "k", Command::Resize(Up)),
        spec(shifted, "l", Command::Resize(Right)),
        spec(modifier, "r", Command::Raise),
        spec(modifier, "m", Command::ToggleMaximize),
        spec(shifted, "w", Command::Close),
        spec(modifier, "Tab", Command::FocusNext),
        spec(shifted, "Tab", Command::FocusPrev),
        spec(modifier, "p", launch(&["dmenu_run"])),
        spec(modifier, "Return", launch(&["urxvt"])),
        spec(shifted, "t", Command::Quit),
    ];
    for desktop in 0..DESKTOP_COUNT {
        let key = desktop.to_string();
        specs.push(spec(modifier, &key, Command::SwitchDesktop(desktop)));
        specs.push(spec(shifted, &key, Command::MoveToDesktop(desktop)));
    }
    specs
}
