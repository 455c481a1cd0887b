//! Status text for an external bar.
//!
//! [`StatusLine`] is an immutable snapshot of what a bar wants to show:
//! which desktops are in use, which one is displayed, the titles on it and
//! how many windows are managed.  It does not draw anything; its
//! [`Display`](fmt::Display) form is a single line meant to be piped into a
//! bar program.
//!
//! ```text
//! 0 [2] 5 | urxvt -> *firefox* -> mpv | 3/6
//! ```

use crate::command::ColorHandle;
use crate::desktop::Desktops;
use std::fmt;

/// Snapshot of the workspace state for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Index of the displayed desktop.
    pub active: usize,
    /// `(index, window count)` of every desktop that has windows, plus the
    /// active one.
    pub desktops: Vec<(usize, usize)>,
    /// Titles on the active desktop in registry order.
    pub titles: Vec<String>,
    /// Position of the focused title in `titles`.
    pub focused: Option<usize>,
    /// Windows managed across all desktops.
    pub total: usize,
    /// Pixel value for drawing the text, when known.
    pub color: Option<ColorHandle>,
}

impl StatusLine {
    pub fn capture(desktops: &Desktops) -> Self {
        let active = desktops.active_index();
        let registry = desktops.active();
        let focused_id = registry.focused();

        let mut titles = Vec::with_capacity(registry.len());
        let mut focused = None;
        for (pos, (id, client)) in registry.iter().enumerate() {
            if Some(id) == focused_id {
                focused = Some(pos);
            }
            titles.push(client.title.clone());
        }

        Self {
            active,
            desktops: desktops
                .iter()
                .filter(|(i, r)| *i == active || !r.is_empty())
                .map(|(i, r)| (i, r.len()))
                .collect(),
            titles,
            focused,
            total: desktops.client_count(),
            color: None,
        }
    }

    /// Attach the pixel value the text should be drawn in.
    pub fn with_color(self, color: ColorHandle) -> Self {
        Self {
            color: Some(color),
            ..self
        }
    }

    /// Title of the focused window.
    pub fn focused_title(&self) -> Option<&str> {
        self.focused
            .and_then(|i| self.titles.get(i))
            .map(String::as_str)
    }

    /// Number of windows on the displayed desktop.
    pub fn active_count(&self) -> usize {
        self.titles.len()
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desks: Vec<String> = self
            .desktops
            .iter()
            .map(|(i, _)| {
                if *i == self.active {
                    format!("[{}]", i)
                } else {
                    i.to_string()
                }
            })
            .collect();

        let titles: Vec<String> = self
            .titles
            .iter()
            .enumerate()
            .map(|(i, t)| {
                if Some(i) == self.focused {
                    format!("*{}*", t)
                } else {
                    t.clone()
                }
            })
            .collect();
        let titles = if titles.is_empty() {
            "-".to_string()
        } else {
            titles.join(" -> ")
        };

        write!(
            f,
            "{} | {} | {}/{}",
            desks.join(" "),
            titles,
            self.active_count(),
            self.total
        )
    }
}
