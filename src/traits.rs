//! Core traits that decouple maxwm from any specific windowing system,
//! event transport or process model.
//!
//! Every concrete backend (X11, a test harness, …) implements one of these
//! traits.  The [`Manager`](crate::manager::Manager) only depends on these
//! abstractions.

use crate::bindings::Keysym;
use crate::command::{ColorHandle, Geometry, ModMask, WindowHandle};

/// Abstraction over the primitive operations of a windowing system.
///
/// Every method is a thin request; none of them block on user input.  An
/// implementation might talk to an X server, or it might be a recording
/// stub used in tests.
pub trait WindowSystem {
    /// The error type produced by this windowing system.
    type Error: std::error::Error + Send + 'static;

    /// Size of the screen in pixels, `(width, height)`.
    fn screen_size(&self) -> (i32, i32);

    fn map(&self, window: WindowHandle) -> Result<(), Self::Error>;

    fn unmap(&self, window: WindowHandle) -> Result<(), Self::Error>;

    /// Move `window` so its top-left corner lands at `(x, y)`.
    fn move_window(&self, window: WindowHandle, x: i32, y: i32) -> Result<(), Self::Error>;

    fn resize(&self, window: WindowHandle, width: i32, height: i32) -> Result<(), Self::Error>;

    fn move_resize(&self, window: WindowHandle, geometry: Geometry) -> Result<(), Self::Error>;

    /// Put `window` on top of the stacking order.
    fn raise(&self, window: WindowHandle) -> Result<(), Self::Error>;

    fn set_border_width(&self, window: WindowHandle, width: u32) -> Result<(), Self::Error>;

    fn set_border_color(&self, window: WindowHandle, color: ColorHandle) -> Result<(), Self::Error>;

    fn set_input_focus(&self, window: WindowHandle) -> Result<(), Self::Error>;

    /// Fetch the display title of `window`, or `None` when it has none.
    fn fetch_title(&self, window: WindowHandle) -> Result<Option<String>, Self::Error>;

    /// Resolve a color specification (`"rgb:1c/1c/1c"`, `"#ff0000"`, or a
    /// server color name) to a pixel value.
    fn allocate_color(&self, name: &str) -> Result<ColorHandle, Self::Error>;

    /// Deliver key presses of `keysym` with exactly `mods` held to the
    /// manager, whichever window has focus.
    fn grab_key(&self, mods: ModMask, keysym: Keysym) -> Result<(), Self::Error>;

    /// Deliver presses, releases and motion of pointer `button` with `mods`
    /// held to the manager.
    fn grab_button(&self, button: u8, mods: ModMask) -> Result<(), Self::Error>;

    /// Politely ask `window` to close.  The window may ignore the request.
    fn send_close_request(&self, window: WindowHandle) -> Result<(), Self::Error>;

    /// Current geometry of `window` as the windowing system sees it.
    fn query_geometry(&self, window: WindowHandle) -> Result<Geometry, Self::Error>;

    /// Push any buffered requests to the server.
    fn flush(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Which window property changed in a [`Event::PropertyChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    /// The window's display title.
    Title,
    /// Anything the manager does not track.
    Other,
}

/// The fields a client asked to change in a [`Event::ConfigureRequest`].
///
/// Unset fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigureChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

impl ConfigureChanges {
    /// Merge the requested fields over `current`.
    pub fn apply(&self, current: Geometry) -> Geometry {
        Geometry {
            x: self.x.unwrap_or(current.x),
            y: self.y.unwrap_or(current.y),
            width: self.width.unwrap_or(current.width).max(1),
            height: self.height.unwrap_or(current.height).max(1),
        }
    }
}

/// An event delivered by the windowing system.
///
/// Backends translate their native events into this enum and drop every
/// event kind the manager does not react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A grabbed key chord was pressed.  `subwindow` is the top-level window
    /// under the pointer, if any.
    KeyPress {
        mods: ModMask,
        keysym: Keysym,
        subwindow: Option<WindowHandle>,
    },
    /// A grabbed pointer button was pressed at root coordinates
    /// `(root_x, root_y)`.
    ButtonPress {
        button: u8,
        mods: ModMask,
        root_x: i32,
        root_y: i32,
        subwindow: Option<WindowHandle>,
    },
    ButtonRelease { button: u8 },
    /// The pointer moved while a grabbed button was held.
    PointerMotion { root_x: i32, root_y: i32 },
    /// A top-level window asked to be shown.
    WindowCreateRequest { window: WindowHandle },
    /// A window no longer exists.
    WindowDestroyed { window: WindowHandle },
    /// A window asked to be moved or resized.
    ConfigureRequest {
        window: WindowHandle,
        changes: ConfigureChanges,
    },
    PropertyChanged {
        window: WindowHandle,
        property: Property,
    },
}

//  Event Source

/// A blocking source of [`Event`]s.
///
/// # Contract
///
/// * [`next_event`](EventSource::next_event) **blocks** until an event is
///   available.  It is the only suspension point of the manager.
/// * `Ok(None)` means the source is exhausted and the loop should end.
/// * An `Err` is unrecoverable (e.g. the connection to the server broke).
pub trait EventSource {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    fn next_event(&mut self) -> Result<Option<Event>, Self::Error>;
}

//  Launcher

/// Starts helper programs (application launcher, terminal, bar script).
///
/// Launched programs are detached: the manager never waits for them, and
/// their exit status is collected off the event loop.
pub trait Launcher {
    /// The error type produced by this launcher.
    type Error: std::error::Error + Send + 'static;

    /// Launch `argv[0]` with the remaining elements as arguments.
    fn spawn(&self, argv: &[String]) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, RecordingWs, ScriptedSource};

    #[test]
    fn recording_ws_tracks_geometry() {
        let ws = RecordingWs::new();
        let w = WindowHandle(7);
        ws.move_resize(w, Geometry::new(1, 2, 3, 4)).unwrap();
        ws.move_window(w, 10, 20).unwrap();
        assert_eq!(ws.query_geometry(w).unwrap(), Geometry::new(10, 20, 3, 4));
        assert_eq!(ws.calls.borrow().len(), 2);
    }

    #[test]
    fn recording_ws_logs_focus_calls() {
        let ws = RecordingWs::new();
        ws.set_input_focus(WindowHandle(1)).unwrap();
        assert_eq!(ws.calls.borrow()[0], Call::Focus(WindowHandle(1)));
    }

    #[test]
    fn scripted_source_drains_then_ends() {
        let mut src = ScriptedSource::new(vec![
            Event::WindowCreateRequest {
                window: WindowHandle(1),
            },
            Event::ButtonRelease { button: 1 },
        ]);
        assert!(matches!(
            src.next_event().unwrap(),
            Some(Event::WindowCreateRequest { .. })
        ));
        assert_eq!(
            src.next_event().unwrap(),
            Some(Event::ButtonRelease { button: 1 })
        );
        assert_eq!(src.next_event().unwrap(), None);
    }

    #[test]
    fn configure_changes_merge_over_current() {
        let current = Geometry::new(10, 10, 200, 100);
        let changes = ConfigureChanges {
            width: Some(640),
            y: Some(40),
            ..Default::default()
        };
        assert_eq!(changes.apply(current), Geometry::new(10, 40, 640, 100));
        assert_eq!(ConfigureChanges::default().apply(current), current);
    }

    #[test]
    fn configure_changes_never_produce_empty_windows() {
        let changes = ConfigureChanges {
            width: Some(0),
            height: Some(-5),
            ..Default::default()
        };
        let g = changes.apply(Geometry::new(0, 0, 10, 10));
        assert_eq!((g.width, g.height), (1, 1));
    }
}
