//! Test doubles for the backend traits.

use crate::bindings::Keysym;
use crate::command::{ColorHandle, Geometry, ModMask, WindowHandle};
use crate::traits::{Event, EventSource, Launcher, WindowSystem};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

/// Color name that [`RecordingWs::allocate_color`] refuses.
pub const BAD_COLOR: &str = "no-such-color";

/// One request recorded by [`RecordingWs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Map(WindowHandle),
    Unmap(WindowHandle),
    Move(WindowHandle, i32, i32),
    Resize(WindowHandle, i32, i32),
    MoveResize(WindowHandle, Geometry),
    Raise(WindowHandle),
    BorderWidth(WindowHandle, u32),
    BorderColor(WindowHandle, ColorHandle),
    Focus(WindowHandle),
    Close(WindowHandle),
    GrabKey(ModMask, Keysym),
    GrabButton(u8, ModMask),
}

#[derive(Debug, thiserror::Error)]
#[error("mock error: {0}")]
pub struct MockError(pub String);

/// A record-keeping window system with a 1920×1080 screen.
///
/// Windows it has never seen report a `100×100+0+0` geometry.
#[derive(Debug)]
pub struct RecordingWs {
    pub calls: RefCell<Vec<Call>>,
    pub geometries: RefCell<HashMap<WindowHandle, Geometry>>,
    pub titles: RefCell<HashMap<WindowHandle, String>>,
    pub mapped: RefCell<HashSet<WindowHandle>>,
    pub screen: (i32, i32),
}

impl RecordingWs {
    pub fn new() -> Self {
        Self {
            calls: RefCell::default(),
            geometries: RefCell::default(),
            titles: RefCell::default(),
            mapped: RefCell::default(),
            screen: (1920, 1080),
        }
    }

    pub fn set_geometry(&self, window: WindowHandle, geometry: Geometry) {
        self.geometries.borrow_mut().insert(window, geometry);
    }

    pub fn set_title(&self, window: WindowHandle, title: &str) {
        self.titles.borrow_mut().insert(window, title.to_string());
    }

    pub fn is_mapped(&self, window: WindowHandle) -> bool {
        self.mapped.borrow().contains(&window)
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Recorded calls matching `pred`.
    pub fn calls_where(&self, pred: impl Fn(&Call) -> bool) -> Vec<Call> {
        self.calls.borrow().iter().filter(|c| pred(c)).cloned().collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn geometry_of(&self, window: WindowHandle) -> Geometry {
        self.geometries
            .borrow()
            .get(&window)
            .copied()
            .unwrap_or(Geometry::new(0, 0, 100, 100))
    }
}

impl WindowSystem for RecordingWs {
    type Error = MockError;

    fn screen_size(&self) -> (i32, i32) {
        self.screen
    }

    fn map(&self, window: WindowHandle) -> Result<(), MockError> {
        self.mapped.borrow_mut().insert(window);
        self.record(Call::Map(window));
        Ok(())
    }

    fn unmap(&self, window: WindowHandle) -> Result<(), MockError> {
        self.mapped.borrow_mut().remove(&window);
        self.record(Call::Unmap(window));
        Ok(())
    }

    fn move_window(&self, window: WindowHandle, x: i32, y: i32) -> Result<(), MockError> {
        let g = self.geometry_of(window);
        self.set_geometry(window, Geometry { x, y, ..g });
        self.record(Call::Move(window, x, y));
        Ok(())
    }

    fn resize(&self, window: WindowHandle, width: i32, height: i32) -> Result<(), MockError> {
        let g = self.geometry_of(window);
        self.set_geometry(
            window,
            Geometry {
                width,
                height,
                ..g
            },
        );
        self.record(Call::Resize(window, width, height));
        Ok(())
    }

    fn move_resize(&self, window: WindowHandle, geometry: Geometry) -> Result<(), MockError> {
        self.set_geometry(window, geometry);
        self.record(Call::MoveResize(window, geometry));
        Ok(())
    }

    fn raise(&self, window: WindowHandle) -> Result<(), MockError> {
        self.record(Call::Raise(window));
        Ok(())
    }

    fn set_border_width(&self, window: WindowHandle, width: u32) -> Result<(), MockError> {
        self.record(Call::BorderWidth(window, width));
        Ok(())
    }

    fn set_border_color(&self, window: WindowHandle, color: ColorHandle) -> Result<(), MockError> {
        self.record(Call::BorderColor(window, color));
        Ok(())
    }

    fn set_input_focus(&self, window: WindowHandle) -> Result<(), MockError> {
        self.record(Call::Focus(window));
        Ok(())
    }

    fn fetch_title(&self, window: WindowHandle) -> Result<Option<String>, MockError> {
        Ok(self.titles.borrow().get(&window).cloned())
    }

    fn allocate_color(&self, name: &str) -> Result<ColorHandle, MockError> {
        if name == BAD_COLOR {
            return Err(MockError(format!("cannot allocate {}", name)));
        }
        // Any stable name-dependent value will do.
        let pixel = name
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        Ok(ColorHandle(pixel))
    }

    fn grab_key(&self, mods: ModMask, keysym: Keysym) -> Result<(), MockError> {
        self.record(Call::GrabKey(mods, keysym));
        Ok(())
    }

    fn grab_button(&self, button: u8, mods: ModMask) -> Result<(), MockError> {
        self.record(Call::GrabButton(button, mods));
        Ok(())
    }

    fn send_close_request(&self, window: WindowHandle) -> Result<(), MockError> {
        self.record(Call::Close(window));
        Ok(())
    }

    fn query_geometry(&self, window: WindowHandle) -> Result<Geometry, MockError> {
        Ok(self.geometry_of(window))
    }
}

/// A launcher that only remembers what it was asked to start.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    pub launched: RefCell<Vec<Vec<String>>>,
}

impl Launcher for RecordingLauncher {
    type Error = MockError;

    fn spawn(&self, argv: &[String]) -> Result<(), MockError> {
        if argv.is_empty() {
            return Err(MockError("empty command".into()));
        }
        self.launched.borrow_mut().push(argv.to_vec());
        Ok(())
    }
}

/// An event source that replays a fixed sequence, then ends.
pub struct ScriptedSource {
    events: VecDeque<Event>,
}

impl ScriptedSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventSource for ScriptedSource {
    type Error = MockError;

    fn next_event(&mut self) -> Result<Option<Event>, MockError> {
        Ok(self.events.pop_front())
    }
}
