//! [`EventSource`] that reads and translates core X11 events.

use super::wm::{Shared, X11Error};
use crate::command::{ModMask, WindowHandle};
use crate::traits::{ConfigureChanges, Event, EventSource, Property};
use log::warn;
use std::rc::Rc;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, ConfigWindow, ConfigureRequestEvent, KeyButMask};
use x11rb::protocol::Event as XEvent;

/// Blocking event source over the connection opened by
/// [`X11Wm::connect`](super::X11Wm::connect).
pub struct X11Events {
    shared: Rc<Shared>,
}

impl X11Events {
    pub(crate) fn new(shared: Rc<Shared>) -> Self {
        Self { shared }
    }

    fn translate(&self, event: XEvent) -> Option<Event> {
        match event {
            XEvent::KeyPress(e) => Some(Event::KeyPress {
                mods: modifiers(e.state),
                keysym: self.shared.keymap.keysym_for(e.detail),
                subwindow: handle(e.child),
            }),
            XEvent::ButtonPress(e) => Some(Event::ButtonPress {
                button: e.detail,
                mods: modifiers(e.state),
                root_x: i32::from(e.root_x),
                root_y: i32::from(e.root_y),
                subwindow: handle(e.child),
            }),
            XEvent::ButtonRelease(e) => Some(Event::ButtonRelease { button: e.detail }),
            XEvent::MotionNotify(e) => Some(Event::PointerMotion {
                root_x: i32::from(e.root_x),
                root_y: i32::from(e.root_y),
            }),
            XEvent::MapRequest(e) => Some(Event::WindowCreateRequest {
                window: WindowHandle(e.window),
            }),
            XEvent::DestroyNotify(e) => Some(Event::WindowDestroyed {
                window: WindowHandle(e.window),
            }),
            XEvent::ConfigureRequest(e) => Some(Event::ConfigureRequest {
                window: WindowHandle(e.window),
                changes: configure_changes(&e),
            }),
            XEvent::PropertyNotify(e) => {
                let title = e.atom == u32::from(AtomEnum::WM_NAME)
                    || e.atom == self.shared.atoms.net_wm_name;
                Some(Event::PropertyChanged {
                    window: WindowHandle(e.window),
                    property: if title {
                        Property::Title
                    } else {
                        Property::Other
                    },
                })
            }
            XEvent::Error(e) => {
                warn!("X11 error: {:?}", e);
                None
            }
            _ => None,
        }
    }
}

impl EventSource for X11Events {
    type Error = X11Error;

    fn next_event(&mut self) -> Result<Option<Event>, X11Error> {
        loop {
            let raw = self.shared.conn.wait_for_event()?;
            if let Some(event) = self.translate(raw) {
                return Ok(Some(event));
            }
        }
    }
}

fn modifiers(state: KeyButMask) -> ModMask {
    // Button bits sit above the modifier bits and are dropped here.
    ModMask::from_bits_truncate(u16::from(state)).clean()
}

fn handle(window: u32) -> Option<WindowHandle> {
    (window != x11rb::NONE).then_some(WindowHandle(window))
}

fn configure_changes(e: &ConfigureRequestEvent) -> ConfigureChanges {
    let mask = u16::from(e.value_mask);
    let has = |flag: ConfigWindow| mask & u16::from(flag) != 0;
    ConfigureChanges {
        x: has(ConfigWindow::X).then_some(i32::from(e.x)),
        y: has(ConfigWindow::Y).then_some(i32::from(e.y)),
        width: has(ConfigWindow::WIDTH).then_some(i32::from(e.width)),
        height: has(ConfigWindow::HEIGHT).then_some(i32::from(e.height)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::StackMode;

    #[test]
    fn modifier_state_drops_locks_and_buttons() {
        let state = KeyButMask::MOD1 | KeyButMask::LOCK | KeyButMask::MOD2 | KeyButMask::BUTTON1;
        assert_eq!(modifiers(state), ModMask::MOD1);
        assert_eq!(
            modifiers(KeyButMask::SHIFT | KeyButMask::MOD4),
            ModMask::SHIFT | ModMask::MOD4
        );
    }

    #[test]
    fn root_child_is_no_window() {
        assert_eq!(handle(0), None);
        assert_eq!(handle(0x1a00003), Some(WindowHandle(0x1a00003)));
    }

    #[test]
    fn configure_request_fields_follow_value_mask() {
        let e = ConfigureRequestEvent {
            response_type: x11rb::protocol::xproto::CONFIGURE_REQUEST_EVENT,
            stack_mode: StackMode::ABOVE,
            sequence: 0,
            parent: 1,
            window: 7,
            sibling: 0,
            x: 10,
            y: 20,
            width: 300,
            height: 200,
            border_width: 0,
            value_mask: ConfigWindow::X | ConfigWindow::HEIGHT,
        };
        let changes = configure_changes(&e);
        assert_eq!(changes.x, Some(10));
        assert_eq!(changes.y, None);
        assert_eq!(changes.width, None);
        assert_eq!(changes.height, Some(200));
    }
}
