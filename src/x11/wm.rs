//! [`WindowSystem`] implementation backed by a core X11 connection.
//!
//! The connection is shared with the [`X11Events`] source returned by
//! [`X11Wm::connect`]; both live on the manager's thread.

use super::events::X11Events;
use crate::bindings::Keysym;
use crate::command::{ColorHandle, Geometry, ModMask, WindowHandle};
use crate::traits::WindowSystem;
use log::{debug, info, warn};
use std::rc::Rc;
use x11rb::connection::Connection;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::xproto::{
    self, AtomEnum, ButtonIndex, ChangeWindowAttributesAux, ClientMessageData, ClientMessageEvent,
    ConfigureWindowAux, ConnectionExt as _, EventMask, GrabMode, InputFocus, Keycode, StackMode,
    Window, CLIENT_MESSAGE_EVENT,
};
use x11rb::rust_connection::RustConnection;

/// Errors that can occur when talking to the X server.
#[derive(Debug, thiserror::Error)]
pub enum X11Error {
    #[error("cannot connect to the X server: {0}")]
    Connect(#[from] ConnectError),

    #[error("X connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X request failed: {0}")]
    Reply(#[from] ReplyError),

    #[error("X request failed: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),

    /// Substructure redirect on the root window was refused.
    #[error("another window manager is already running")]
    AnotherWm,
}

//  Shared connection state

/// Interned atoms the backend needs.
pub(crate) struct Atoms {
    pub wm_protocols: u32,
    pub wm_delete_window: u32,
    pub net_wm_name: u32,
    pub utf8_string: u32,
}

impl Atoms {
    fn intern(conn: &RustConnection) -> Result<Self, X11Error> {
        let wm_protocols = conn.intern_atom(false, b"WM_PROTOCOLS")?;
        let wm_delete_window = conn.intern_atom(false, b"WM_DELETE_WINDOW")?;
        let net_wm_name = conn.intern_atom(false, b"_NET_WM_NAME")?;
        let utf8_string = conn.intern_atom(false, b"UTF8_STRING")?;
        Ok(Self {
            wm_protocols: wm_protocols.reply()?.atom,
            wm_delete_window: wm_delete_window.reply()?.atom,
            net_wm_name: net_wm_name.reply()?.atom,
            utf8_string: utf8_string.reply()?.atom,
        })
    }
}

/// Snapshot of the server's keycode → keysym table.
pub(crate) struct Keymap {
    min_keycode: Keycode,
    per_keycode: usize,
    keysyms: Vec<u32>,
}

impl Keymap {
    fn load(conn: &RustConnection) -> Result<Self, X11Error> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;
        let mapping = conn.get_keyboard_mapping(min_keycode, count)?.reply()?;
        Ok(Self {
            min_keycode,
            per_keycode: usize::from(mapping.keysyms_per_keycode).max(1),
            keysyms: mapping.keysyms,
        })
    }

    /// Every keycode that produces `keysym` in any column.
    pub fn keycodes_for(&self, keysym: Keysym) -> Vec<Keycode> {
        self.keysyms
            .chunks(self.per_keycode)
            .enumerate()
            .filter(|(_, syms)| syms.contains(&keysym.0))
            .filter_map(|(i, _)| u8::try_from(i).ok())
            .map(|i| self.min_keycode.saturating_add(i))
            .collect()
    }

    /// The unshifted keysym of `keycode`.
    pub fn keysym_for(&self, keycode: Keycode) -> Keysym {
        let index = usize::from(keycode.saturating_sub(self.min_keycode)) * self.per_keycode;
        Keysym(self.keysyms.get(index).copied().unwrap_or(0))
    }
}

pub(crate) struct Shared {
    pub conn: RustConnection,
    pub root: Window,
    pub width: u16,
    pub height: u16,
    pub colormap: xproto::Colormap,
    pub atoms: Atoms,
    pub keymap: Keymap,
}

//  Window system

/// X11-backed window system.
pub struct X11Wm {
    shared: Rc<Shared>,
}

impl X11Wm {
    /// Connect to `$DISPLAY`, take over the root window and load the
    /// keyboard map.
    ///
    /// Fails with [`X11Error::AnotherWm`] when another window manager holds
    /// substructure redirect on the root.
    pub fn connect() -> Result<(Self, X11Events), X11Error> {
        let (conn, screen_num) = RustConnection::connect(None)?;
        let screen = &conn.setup().roots[screen_num];
        let (root, width, height, colormap) = (
            screen.root,
            screen.width_in_pixels,
            screen.height_in_pixels,
            screen.default_colormap,
        );
        info!(
            "connected to X11 screen {}, root 0x{:x}, {}x{}",
            screen_num, root, width, height
        );

        let mask = EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY;
        let cookie =
            conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(mask))?;
        match cookie.check() {
            Ok(()) => {}
            Err(ReplyError::X11Error(e)) => {
                debug!("substructure redirect refused: {:?}", e);
                return Err(X11Error::AnotherWm);
            }
            Err(e) => return Err(e.into()),
        }

        let atoms = Atoms::intern(&conn)?;
        let keymap = Keymap::load(&conn)?;
        let shared = Rc::new(Shared {
            conn,
            root,
            width,
            height,
            colormap,
            atoms,
            keymap,
        });
        Ok((
            Self {
                shared: Rc::clone(&shared),
            },
            X11Events::new(shared),
        ))
    }

    fn conn(&self) -> &RustConnection {
        &self.shared.conn
    }

    fn configure(&self, window: WindowHandle, aux: &ConfigureWindowAux) -> Result<(), X11Error> {
        self.conn().configure_window(window.0, aux)?;
        Ok(())
    }

    fn supports_delete(&self, window: WindowHandle) -> Result<bool, X11Error> {
        let atoms = &self.shared.atoms;
        let reply = self
            .conn()
            .get_property(false, window.0, atoms.wm_protocols, AtomEnum::ATOM, 0, 32)?
            .reply()?;
        Ok(reply
            .value32()
            .is_some_and(|mut protocols| protocols.any(|a| a == atoms.wm_delete_window)))
    }

    fn text_property(
        &self,
        window: WindowHandle,
        property: u32,
        kind: u32,
    ) -> Result<Option<String>, X11Error> {
        let reply = self
            .conn()
            .get_property(false, window.0, property, kind, 0, 1024)?
            .reply()?;
        if reply.value.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
    }
}

/// Lock modifiers a grab must also cover so it fires with Caps or Num Lock
/// on.
fn lock_variants(mods: ModMask) -> [u16; 4] {
    let base = mods.clean();
    [
        base,
        base | ModMask::LOCK,
        base | ModMask::MOD2,
        base | ModMask::LOCK | ModMask::MOD2,
    ]
    .map(|m| m.bits())
}

/// `(property, type)` pairs consulted for a window title, in order.
///
/// `WM_NAME` is requested with any type since clients set it as `STRING` or
/// `COMPOUND_TEXT`.
fn title_sources(atoms: &Atoms) -> [(u32, u32); 2] {
    [
        (atoms.net_wm_name, atoms.utf8_string),
        (AtomEnum::WM_NAME.into(), AtomEnum::ANY.into()),
    ]
}

fn dimension(value: i32) -> u32 {
    value.max(1).unsigned_abs()
}

impl WindowSystem for X11Wm {
    type Error = X11Error;

    fn screen_size(&self) -> (i32, i32) {
        (i32::from(self.shared.width), i32::from(self.shared.height))
    }

    fn map(&self, window: WindowHandle) -> Result<(), X11Error> {
        // Title updates arrive as PropertyNotify on the window itself.
        self.conn().change_window_attributes(
            window.0,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )?;
        self.conn().map_window(window.0)?;
        Ok(())
    }

    fn unmap(&self, window: WindowHandle) -> Result<(), X11Error> {
        self.conn().unmap_window(window.0)?;
        Ok(())
    }

    fn move_window(&self, window: WindowHandle, x: i32, y: i32) -> Result<(), X11Error> {
        self.configure(window, &ConfigureWindowAux::new().x(x).y(y))
    }

    fn resize(&self, window: WindowHandle, width: i32, height: i32) -> Result<(), X11Error> {
        self.configure(
            window,
            &ConfigureWindowAux::new()
                .width(dimension(width))
                .height(dimension(height)),
        )
    }

    fn move_resize(&self, window: WindowHandle, g: Geometry) -> Result<(), X11Error> {
        self.configure(
            window,
            &ConfigureWindowAux::new()
                .x(g.x)
                .y(g.y)
                .width(dimension(g.width))
                .height(dimension(g.height)),
        )
    }

    fn raise(&self, window: WindowHandle) -> Result<(), X11Error> {
        self.configure(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
    }

    fn set_border_width(&self, window: WindowHandle, width: u32) -> Result<(), X11Error> {
        self.configure(window, &ConfigureWindowAux::new().border_width(width))
    }

    fn set_border_color(&self, window: WindowHandle, color: ColorHandle) -> Result<(), X11Error> {
        self.conn().change_window_attributes(
            window.0,
            &ChangeWindowAttributesAux::new().border_pixel(color.0),
        )?;
        Ok(())
    }

    fn set_input_focus(&self, window: WindowHandle) -> Result<(), X11Error> {
        self.conn()
            .set_input_focus(InputFocus::POINTER_ROOT, window.0, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn fetch_title(&self, window: WindowHandle) -> Result<Option<String>, X11Error> {
        for (property, kind) in title_sources(&self.shared.atoms) {
            if let Some(title) = self.text_property(window, property, kind)? {
                return Ok(Some(title));
            }
        }
        Ok(None)
    }

    fn allocate_color(&self, name: &str) -> Result<ColorHandle, X11Error> {
        let colormap = self.shared.colormap;
        let pixel = match parse_color(name) {
            Some((r, g, b)) => self.conn().alloc_color(colormap, r, g, b)?.reply()?.pixel,
            None => {
                self.conn()
                    .alloc_named_color(colormap, name.as_bytes())?
                    .reply()?
                    .pixel
            }
        };
        debug!("color {:?} -> pixel 0x{:06x}", name, pixel);
        Ok(ColorHandle(pixel))
    }

    fn grab_key(&self, mods: ModMask, keysym: Keysym) -> Result<(), X11Error> {
        let keycodes = self.shared.keymap.keycodes_for(keysym);
        if keycodes.is_empty() {
            warn!("no keycode produces keysym {}, binding is inert", keysym);
        }
        for keycode in keycodes {
            for variant in lock_variants(mods) {
                self.conn().grab_key(
                    false,
                    self.shared.root,
                    xproto::ModMask::from(variant),
                    keycode,
                    GrabMode::ASYNC,
                    GrabMode::ASYNC,
                )?;
            }
        }
        Ok(())
    }

    fn grab_button(&self, button: u8, mods: ModMask) -> Result<(), X11Error> {
        let events =
            EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION;
        for variant in lock_variants(mods) {
            self.conn().grab_button(
                false,
                self.shared.root,
                events,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                ButtonIndex::from(button),
                xproto::ModMask::from(variant),
            )?;
        }
        Ok(())
    }

    fn send_close_request(&self, window: WindowHandle) -> Result<(), X11Error> {
        if !self.supports_delete(window)? {
            debug!("{} ignores WM_DELETE_WINDOW, killing its client", window);
            self.conn().kill_client(window.0)?;
            return Ok(());
        }
        let atoms = &self.shared.atoms;
        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window: window.0,
            type_: atoms.wm_protocols,
            data: ClientMessageData::from([atoms.wm_delete_window, 0, 0, 0, 0]),
        };
        self.conn()
            .send_event(false, window.0, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn query_geometry(&self, window: WindowHandle) -> Result<Geometry, X11Error> {
        let reply = self.conn().get_geometry(window.0)?.reply()?;
        Ok(Geometry {
            x: i32::from(reply.x),
            y: i32::from(reply.y),
            width: i32::from(reply.width),
            height: i32::from(reply.height),
        })
    }

    fn flush(&self) -> Result<(), X11Error> {
        self.conn().flush()?;
        Ok(())
    }
}

//  Color parsing

/// Parse `rgb:r/g/b` (1 to 4 hex digits per channel) or `#rrggbb` into
/// 16-bit channels.  Anything else is left to the server's color database.
pub fn parse_color(spec: &str) -> Option<(u16, u16, u16)> {
    if let Some(hex) = spec.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u16::from_str_radix(&hex[i..i + 2], 16).ok().map(|c| c * 0x101);
        return Some((channel(0)?, channel(2)?, channel(4)?));
    }

    let body = spec.strip_prefix("rgb:")?;
    let mut parts = body.split('/').map(scale_channel);
    let rgb = (parts.next()??, parts.next()??, parts.next()??);
    match parts.next() {
        None => Some(rgb),
        Some(_) => None,
    }
}

/// Scale an `rgb:` channel of 1 to 4 hex digits to the full 16-bit range.
fn scale_channel(digits: &str) -> Option<u16> {
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    let max = (1u32 << (4 * digits.len())) - 1;
    u16::try_from(value * 0xffff / max).ok()
}
