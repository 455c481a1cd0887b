//! The event dispatcher that ties desktops, bindings and geometry to the
//! windowing system.
//!
//! [`Manager`] owns the whole workspace state and reacts to [`Event`]s by
//! updating it and issuing calls to the [`WindowSystem`] trait.  Every
//! handler runs to completion before the next event is pulled, so a
//! multi-step operation such as moving a client between desktops is never
//! observed half done.

use crate::bindings::BindingTable;
use crate::command::{ColorHandle, Command, Direction, Geometry, ModMask, WindowHandle};
use crate::config::{Config, ConfigError};
use crate::desktop::{Desktops, DESKTOP_COUNT};
use crate::geometry::{self, Bounds, DragKind};
use crate::registry::{Client, WindowState};
use crate::status::StatusLine;
use crate::traits::{ConfigureChanges, Event, EventSource, Launcher, Property, WindowSystem};
use log::{debug, error, info, warn};
use std::sync::mpsc;

/// Possible errors from the manager.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The windowing system returned an error.
    #[error("window system error: {0}")]
    WindowSystem(String),

    /// A helper program could not be started.
    #[error("launch error: {0}")]
    Launch(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Pixel values for the configured colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub focus: ColorHandle,
    pub unfocus: ColorHandle,
    pub status: ColorHandle,
}

/// An in-progress pointer drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    pub window: WindowHandle,
    pub kind: DragKind,
    /// Pointer position when the button went down.
    pub pointer: (i32, i32),
    /// Window geometry when the button went down.
    pub start: Geometry,
}

/// Owns the workspace state and dispatches events against it.
///
/// The manager is generic over the [`WindowSystem`] and [`Launcher`] it
/// drives, so tests run it against recording doubles.
///
/// # Typical usage
///
/// ```ignore
/// let (wm, mut events) = X11Wm::connect()?;
/// let mut manager = Manager::new(wm, ProcessLauncher::new(), &config)?;
/// manager.run(&mut events)?;
/// ```
pub struct Manager<W: WindowSystem, L: Launcher> {
    ws: W,
    launcher: L,
    bindings: BindingTable,
    modifier: ModMask,
    bounds: Bounds,
    border_width: u32,
    palette: Palette,
    desktops: Desktops,
    drag: Option<DragSession>,
    running: bool,
    status_tx: Option<mpsc::Sender<StatusLine>>,
    /// Last line sent on `status_tx`.
    last_status: Option<StatusLine>,
}

impl<W: WindowSystem, L: Launcher> Manager<W, L> {
    /// Set up a manager: allocate colors, build the binding table and grab
    /// every bound key plus the two drag buttons.
    ///
    /// Fails when a color cannot be allocated, the configuration is invalid,
    /// or the grabs are refused.  All desktops start empty with desktop `0`
    /// displayed.
    pub fn new(ws: W, launcher: L, config: &Config) -> Result<Self, ManagerError> {
        let bindings = config.binding_table()?;
        let palette = Palette {
            focus: ws.allocate_color(&config.colors.focus).map_err(ws_err)?,
            unfocus: ws.allocate_color(&config.colors.unfocus).map_err(ws_err)?,
            status: ws.allocate_color(&config.colors.status).map_err(ws_err)?,
        };
        let (width, height) = ws.screen_size();

        let manager = Self {
            bounds: config.bounds(width, height),
            border_width: config.border_width,
            modifier: config.modifier,
            ws,
            launcher,
            bindings,
            palette,
            desktops: Desktops::new(),
            drag: None,
            running: true,
            status_tx: None,
            last_status: None,
        };
        manager.grab_input()?;
        info!(
            "screen {}x{}, {} binding(s), {} desktops",
            width,
            height,
            manager.bindings.len(),
            DESKTOP_COUNT
        );
        Ok(manager)
    }

    /// Attach a status channel.
    ///
    /// The current [`StatusLine`] is sent right away, then again after every
    /// event that changes it.  A closed receiver is ignored.
    pub fn set_status_sink(&mut self, tx: mpsc::Sender<StatusLine>) {
        self.status_tx = Some(tx);
        self.last_status = None;
        self.publish_status();
    }

    pub fn desktops(&self) -> &Desktops {
        &self.desktops
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Whether the event loop should keep going.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Snapshot of the current status.
    pub fn status_line(&self) -> StatusLine {
        StatusLine::capture(&self.desktops).with_color(self.palette.status)
    }

    /// Launch every autostart command, logging failures.
    pub fn autostart(&self, commands: &[Vec<String>]) {
        for argv in commands {
            if let Err(e) = self.launch(argv) {
                error!("autostart: {}", e);
            }
        }
    }

    /// Pull events from `source` and handle them until a
    /// [`Quit`](Command::Quit) command or until the source ends.
    ///
    /// Handler errors are logged and the loop continues; only an error from
    /// the source itself ends the loop early.
    pub fn run<S: EventSource>(&mut self, source: &mut S) -> Result<(), S::Error> {
        info!("maxwm running");
        while self.running {
            let Some(event) = source.next_event()? else {
                info!("event source closed");
                break;
            };
            if let Err(e) = self.handle(event) {
                error!("event error: {}", e);
            }
        }
        Ok(())
    }

    /// Process a single event.
    pub fn handle(&mut self, event: Event) -> Result<(), ManagerError> {
        debug!("event: {:?}", event);
        let publish = !matches!(event, Event::PointerMotion { .. });

        let result = match event {
            Event::KeyPress {
                mods,
                keysym,
                subwindow,
            } => match self.bindings.resolve_key(mods, keysym).cloned() {
                Some(cmd) => self.execute(cmd, subwindow),
                None => {
                    debug!("unbound chord {} + {}", mods, keysym);
                    Ok(())
                }
            },
            Event::ButtonPress {
                button,
                mods,
                root_x,
                root_y,
                subwindow,
            } => self.begin_drag(button, mods, (root_x, root_y), subwindow),
            Event::PointerMotion { root_x, root_y } => self.continue_drag(root_x, root_y),
            Event::ButtonRelease { .. } => {
                self.drag = None;
                Ok(())
            }
            Event::WindowCreateRequest { window } => self.manage(window),
            Event::WindowDestroyed { window } => self.unmanage(window),
            Event::ConfigureRequest { window, changes } => self.configure(window, changes),
            Event::PropertyChanged { window, property } => self.property_changed(window, property),
        };

        let flushed = self.ws.flush().map_err(ws_err);
        if publish {
            self.publish_status();
        }
        result.and(flushed)
    }

    /// Execute a command.
    ///
    /// `pointer_window` is the top-level window under the pointer when the
    /// command was triggered; only [`Command::Raise`] looks at it.
    pub fn execute(
        &mut self,
        cmd: Command,
        pointer_window: Option<WindowHandle>,
    ) -> Result<(), ManagerError> {
        debug!("command: {:?}", cmd);
        match cmd {
            Command::Move(dir) => self.move_focused(dir),
            Command::Resize(dir) => self.resize_focused(dir),
            Command::Raise => self.raise(pointer_window),
            Command::ToggleMaximize => self.toggle_maximize(),
            Command::Close => self.close_focused(),
            Command::FocusNext => {
                self.desktops.active_mut().focus_next();
                self.refresh_focus()
            }
            Command::FocusPrev => {
                self.desktops.active_mut().focus_prev();
                self.refresh_focus()
            }
            Command::SwitchDesktop(d) => self.switch_desktop(d),
            Command::MoveToDesktop(d) => self.move_to_desktop(d),
            Command::Launch(argv) => self.launch(&argv),
            Command::Quit => {
                info!("quit requested");
                self.running = false;
                Ok(())
            }
        }
    }

    //  Input grabs

    fn grab_input(&self) -> Result<(), ManagerError> {
        for binding in self.bindings.iter() {
            self.ws
                .grab_key(binding.mods, binding.keysym)
                .map_err(ws_err)?;
        }
        for button in [1, 3] {
            self.ws.grab_button(button, self.modifier).map_err(ws_err)?;
        }
        self.ws.flush().map_err(ws_err)
    }

    //  Focus visuals

    /// Paint borders for the active desktop and give input focus to its
    /// focused client, which is also raised.
    fn refresh_focus(&self) -> Result<(), ManagerError> {
        let registry = self.desktops.active();
        let focused = registry.focused();
        for (id, client) in registry.iter() {
            let handle = client.handle;
            if Some(id) == focused {
                self.ws
                    .set_border_width(handle, self.border_width)
                    .map_err(ws_err)?;
                self.ws
                    .set_border_color(handle, self.palette.focus)
                    .map_err(ws_err)?;
                self.ws.set_input_focus(handle).map_err(ws_err)?;
                self.ws.raise(handle).map_err(ws_err)?;
            } else {
                self.ws
                    .set_border_color(handle, self.palette.unfocus)
                    .map_err(ws_err)?;
            }
        }
        Ok(())
    }

    //  Geometry commands

    fn focused_handle(&self) -> Option<WindowHandle> {
        self.desktops.active().focused_client().map(|c| c.handle)
    }

    /// Ask the windowing system where `handle` is and remember the answer.
    fn sync_geometry(&mut self, handle: WindowHandle) -> Result<Geometry, ManagerError> {
        let geometry = self.ws.query_geometry(handle).map_err(ws_err)?;
        if let Some(client) = self.desktops.client_mut(handle) {
            client.geometry = geometry;
        }
        Ok(geometry)
    }

    /// Record a geometry the manager applied to `handle`.  Any such change
    /// ends the maximized state.
    fn record_geometry(&mut self, handle: WindowHandle, geometry: Geometry) {
        if let Some(client) = self.desktops.client_mut(handle) {
            client.geometry = geometry;
            client.state = WindowState::Normal;
        }
    }

    fn move_focused(&mut self, dir: Direction) -> Result<(), ManagerError> {
        let Some(handle) = self.focused_handle() else {
            return Ok(());
        };
        let current = self.sync_geometry(handle)?;
        let next = geometry::move_by(current, dir, &self.bounds);
        self.ws.move_window(handle, next.x, next.y).map_err(ws_err)?;
        self.record_geometry(handle, next);
        Ok(())
    }

    fn resize_focused(&mut self, dir: Direction) -> Result<(), ManagerError> {
        let Some(handle) = self.focused_handle() else {
            return Ok(());
        };
        let current = self.sync_geometry(handle)?;
        let next = geometry::resize_by(current, dir, &self.bounds);
        self.ws
            .resize(handle, next.width, next.height)
            .map_err(ws_err)?;
        self.record_geometry(handle, next);
        Ok(())
    }

    fn toggle_maximize(&mut self) -> Result<(), ManagerError> {
        let Some(handle) = self.focused_handle() else {
            return Ok(());
        };
        let maximized = self
            .desktops
            .active()
            .focused_client()
            .is_some_and(|c| c.state == WindowState::Maximized);
        if !maximized {
            self.sync_geometry(handle)?;
        }

        let bounds = self.bounds;
        let Some(client) = self.desktops.active_mut().focused_client_mut() else {
            return Ok(());
        };
        let target = geometry::toggle_maximize(client, &bounds);
        let state = client.state;
        self.ws.move_resize(handle, target).map_err(ws_err)?;
        debug!("{} is now {:?} at {}", handle, state, target);
        Ok(())
    }

    fn raise(&self, pointer_window: Option<WindowHandle>) -> Result<(), ManagerError> {
        match pointer_window.or_else(|| self.focused_handle()) {
            Some(handle) => self.ws.raise(handle).map_err(ws_err),
            None => Ok(()),
        }
    }

    fn close_focused(&self) -> Result<(), ManagerError> {
        let Some(handle) = self.focused_handle() else {
            return Ok(());
        };
        info!("asking {} to close", handle);
        self.ws.send_close_request(handle).map_err(ws_err)
    }

    //  Desktops

    fn switch_desktop(&mut self, desktop: usize) -> Result<(), ManagerError> {
        if desktop >= DESKTOP_COUNT {
            warn!("ignoring switch to desktop {}", desktop);
            return Ok(());
        }
        // A drag cannot outlive the windows it was started on.
        self.drag = None;
        if self
            .desktops
            .change_desktop(desktop, &self.ws)
            .map_err(ws_err)?
        {
            self.refresh_focus()?;
        }
        Ok(())
    }

    fn move_to_desktop(&mut self, desktop: usize) -> Result<(), ManagerError> {
        if desktop >= DESKTOP_COUNT {
            warn!("ignoring move to desktop {}", desktop);
            return Ok(());
        }
        if let Some(handle) = self
            .desktops
            .move_client_to(desktop, &self.ws)
            .map_err(ws_err)?
        {
            info!("sent {} to desktop {}", handle, desktop);
            if self.drag.is_some_and(|d| d.window == handle) {
                self.drag = None;
            }
            self.refresh_focus()?;
        }
        Ok(())
    }

    fn launch(&self, argv: &[String]) -> Result<(), ManagerError> {
        self.launcher
            .spawn(argv)
            .map_err(|e| ManagerError::Launch(e.to_string()))
    }

    //  Pointer drags

    fn begin_drag(
        &mut self,
        button: u8,
        mods: ModMask,
        pointer: (i32, i32),
        subwindow: Option<WindowHandle>,
    ) -> Result<(), ManagerError> {
        let Some(window) = subwindow else {
            return Ok(());
        };
        let Some(kind) = DragKind::from_button(button) else {
            return Ok(());
        };
        if !mods.clean().contains(self.modifier) {
            return Ok(());
        }
        let start = self.sync_geometry(window)?;
        debug!("{:?} drag of {} from {}", kind, window, start);
        self.drag = Some(DragSession {
            window,
            kind,
            pointer,
            start,
        });
        Ok(())
    }

    fn continue_drag(&mut self, root_x: i32, root_y: i32) -> Result<(), ManagerError> {
        let Some(session) = self.drag else {
            return Ok(());
        };
        let dx = root_x - session.pointer.0;
        let dy = root_y - session.pointer.1;
        let next = geometry::drag(session.start, session.kind, dx, dy);
        self.ws
            .move_resize(session.window, next)
            .map_err(ws_err)?;
        self.record_geometry(session.window, next);
        Ok(())
    }

    //  Window lifecycle

    fn manage(&mut self, window: WindowHandle) -> Result<(), ManagerError> {
        if self.desktops.active().contains(window) {
            self.ws.map(window).map_err(ws_err)?;
            return self.refresh_focus();
        }
        if let Some(desktop) = self.desktops.locate(window) {
            debug!("{} asked to be shown but lives on desktop {}", window, desktop);
            return Ok(());
        }

        let mut client = Client::new(window);
        client.set_title(self.ws.fetch_title(window).ok().flatten());
        if let Ok(geometry) = self.ws.query_geometry(window) {
            client.geometry = geometry;
        }
        info!(
            "managing {} \"{}\" on desktop {}",
            window,
            client.title,
            self.desktops.active_index()
        );

        self.desktops.active_mut().insert(client);
        self.ws
            .set_border_width(window, self.border_width)
            .map_err(ws_err)?;
        self.ws.map(window).map_err(ws_err)?;
        self.refresh_focus()
    }

    fn unmanage(&mut self, window: WindowHandle) -> Result<(), ManagerError> {
        if self.drag.is_some_and(|d| d.window == window) {
            self.drag = None;
        }
        let Some((desktop, client)) = self.desktops.remove_anywhere(window) else {
            return Ok(());
        };
        info!(
            "{} \"{}\" gone from desktop {}",
            window, client.title, desktop
        );
        if desktop == self.desktops.active_index() {
            self.refresh_focus()?;
        }
        Ok(())
    }

    fn configure(
        &mut self,
        window: WindowHandle,
        changes: ConfigureChanges,
    ) -> Result<(), ManagerError> {
        let current = match self.desktops.client_mut(window) {
            Some(client) => client.geometry,
            None => self.ws.query_geometry(window).unwrap_or_default(),
        };
        let target = changes.apply(current);
        self.ws.move_resize(window, target).map_err(ws_err)?;
        self.record_geometry(window, target);
        Ok(())
    }

    fn property_changed(
        &mut self,
        window: WindowHandle,
        property: Property,
    ) -> Result<(), ManagerError> {
        if property != Property::Title || self.desktops.locate(window).is_none() {
            return Ok(());
        }
        let title = self.ws.fetch_title(window).map_err(ws_err)?;
        if let Some(client) = self.desktops.client_mut(window) {
            client.set_title(title);
            debug!("{} retitled \"{}\"", window, client.title);
        }
        Ok(())
    }

    //  Status

    /// Send the status line if it differs from the last one sent.
    fn publish_status(&mut self) {
        let Some(tx) = &self.status_tx else {
            return;
        };
        let line = self.status_line();
        if self.last_status.as_ref() == Some(&line) {
            return;
        }
        let _ = tx.send(line.clone());
        self.last_status = Some(line);
    }
}

fn ws_err<E: std::error::Error>(e: E) -> ManagerError {
    ManagerError::WindowSystem(e.to_string())
}

//  Tests
