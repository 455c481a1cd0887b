//! Desktop multiplexer.
//!
//! [`Desktops`] owns one [`Registry`] per desktop and tracks which desktop
//! is displayed.  The registry of the active desktop is held *live*, apart
//! from its slot:
//!
//! * [`save_active`](Desktops::save_active) stores the live registry back
//!   into the active slot,
//! * [`select`](Desktops::select) makes another desktop active and loads its
//!   registry as the live one.
//!
//! Callers must save before selecting; a live registry that was never saved
//! is discarded by `select`.  [`change_desktop`](Desktops::change_desktop)
//! and [`move_client_to`](Desktops::move_client_to) are the composed
//! operations the manager actually uses.
//!
//! Lookups go through [`active`](Desktops::active) and
//! [`desktop`](Desktops::desktop), which always see the current contents of
//! a desktop whether it is live or saved.

use crate::command::WindowHandle;
use crate::registry::{Client, Registry};
use crate::traits::WindowSystem;
use log::{debug, info, warn};

/// Number of desktops.
pub const DESKTOP_COUNT: usize = 10;

/// The fixed set of desktops and the active one.
#[derive(Debug)]
pub struct Desktops {
    slots: [Registry; DESKTOP_COUNT],
    active: usize,
    live: Option<Registry>,
}

impl Default for Desktops {
    fn default() -> Self {
        Self::new()
    }
}

impl Desktops {
    /// All desktops empty, desktop `0` active.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Registry::new()),
            active: 0,
            live: None,
        }
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Registry of the displayed desktop.
    pub fn active(&self) -> &Registry {
        self.live.as_ref().unwrap_or(&self.slots[self.active])
    }

    /// Mutable registry of the displayed desktop, loading it if needed.
    pub fn active_mut(&mut self) -> &mut Registry {
        let active = self.active;
        let slots = &mut self.slots;
        self.live
            .get_or_insert_with(|| std::mem::take(&mut slots[active]))
    }

    /// Registry of desktop `index`, or `None` when out of range.
    pub fn desktop(&self, index: usize) -> Option<&Registry> {
        if index == self.active {
            Some(self.active())
        } else {
            self.slots.get(index)
        }
    }

    /// `(index, registry)` for every desktop.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Registry)> {
        (0..DESKTOP_COUNT).filter_map(move |i| self.desktop(i).map(|r| (i, r)))
    }

    /// Index of the desktop that manages `handle`.
    pub fn locate(&self, handle: WindowHandle) -> Option<usize> {
        self.iter()
            .find(|(_, r)| r.contains(handle))
            .map(|(i, _)| i)
    }

    /// The client managing `handle`, on whichever desktop it lives.
    pub fn client_mut(&mut self, handle: WindowHandle) -> Option<&mut Client> {
        let index = self.locate(handle)?;
        let registry = self.registry_mut(index)?;
        let id = registry.find(handle)?;
        registry.get_mut(id)
    }

    /// Remove `handle` from whichever desktop manages it.
    ///
    /// Returns the desktop index and the removed client.
    pub fn remove_anywhere(&mut self, handle: WindowHandle) -> Option<(usize, Client)> {
        let index = self.locate(handle)?;
        let client = self.registry_mut(index)?.remove(handle)?;
        Some((index, client))
    }

    /// Total number of managed clients across all desktops.
    pub fn client_count(&self) -> usize {
        self.iter().map(|(_, r)| r.len()).sum()
    }

    /// Store the live registry into the active desktop's slot.
    pub fn save_active(&mut self) {
        if let Some(live) = self.live.take() {
            self.slots[self.active] = live;
        }
    }

    /// Make desktop `index` active and load its registry.
    ///
    /// Returns `false` and changes nothing when `index` is out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= DESKTOP_COUNT {
            warn!("desktop {} out of range (0..{})", index, DESKTOP_COUNT);
            return false;
        }
        if let Some(unsaved) = self.live.take() {
            if !unsaved.is_empty() {
                warn!(
                    "desktop {} was not saved, dropping {} client(s)",
                    self.active,
                    unsaved.len()
                );
            }
        }
        self.active = index;
        self.live = Some(std::mem::take(&mut self.slots[index]));
        true
    }

    /// Display desktop `index`: hide every window of the current desktop,
    /// swap registries, then show every window of the new one.
    ///
    /// Returns `Ok(false)` without touching anything when `index` is already
    /// active or out of range.  Refreshing focus visuals is left to the
    /// caller.
    pub fn change_desktop<W: WindowSystem>(
        &mut self,
        index: usize,
        ws: &W,
    ) -> Result<bool, W::Error> {
        if index == self.active {
            return Ok(false);
        }
        if index >= DESKTOP_COUNT {
            warn!("desktop {} out of range (0..{})", index, DESKTOP_COUNT);
            return Ok(false);
        }

        for (_, client) in self.active().iter() {
            ws.unmap(client.handle)?;
        }
        let previous = self.active;
        self.save_active();
        self.select(index);
        for (_, client) in self.active().iter() {
            ws.map(client.handle)?;
        }

        info!("desktop {} -> {}", previous, index);
        Ok(true)
    }

    /// Move the focused client of the active desktop to desktop `index`.
    ///
    /// The client keeps its handle, title and geometry, is inserted after
    /// the destination's focus, removed from the source, and hidden.  The
    /// active desktop does not change.  Returns the moved handle, or
    /// `Ok(None)` when `index` is the active desktop, out of range, or
    /// nothing is focused.
    pub fn move_client_to<W: WindowSystem>(
        &mut self,
        index: usize,
        ws: &W,
    ) -> Result<Option<WindowHandle>, W::Error> {
        if index == self.active || index >= DESKTOP_COUNT {
            return Ok(None);
        }
        let Some(client) = self.active().focused_client().cloned() else {
            return Ok(None);
        };
        let handle = client.handle;
        let source = self.active;

        self.save_active();
        self.select(index);
        self.active_mut().insert(client);
        self.save_active();
        self.select(source);
        self.active_mut().remove(handle);

        ws.unmap(handle)?;
        debug!("moved {} from desktop {} to {}", handle, source, index);
        Ok(Some(handle))
    }

    fn registry_mut(&mut self, index: usize) -> Option<&mut Registry> {
        if index == self.active {
            Some(self.active_mut())
        } else {
            self.slots.get_mut(index)
        }
    }

    /// Check the cross-desktop invariants, panicking on the first violation.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut seen = std::collections::HashSet::new();
        for (i, registry) in self.iter() {
            registry.assert_consistent();
            for handle in registry.handles() {
                assert!(seen.insert(handle), "{} managed twice (desktop {})", handle, i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, RecordingWs};

    fn w(n: u32) -> WindowHandle {
        WindowHandle(n)
    }

    fn with_clients(handles: &[u32]) -> Desktops {
        let mut d = Desktops::new();
        for &h in handles {
            d.active_mut().insert(Client::new(w(h)));
        }
        d
    }

    #[test]
    fn starts_on_desktop_zero_with_everything_empty() {
        let d = Desktops::new();
        assert_eq!(d.active_index(), 0);
        assert_eq!(d.iter().count(), DESKTOP_COUNT);
        assert!(d.iter().all(|(_, r)| r.is_empty()));
    }

    #[test]
    fn save_then_select_swaps_registries() {
        let mut d = with_clients(&[1, 2]);
        d.save_active();
        assert!(d.select(3));
        assert_eq!(d.active_index(), 3);
        assert!(d.active().is_empty());
        assert_eq!(d.desktop(0).unwrap().handles(), vec![w(1), w(2)]);

        d.active_mut().insert(Client::new(w(9)));
        d.save_active();
        d.select(0);
        assert_eq!(d.active().handles(), vec![w(1), w(2)]);
        assert_eq!(d.desktop(3).unwrap().handles(), vec![w(9)]);
        d.assert_consistent();
    }

    #[test]
    fn saved_registry_is_visible_before_reselect() {
        let mut d = with_clients(&[1]);
        d.save_active();
        // Between save and select the active desktop still reports its contents.
        assert_eq!(d.active().handles(), vec![w(1)]);
        assert_eq!(d.desktop(0).unwrap().handles(), vec![w(1)]);
    }

    #[test]
    fn select_out_of_range_is_rejected() {
        let mut d = with_clients(&[1]);
        d.save_active();
        assert!(!d.select(DESKTOP_COUNT));
        assert_eq!(d.active_index(), 0);
        assert_eq!(d.active().handles(), vec![w(1)]);
    }

    #[test]
    fn desktop_isolation() {
        let mut d = with_clients(&[1]);
        d.save_active();
        d.select(1);
        assert!(!d.active().contains(w(1)));
        assert_eq!(d.locate(w(1)), Some(0));
    }

    #[test]
    fn change_desktop_unmaps_old_and_maps_new() {
        let ws = RecordingWs::new();
        let mut d = with_clients(&[1, 2]);
        d.save_active();
        d.select(1);
        d.active_mut().insert(Client::new(w(5)));
        d.save_active();
        d.select(0);

        assert!(d.change_desktop(1, &ws).unwrap());
        assert_eq!(d.active_index(), 1);
        assert_eq!(
            *ws.calls.borrow(),
            vec![
                Call::Unmap(w(1)),
                Call::Unmap(w(2)),
                Call::Map(w(5)),
            ]
        );
        d.assert_consistent();
    }

    #[test]
    fn change_to_active_desktop_is_noop() {
        let ws = RecordingWs::new();
        let mut d = with_clients(&[1]);
        assert!(!d.change_desktop(0, &ws).unwrap());
        assert!(ws.calls.borrow().is_empty());
    }

    #[test]
    fn change_desktop_out_of_range_is_noop() {
        let ws = RecordingWs::new();
        let mut d = with_clients(&[1]);
        assert!(!d.change_desktop(42, &ws).unwrap());
        assert_eq!(d.active_index(), 0);
        assert!(ws.calls.borrow().is_empty());
    }

    #[test]
    fn change_desktop_preserves_focus_per_desktop() {
        let ws = RecordingWs::new();
        let mut d = with_clients(&[1, 2, 3]);
        d.active_mut().focus_next();
        let focused = d.active().focused_client().map(|c| c.handle);
        d.change_desktop(4, &ws).unwrap();
        d.change_desktop(0, &ws).unwrap();
        assert_eq!(d.active().focused_client().map(|c| c.handle), focused);
    }

    #[test]
    fn move_client_to_other_desktop() {
        let ws = RecordingWs::new();
        let mut d = with_clients(&[1]);
        let moved = d.move_client_to(1, &ws).unwrap();
        assert_eq!(moved, Some(w(1)));
        assert_eq!(d.active_index(), 0);
        assert!(d.active().is_empty());
        assert_eq!(d.active().focused(), None);
        assert_eq!(d.desktop(1).unwrap().handles(), vec![w(1)]);
        assert_eq!(
            d.desktop(1).unwrap().focused_client().map(|c| c.handle),
            Some(w(1))
        );
        assert_eq!(*ws.calls.borrow(), vec![Call::Unmap(w(1))]);
        d.assert_consistent();
    }

    #[test]
    fn move_client_keeps_client_data() {
        let ws = RecordingWs::new();
        let mut d = with_clients(&[1]);
        {
            let c = d.active_mut().focused_client_mut().unwrap();
            c.title = "editor".into();
            c.geometry = crate::command::Geometry::new(5, 6, 7, 8);
        }
        d.move_client_to(2, &ws).unwrap();
        let dest = d.desktop(2).unwrap();
        let c = dest.focused_client().unwrap();
        assert_eq!(c.title, "editor");
        assert_eq!(c.geometry, crate::command::Geometry::new(5, 6, 7, 8));
    }

    #[test]
    fn move_client_refocuses_source_predecessor() {
        let ws = RecordingWs::new();
        let mut d = with_clients(&[1, 2, 3]);
        let second = d.active().find(w(2)).unwrap();
        d.active_mut().set_focus(second);
        d.move_client_to(5, &ws).unwrap();
        assert_eq!(d.active().handles(), vec![w(1), w(3)]);
        assert_eq!(d.active().focused_client().map(|c| c.handle), Some(w(1)));
        d.assert_consistent();
    }

    #[test]
    fn move_client_to_active_or_without_focus_is_noop() {
        let ws = RecordingWs::new();
        let mut d = with_clients(&[1]);
        assert_eq!(d.move_client_to(0, &ws).unwrap(), None);

        let mut empty = Desktops::new();
        assert_eq!(empty.move_client_to(1, &ws).unwrap(), None);
        assert!(ws.calls.borrow().is_empty());
    }

    #[test]
    fn remove_anywhere_reaches_hidden_desktops() {
        let ws = RecordingWs::new();
        let mut d = with_clients(&[1, 2]);
        d.move_client_to(7, &ws).unwrap();
        let (index, client) = d.remove_anywhere(w(2)).unwrap();
        assert_eq!(index, 7);
        assert_eq!(client.handle, w(2));
        assert!(d.desktop(7).unwrap().is_empty());
        assert!(d.remove_anywhere(w(2)).is_none());
        d.assert_consistent();
    }

    #[test]
    fn client_mut_finds_hidden_clients() {
        let ws = RecordingWs::new();
        let mut d = with_clients(&[1, 2]);
        d.move_client_to(3, &ws).unwrap();
        d.client_mut(w(2)).unwrap().title = "hidden".into();
        assert_eq!(d.desktop(3).unwrap().focused_client().unwrap().title, "hidden");
        assert_eq!(d.client_count(), 2);
    }
}
