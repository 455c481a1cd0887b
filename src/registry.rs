//! The per-desktop client registry.
//!
//! A [`Registry`] is an ordered, doubly linked list of [`Client`]s stored in
//! an arena.  Links are [`ClientId`]s (slot index plus generation) instead of
//! references, so an id kept across a removal can never reach a recycled
//! slot: lookups with a stale id simply return `None`.
//!
//! The list is not circular, but traversal with [`Registry::next_of`] and
//! [`Registry::prev_of`] wraps around at either end.

use crate::command::{Geometry, WindowHandle};

/// Placeholder title for windows that do not report a usable name.
pub const BROKEN_TITLE: &str = "broken";

/// Stable, generation-checked reference to a client inside one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId {
    index: usize,
    generation: u32,
}

/// Whether a client currently occupies its normal or its maximized geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowState {
    #[default]
    Normal,
    Maximized,
}

/// One managed top-level window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// Identity of the window in the windowing system.
    pub handle: WindowHandle,
    /// Best-effort display name.
    pub title: String,
    /// Last geometry the manager applied or observed.
    pub geometry: Geometry,
    /// Geometry to restore when leaving the maximized state.
    pub saved_geometry: Geometry,
    pub state: WindowState,
}

impl Client {
    pub fn new(handle: WindowHandle) -> Self {
        Self {
            handle,
            title: BROKEN_TITLE.to_string(),
            geometry: Geometry::default(),
            saved_geometry: Geometry::default(),
            state: WindowState::Normal,
        }
    }

    /// Set the title, falling back to [`BROKEN_TITLE`] for empty names.
    pub fn set_title(&mut self, title: Option<String>) {
        self.title = match title {
            Some(t) if !t.trim().is_empty() => t,
            _ => BROKEN_TITLE.to_string(),
        };
    }
}

#[derive(Debug, Clone)]
struct Node {
    client: Client,
    prev: Option<ClientId>,
    next: Option<ClientId>,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Ordered collection of the clients on one desktop, plus its focus.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: Option<ClientId>,
    tail: Option<ClientId>,
    focused: Option<ClientId>,
    len: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First client in list order.
    pub fn head(&self) -> Option<ClientId> {
        self.head
    }

    /// The client that has focus on this desktop.
    pub fn focused(&self) -> Option<ClientId> {
        self.focused
    }

    pub fn focused_client(&self) -> Option<&Client> {
        self.focused.and_then(|id| self.get(id))
    }

    pub fn focused_client_mut(&mut self) -> Option<&mut Client> {
        let id = self.focused?;
        self.get_mut(id)
    }

    /// Move focus to `id`.  Returns `false` (and leaves focus alone) when the
    /// id does not belong to this registry.
    pub fn set_focus(&mut self, id: ClientId) -> bool {
        if self.node(id).is_some() {
            self.focused = Some(id);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.node(id).map(|n| &n.client)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.node_mut(id).map(|n| &mut n.client)
    }

    /// Look up the client managing `handle`.
    pub fn find(&self, handle: WindowHandle) -> Option<ClientId> {
        self.iter()
            .find(|(_, c)| c.handle == handle)
            .map(|(id, _)| id)
    }

    pub fn contains(&self, handle: WindowHandle) -> bool {
        self.find(handle).is_some()
    }

    /// Iterate over the clients in list order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            registry: self,
            cursor: self.head,
        }
    }

    /// Window handles in list order.
    pub fn handles(&self) -> Vec<WindowHandle> {
        self.iter().map(|(_, c)| c.handle).collect()
    }

    /// Insert `client` right after the focused client (or as the only
    /// element) and focus it.
    pub fn insert(&mut self, client: Client) -> ClientId {
        let id = self.allocate(client);
        let after = self.focused.filter(|f| self.node(*f).is_some()).or(self.tail);

        match after {
            None => {
                self.head = Some(id);
                self.tail = Some(id);
            }
            Some(prev) => {
                let next = self.node(prev).and_then(|n| n.next);
                if let Some(node) = self.node_mut(id) {
                    node.prev = Some(prev);
                    node.next = next;
                }
                if let Some(node) = self.node_mut(prev) {
                    node.next = Some(id);
                }
                match next {
                    Some(n) => {
                        if let Some(node) = self.node_mut(n) {
                            node.prev = Some(id);
                        }
                    }
                    None => self.tail = Some(id),
                }
            }
        }

        self.len += 1;
        self.focused = Some(id);
        id
    }

    /// Unlink the client managing `handle` and return it.
    ///
    /// Focus moves to the removed node's predecessor, or to its successor
    /// when it was the head; removing the last client leaves no focus.
    /// Unknown handles are ignored.
    pub fn remove(&mut self, handle: WindowHandle) -> Option<Client> {
        let id = self.find(handle)?;
        let (prev, next) = {
            let node = self.node(id)?;
            (node.prev, node.next)
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        self.focused = prev.or(next);
        self.len -= 1;
        self.release(id).map(|node| node.client)
    }

    /// The client after `id`, wrapping from the tail to the head.
    pub fn next_of(&self, id: ClientId) -> Option<ClientId> {
        let node = self.node(id)?;
        node.next.or(self.head)
    }

    /// The client before `id`, wrapping from the head to the tail.
    pub fn prev_of(&self, id: ClientId) -> Option<ClientId> {
        let node = self.node(id)?;
        node.prev.or(self.tail)
    }

    /// Advance focus to the next client.  Returns the newly focused id.
    pub fn focus_next(&mut self) -> Option<ClientId> {
        let next = self.next_of(self.focused?)?;
        self.focused = Some(next);
        Some(next)
    }

    /// Move focus to the previous client.  Returns the newly focused id.
    pub fn focus_prev(&mut self) -> Option<ClientId> {
        let prev = self.prev_of(self.focused?)?;
        self.focused = Some(prev);
        Some(prev)
    }

    fn node(&self, id: ClientId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, id: ClientId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    fn allocate(&mut self, client: Client) -> ClientId {
        let node = Node {
            client,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                ClientId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                ClientId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn release(&mut self, id: ClientId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    /// Check every structural invariant of the list, panicking on the first
    /// violation.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut seen = std::collections::HashSet::new();
        let mut prev: Option<ClientId> = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            assert!(seen.insert(id), "cycle through {:?}", id);
            let node = self.node(id).expect("link to a freed slot");
            assert_eq!(node.prev, prev, "prev link of {:?} is inconsistent", id);
            prev = Some(id);
            cursor = node.next;
        }
        assert_eq!(self.tail, prev, "tail does not end the list");
        assert_eq!(seen.len(), self.len, "len disagrees with the list");
        match self.focused {
            Some(f) => assert!(seen.contains(&f), "focus {:?} is not a member", f),
            None => assert!(self.is_empty(), "non-empty registry without focus"),
        }
        let handles = self.handles();
        let unique: std::collections::HashSet<_> = handles.iter().collect();
        assert_eq!(unique.len(), handles.len(), "duplicate handle in registry");
    }
}

/// Iterator over `(id, client)` pairs in list order.
pub struct Iter<'a> {
    registry: &'a Registry,
    cursor: Option<ClientId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (ClientId, &'a Client);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.registry.node(id)?;
        self.cursor = node.next;
        Some((id, &node.client))
    }
}
