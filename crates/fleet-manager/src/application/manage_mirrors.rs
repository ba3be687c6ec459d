//! MirrorRegistry: the live mirror sessions, keyed by device serial.
//!
//! Each entry pairs a [`MirrorSession`] with the container surface its window
//! is (or will be) adopted into.  Entries keep their insertion order, which is
//! the order in which the grid layout places them.
//!
//! At most one session exists per serial.  Inserting a new session for a
//! serial that already has one closes the old session first, and removing an
//! entry closes its session.

use std::sync::Arc;

use crate::application::mirror_session::MirrorSession;
use crate::infrastructure::window_host::ContainerSurface;

/// A session together with its container.
#[derive(Clone)]
pub struct MirrorEntry {
    pub session: Arc<MirrorSession>,
    pub container: Arc<dyn ContainerSurface>,
}

impl MirrorEntry {
    pub fn new(session: Arc<MirrorSession>, container: Arc<dyn ContainerSurface>) -> Self {
        Self { session, container }
    }

    pub fn serial(&self) -> &str {
        self.session.serial()
    }
}

/// In-memory registry of mirror sessions.
///
/// A `Vec` keeps insertion order; fleets are small enough that a linear scan
/// by serial costs nothing.
#[derive(Default)]
pub struct MirrorRegistry {
    entries: Vec<MirrorEntry>,
}

impl MirrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `entry`, closing and replacing any session for the same
    /// serial.  The replacement keeps the old entry's position.
    ///
    /// Returns the replaced entry, if any.
    pub fn insert(&mut self, entry: MirrorEntry) -> Option<MirrorEntry> {
        match self.position(entry.serial()) {
            Some(index) => {
                let old = std::mem::replace(&mut self.entries[index], entry);
                old.session.close();
                Some(old)
            }
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    /// Removes and closes the session for `serial`.
    pub fn remove(&mut self, serial: &str) -> Option<MirrorEntry> {
        let index = self.position(serial)?;
        let entry = self.entries.remove(index);
        entry.session.close();
        Some(entry)
    }

    pub fn get(&self, serial: &str) -> Option<&MirrorEntry> {
        self.entries.iter().find(|e| e.serial() == serial)
    }

    /// Drops entries whose session is closed (launch or adoption failed, or
    /// closed by the operator) and returns how many were removed.
    pub fn prune_closed(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.session.phase().is_closed());
        before - self.entries.len()
    }

    /// Every entry in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MirrorEntry> {
        self.entries.iter()
    }

    /// Entries whose window has been adopted, in insertion order.
    pub fn adopted(&self) -> impl Iterator<Item = &MirrorEntry> {
        self.entries
            .iter()
            .filter(|e| e.session.phase() == fleet_core::MirrorPhase::Adopted)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closes every session and empties the registry.
    pub fn close_all(&mut self) {
        for entry in self.entries.drain(..) {
            entry.session.close();
        }
    }

    fn position(&self, serial: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.serial() == serial)
    }
}
