//! §3 "The multiplexer exclusively owns the `StreamId -> StreamState`
//! mapping" -- a slab-backed map keyed by `StreamId`, handed out through
//! opaque `Key`s the way the teacher's `proto::streams::store::Store`
//! does, so a `Child` can hold a cheap, stable handle to its own slot
//! without borrowing the whole map.
//!
//! The teacher's `Store` also threads an intrusive priority linked list
//! (`Queue`/`Next`) through each slab entry; this spec has no stream
//! priority tree, so that machinery is dropped (see DESIGN.md's final
//! trimming note) in favor of the plain per-stream `VecDeque`s spec §3
//! actually asks for.

use std::collections::HashMap;
use std::ops;

use slab;

use proto::StreamId;

use super::stream::Stream;

#[derive(Debug)]
pub struct Store {
    slab: slab::Slab<Stream>,
    ids: HashMap<StreamId, usize>,
}

/// A stable handle into the store. Cheap to copy, carried by `Child`/
/// `StreamRef` across calls that re-borrow the store each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key(usize);

pub enum Entry<'a> {
    Occupied(OccupiedEntry<'a>),
    Vacant(VacantEntry<'a>),
}

pub struct OccupiedEntry<'a> {
    key: usize,
}

pub struct VacantEntry<'a> {
    id: StreamId,
    store: &'a mut Store,
}

impl Store {
    pub fn new() -> Store {
        Store { slab: slab::Slab::new(), ids: HashMap::new() }
    }

    pub fn find_key(&self, id: StreamId) -> Option<Key> {
        self.ids.get(&id).map(|&k| Key(k))
    }

    pub fn get(&self, key: Key) -> &Stream {
        &self.slab[key.0]
    }

    pub fn get_mut(&mut self, key: Key) -> &mut Stream {
        &mut self.slab[key.0]
    }

    pub fn insert(&mut self, id: StreamId, value: Stream) -> Key {
        let key = self.slab.insert(value);
        assert!(self.ids.insert(id, key).is_none(), "duplicate stream id inserted");
        Key(key)
    }

    /// Inserts a locally-created stream whose id has not been assigned
    /// yet (§4.1): it lives in the slab, reachable only by `Key`, until
    /// [`Store::assign_id`] registers it under its lazily-assigned id.
    pub fn insert_pending(&mut self, value: Stream) -> Key {
        Key(self.slab.insert(value))
    }

    /// Registers a previously-pending stream under its now-assigned id,
    /// at the moment of its first flushed write (§4.1).
    pub fn assign_id(&mut self, key: Key, id: StreamId) {
        assert!(self.ids.insert(id, key.0).is_none(), "duplicate stream id assigned");
    }

    /// Removes a stream entirely. Called once a `StreamClosed` event has
    /// been processed and the slot's back-reference cycle must be broken
    /// (spec §9's cyclic-reference design note).
    pub fn remove(&mut self, key: Key) -> Stream {
        let stream = self.slab.remove(key.0);
        if let Some(id) = stream.id {
            self.ids.remove(&id);
        }
        stream
    }

    pub fn find_entry(&mut self, id: StreamId) -> Entry {
        if let Some(&key) = self.ids.get(&id) {
            Entry::Occupied(OccupiedEntry { key })
        } else {
            Entry::Vacant(VacantEntry { id, store: self })
        }
    }

    /// Snapshot of every currently-assigned key. Collected eagerly (not a
    /// lazy iterator) so callers are free to mutate the store while
    /// visiting each one, e.g. `Streams::end_of_burst`.
    pub fn keys(&self) -> Vec<Key> {
        self.ids.values().map(|&k| Key(k)).collect()
    }

    /// Snapshot of every key in the slab, including locally-created
    /// streams that haven't acquired a wire id yet. `keys()` alone would
    /// miss those -- an outbound stream's setup initializer (spec §4.5)
    /// still needs driving to completion before its first flush assigns
    /// it one, so `Streams::poll_initializers` visits this set instead.
    pub fn all_keys(&self) -> Vec<Key> {
        self.slab.iter().map(|(k, _)| Key(k)).collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

impl<'a> OccupiedEntry<'a> {
    pub fn key(&self) -> Key {
        Key(self.key)
    }
}

impl<'a> VacantEntry<'a> {
    pub fn insert(self, value: Stream) -> Key {
        self.store.insert(self.id, value)
    }
}

impl ops::Index<Key> for Store {
    type Output = Stream;

    fn index(&self, key: Key) -> &Stream {
        self.get(key)
    }
}

impl ops::IndexMut<Key> for Store {
    fn index_mut(&mut self, key: Key) -> &mut Stream {
        self.get_mut(key)
    }
}
