//! Open-addressing hash table
//!
//! Buckets are probed linearly from `hash(key) % buckets` to the end of
//! the array, then from index 0 up to the start. A bucket is usable for a
//! key when it is empty or already holds that key. Before a new key is
//! stored the table is rebuilt at `entries / 0.5 + 1` buckets whenever the
//! load factor has reached 0.7; the rebuild re-merges every bucket into
//! the fresh array.
//!
//! Removing a key shifts the following entries of its probe run back so
//! that every remaining key stays reachable from its home bucket.

use crate::{Change, Error, Result};
use tracing::debug;

/// Bucket count of a fresh table
pub const INITIAL_BUCKETS: usize = 113;

/// Load factor at which the table grows
pub const MAX_LOAD: f64 = 0.7;

/// Load factor right after growing
pub const TARGET_LOAD: f64 = 0.5;

/// Content of one bucket
pub trait Slot {
    /// Key the bucket is stored under
    fn key(&self) -> &str;

    /// Empty slots are pruned from the table after every merge
    fn is_empty(&self) -> bool;

    /// Number of items held by the slot
    fn item_count(&self) -> usize;

    /// Merge another slot with the same key into this one
    fn absorb(&mut self, other: Self) -> Result<Change>
    where
        Self: Sized;
}

/// 64-bit djb2 string hash
pub fn hash_key(key: &str) -> u64 {
    key.bytes().fold(5381u64, |hash, byte| {
        hash.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

/// Hash table of slots keyed by string.
///
/// Iterators borrow the table, so it cannot be modified while one is
/// alive; holding on to bucket positions across merges is not supported.
#[derive(Debug, Clone)]
pub struct KeyedTable<S> {
    buckets: Vec<Option<S>>,
    entries: usize,
}

impl<S: Slot> Default for KeyedTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Slot> KeyedTable<S> {
    pub fn new() -> Self {
        Self::with_buckets(INITIAL_BUCKETS)
    }

    pub fn with_buckets(buckets: usize) -> Self {
        Self {
            buckets: empty_buckets(buckets.max(1)),
            entries: 0,
        }
    }

    /// Number of occupied buckets (distinct keys)
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of buckets
    pub fn buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.entries as f64 / self.buckets.len() as f64
    }

    /// Total number of items over all slots
    pub fn item_count(&self) -> usize {
        self.slots().map(Slot::item_count).sum()
    }

    pub fn find(&self, key: &str) -> Option<&S> {
        let index = self.probe(key).ok()?;
        self.buckets[index].as_ref()
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut S> {
        let index = self.probe(key).ok()?;
        self.buckets[index].as_mut()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Slots in bucket order
    pub fn slots(&self) -> impl Iterator<Item = &S> + '_ {
        self.buckets.iter().flatten()
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut S> + '_ {
        self.buckets.iter_mut().flatten()
    }

    /// Run `update` on the slot for `key`, creating it with `create` when
    /// the key is new. The slot is removed again if it ends up empty,
    /// whether or not `update` succeeded.
    pub fn upsert<R>(
        &mut self,
        key: &str,
        create: impl FnOnce() -> S,
        update: impl FnOnce(&mut S) -> Result<R>,
    ) -> Result<R> {
        let index = self.reserve(key)?;
        if self.buckets[index].is_none() {
            self.entries += 1;
        }

        let result = update(self.buckets[index].get_or_insert_with(create));

        if self.buckets[index].as_ref().map_or(false, Slot::is_empty) {
            self.remove_at(index);
        }

        result
    }

    /// Insert a whole slot, merging it into an existing slot with the same
    /// key
    pub fn merge_slot(&mut self, slot: S) -> Result<Change> {
        if slot.is_empty() && !self.contains_key(slot.key()) {
            return Ok(Change::Unchanged);
        }
        let index = self.reserve(slot.key())?;
        self.place(index, slot)
    }

    pub fn remove(&mut self, key: &str) -> Option<S> {
        let index = self.probe(key).ok()?;
        if self.buckets[index].is_some() {
            self.remove_at(index)
        } else {
            None
        }
    }

    /// Remove every slot for which `keep` returns false
    pub fn retain(&mut self, mut keep: impl FnMut(&S) -> bool) -> usize {
        let doomed: Vec<String> = self
            .slots()
            .filter(|slot| !keep(slot))
            .map(|slot| slot.key().to_string())
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    /// Rebuild at a fresh bucket count, re-merging every slot.
    ///
    /// The table is left untouched when `buckets` cannot hold every key.
    pub fn rebuild(&mut self, buckets: usize) -> Result<()> {
        let buckets = buckets.max(1);
        if buckets < self.entries {
            let key = self.slots().last().map(|slot| slot.key().to_string());
            return Err(Error::Capacity {
                key: key.unwrap_or_default(),
                buckets,
            });
        }

        let mut fresh = Self::with_buckets(buckets);
        for bucket in &mut self.buckets {
            if let Some(slot) = bucket.take() {
                // Keys are unique and fit, so this neither probes out nor absorbs
                fresh.readmit(slot)?;
            }
        }

        debug_assert_eq!(fresh.entries, self.entries);
        *self = fresh;
        Ok(())
    }

    fn grow(&mut self) -> Result<()> {
        let old = self.buckets.len();
        let new = (self.entries as f64 / TARGET_LOAD) as usize + 1;
        debug!(
            entries = self.entries,
            "growing table from {} to {} buckets", old, new
        );
        self.rebuild(new)
    }

    /// Bucket for `key`, growing first when a new key would push the load
    /// past the limit or find no empty bucket
    fn reserve(&mut self, key: &str) -> Result<usize> {
        match self.probe(key) {
            Ok(index) if self.buckets[index].is_some() => return Ok(index),
            Ok(index) if self.load_factor() < MAX_LOAD => return Ok(index),
            _ => {}
        }
        self.grow()?;
        self.probe(key)
    }

    /// Place a slot without checking the load factor
    fn readmit(&mut self, slot: S) -> Result<Change> {
        let index = self.probe(slot.key())?;
        self.place(index, slot)
    }

    /// Store `slot` in an empty bucket or merge it into the occupant
    fn place(&mut self, index: usize, slot: S) -> Result<Change> {
        let result = match self.buckets[index].as_mut() {
            Some(existing) => existing.absorb(slot),
            None => {
                self.buckets[index] = Some(slot);
                self.entries += 1;
                return Ok(Change::Added);
            }
        };
        if self.buckets[index].as_ref().map_or(false, Slot::is_empty) {
            self.remove_at(index);
        }
        result
    }

    fn home(&self, key: &str) -> usize {
        (hash_key(key) % self.buckets.len() as u64) as usize
    }

    /// Find the bucket holding `key`, or the empty bucket where it belongs
    fn probe(&self, key: &str) -> Result<usize> {
        let start = self.home(key);
        let n = self.buckets.len();

        for index in (start..n).chain(0..start) {
            match &self.buckets[index] {
                None => return Ok(index),
                Some(slot) if slot.key() == key => return Ok(index),
                Some(_) => {}
            }
        }

        Err(Error::Capacity {
            key: key.to_string(),
            buckets: n,
        })
    }

    fn remove_at(&mut self, index: usize) -> Option<S> {
        let removed = self.buckets[index].take()?;
        self.entries -= 1;

        let n = self.buckets.len();
        let mut hole = index;
        let mut next = (index + 1) % n;

        while next != index {
            let home = match &self.buckets[next] {
                Some(slot) => self.home(slot.key()),
                None => break,
            };
            // Move the entry back if the hole lies on its probe path
            if distance(home, hole, n) < distance(home, next, n) {
                self.buckets[hole] = self.buckets[next].take();
                hole = next;
            }
            next = (next + 1) % n;
        }

        Some(removed)
    }
}

fn distance(from: usize, to: usize, n: usize) -> usize {
    (to + n - from) % n
}

fn empty_buckets<S>(n: usize) -> Vec<Option<S>> {
    std::iter::repeat_with(|| None).take(n).collect()
}
