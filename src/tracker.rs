use std::collections::BTreeMap;
use std::fmt;

use portage_atom::Slot;
use tracing::trace;

use crate::error::{Error, Result};

/// A concrete package that can occupy a slot.
pub trait Slotted: PartialEq {
    /// Grouping key, normally the unversioned `category/package`.
    fn key(&self) -> &str;

    /// The slot this package occupies under its key. Only the main slot
    /// takes part in conflict checks; sub-slots never allow coexistence.
    fn slot(&self) -> &Slot;
}

/// A blocker: forbids any matching package under its key.
pub trait Restriction<P: ?Sized> {
    /// Grouping key the restriction guards.
    fn key(&self) -> &str;

    /// Whether `candidate` is matched, and therefore blocked.
    fn matches(&self, candidate: &P) -> bool;
}

/// One entry in a slot bucket, borrowed from the caller.
pub enum Entry<'a, P, R> {
    /// A package holding a slot.
    Occupant(&'a P),
    /// A standing blocker.
    Blocker(&'a R),
}

impl<'a, P: Slotted, R: Restriction<P>> Entry<'a, P, R> {
    /// The grouping key of the underlying package or restriction.
    pub fn key(&self) -> &'a str {
        match *self {
            Entry::Occupant(pkg) => pkg.key(),
            Entry::Blocker(blocker) => blocker.key(),
        }
    }
}

impl<'a, P, R> Entry<'a, P, R> {
    /// The occupant, if this entry is one.
    pub fn occupant(&self) -> Option<&'a P> {
        match *self {
            Entry::Occupant(pkg) => Some(pkg),
            Entry::Blocker(_) => None,
        }
    }

    /// The blocker, if this entry is one.
    pub fn blocker(&self) -> Option<&'a R> {
        match *self {
            Entry::Occupant(_) => None,
            Entry::Blocker(blocker) => Some(blocker),
        }
    }

    /// Identity comparison: both entries borrow the very same object.
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Entry::Occupant(a), Entry::Occupant(b)) => std::ptr::eq(*a, *b),
            (Entry::Blocker(a), Entry::Blocker(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl<P, R> Clone for Entry<'_, P, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, R> Copy for Entry<'_, P, R> {}

impl<P: fmt::Debug, R: fmt::Debug> fmt::Debug for Entry<'_, P, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Entry::Occupant(pkg) => f.debug_tuple("Occupant").field(pkg).finish(),
            Entry::Blocker(blocker) => f.debug_tuple("Blocker").field(blocker).finish(),
        }
    }
}

/// Tracks which package occupies which slot while a merge plan is built.
///
/// For every key, at most one occupant may hold a given slot, and no
/// occupant may be matched by a blocker registered under the same key.
/// Entries are borrowed; the tracker never copies or mutates them. Keys
/// whose bucket becomes empty are dropped.
///
/// # Examples
///
/// ```
/// use portage_cache::{Blocker, Cpv, Package, Slot, SlotConflictTracker};
///
/// let a = Package::new(Cpv::parse("dev-lang/python-3.11.8").unwrap(), Slot::new("3.11"));
/// let b = Package::new(Cpv::parse("dev-lang/python-3.11.9").unwrap(), Slot::new("3.11"));
/// let c = Package::new(Cpv::parse("dev-lang/python-3.12.2").unwrap(), Slot::new("3.12"));
/// let blocker = Blocker::new("dev-lang/python").in_slot(Slot::new("3.12"));
///
/// let mut tracker = SlotConflictTracker::new();
/// assert!(tracker.fill_slotting(&a).is_empty());
/// assert_eq!(tracker.fill_slotting(&b).len(), 1);
/// assert!(tracker.fill_slotting(&c).is_empty());
///
/// let conflicts = tracker.add_limiter(&blocker);
/// assert_eq!(conflicts, vec![&c]);
/// ```
pub struct SlotConflictTracker<'a, P, R> {
    slots: BTreeMap<String, Vec<Entry<'a, P, R>>>,
}

impl<'a, P, R> SlotConflictTracker<'a, P, R>
where
    P: Slotted,
    R: Restriction<P>,
{
    /// An empty tracker.
    pub fn new() -> Self {
        SlotConflictTracker {
            slots: BTreeMap::new(),
        }
    }

    /// Try to place `candidate` in its slot.
    ///
    /// Returns the entries it conflicts with: blockers matching it and
    /// other packages holding the same slot. The candidate is stored only
    /// when that list is empty. Re-inserting an equal package is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if an equal package is already slotted while a blocker in
    /// the same bucket matches it. Neither this method nor
    /// [`add_limiter`](Self::add_limiter) can produce that state, so it
    /// means the tracker is corrupt.
    pub fn fill_slotting(&mut self, candidate: &'a P) -> Vec<Entry<'a, P, R>> {
        let key = candidate.key();
        let bucket = self.slots.entry(key.to_string()).or_default();

        let mut conflicts = Vec::new();
        for entry in bucket.iter() {
            match *entry {
                Entry::Blocker(blocker) => {
                    if blocker.matches(candidate) {
                        conflicts.push(*entry);
                    }
                }
                Entry::Occupant(occupant) if occupant.slot().slot == candidate.slot().slot => {
                    if occupant == candidate {
                        let blocked = bucket
                            .iter()
                            .filter_map(Entry::blocker)
                            .any(|blocker| blocker.matches(occupant));
                        if blocked {
                            panic!("slot tracker corrupted: occupant of {key} matched by a standing blocker");
                        }
                        return Vec::new();
                    }
                    conflicts.push(*entry);
                }
                Entry::Occupant(_) => {}
            }
        }

        if conflicts.is_empty() {
            bucket.push(Entry::Occupant(candidate));
        } else {
            trace!(key, conflicts = conflicts.len(), "Slot fill rejected");
        }
        conflicts
    }

    /// Register a blocker, returning the occupants it already matches.
    ///
    /// The blocker is stored even when it conflicts; reacting to the
    /// returned packages is up to the caller.
    pub fn add_limiter(&mut self, blocker: &'a R) -> Vec<&'a P> {
        let key = blocker.key();
        let bucket = self.slots.entry(key.to_string()).or_default();

        let conflicts: Vec<&'a P> = bucket
            .iter()
            .filter_map(Entry::occupant)
            .filter(|occupant| blocker.matches(occupant))
            .collect();
        if !conflicts.is_empty() {
            trace!(key, conflicts = conflicts.len(), "Blocker matches slotted packages");
        }
        bucket.push(Entry::Blocker(blocker));
        conflicts
    }

    /// Insert any entry, dispatching to [`fill_slotting`](Self::fill_slotting)
    /// or [`add_limiter`](Self::add_limiter).
    pub fn add_entry(&mut self, entry: Entry<'a, P, R>) -> Vec<Entry<'a, P, R>> {
        match entry {
            Entry::Occupant(pkg) => self.fill_slotting(pkg),
            Entry::Blocker(blocker) => self
                .add_limiter(blocker)
                .into_iter()
                .map(Entry::Occupant)
                .collect(),
        }
    }

    /// Remove exactly `entry` (by identity) from its bucket.
    pub fn remove_slotting(&mut self, entry: Entry<'a, P, R>) -> Result<()> {
        let key = entry.key();
        let bucket = self
            .slots
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(format!("no slots held for {key}")))?;

        let before = bucket.len();
        bucket.retain(|slotted| !slotted.is_same(&entry));
        if bucket.len() == before {
            return Err(Error::NotFound(format!("entry for {key} isn't slotted")));
        }
        if bucket.is_empty() {
            self.slots.remove(key);
        }
        Ok(())
    }

    /// Entries registered under `key`, in insertion order.
    pub fn entries(&self, key: &str) -> &[Entry<'a, P, R>] {
        self.slots.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any entry is registered under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Number of keys with at least one entry.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<'a, P: Slotted, R: Restriction<P>> Default for SlotConflictTracker<'a, P, R> {
    fn default() -> Self {
        Self::new()
    }
}
