//! Interned hierarchical identities with alias merging.
//!
//! A [`PathHash`] converts an ordered sequence of name segments into a
//! canonical [`Key`] by walking a trie of slots. Aliasing merges one identity
//! (and, recursively, its whole subtree) into another: merged slots are never
//! deleted, they redirect, so the key space only grows or merges and never
//! loses reachability.

use ahash::{HashMap, HashSet};
use slab::Slab;

/// Canonical identity of a hierarchical name.
///
/// Keys are cheap handles: `Copy`, comparable, hashable. Two segment
/// sequences that have been aliased to each other hash to the same `Key`
/// from the moment of the merge onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(pub(crate) usize);

#[derive(Default)]
struct Slot {
    children: HashMap<String, usize>,
    /// Set once this identity has been merged into another.
    redirect: Option<usize>,
}

/// The hash/alias store: a slab-backed trie of identity slots.
pub struct PathHash {
    slots: Slab<Slot>,
    root: usize,
}

impl Default for PathHash {
    fn default() -> Self {
        Self::new()
    }
}

impl PathHash {
    /// Create an empty store.
    pub fn new() -> Self {
        let mut slots = Slab::new();
        let root = slots.insert(Slot::default());
        Self { slots, root }
    }

    /// Follow redirects to the live slot for `at`.
    fn chase(&self, mut at: usize) -> usize {
        while let Some(next) = self.slots[at].redirect {
            at = next;
        }
        at
    }

    /// Intern `segments` and return their canonical key.
    ///
    /// Deterministic: equal sequences (after any applicable merges) yield
    /// identical keys. The input is iterated exactly once, so single-pass
    /// iterators are fine.
    pub fn hash<I>(&mut self, segments: I) -> Key
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut at = self.root;
        for segment in segments {
            let segment = segment.as_ref();
            at = self.chase(at);
            let existing = self.slots[at].children.get(segment).copied();
            at = match existing {
                Some(child) => child,
                None => {
                    let child = self.slots.insert(Slot::default());
                    self.slots[at].children.insert(segment.to_owned(), child);
                    child
                }
            };
        }
        Key(self.chase(at))
    }

    /// Declare `alias` an alternate spelling of `canonical` and merge the two
    /// identities, subtrees included. Returns the pre-merge
    /// `(alias, canonical)` keys; hashing either path afterwards yields the
    /// canonical key. Idempotent under repeated application.
    pub fn alias<A, C>(&mut self, alias: A, canonical: C) -> (Key, Key)
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let alias_key = self.hash(alias);
        let canonical_key = self.hash(canonical);
        self.merge(alias_key, canonical_key);
        (alias_key, canonical_key)
    }

    /// Merge the identity `from` into `to`.
    pub fn merge(&mut self, from: Key, to: Key) {
        self.merge_slots(from.0, to.0);
    }

    fn merge_slots(&mut self, from: usize, to: usize) {
        let from = self.chase(from);
        let to = self.chase(to);
        if from == to {
            return;
        }
        let children = std::mem::take(&mut self.slots[from].children);
        self.slots[from].redirect = Some(to);
        for (segment, child) in children {
            let existing = self.slots[to].children.get(&segment).copied();
            match existing {
                Some(present) => self.merge_slots(child, present),
                None => {
                    self.slots[to].children.insert(segment, child);
                }
            }
        }
    }

    /// The unique live keys strictly below `root`.
    ///
    /// Aliased descendants contribute one entry each.
    pub fn descendants(&self, root: Key) -> Vec<Key> {
        let root = self.chase(root.0);
        let mut seen = HashSet::default();
        let mut stack: Vec<usize> = self.slots[root]
            .children
            .values()
            .map(|&child| self.chase(child))
            .collect();
        let mut keys = Vec::new();
        while let Some(at) = stack.pop() {
            if !seen.insert(at) {
                continue;
            }
            keys.push(Key(at));
            stack.extend(self.slots[at].children.values().map(|&child| self.chase(child)));
        }
        keys
    }
}
