//! Storage and naming services for hierarchical nodes.
//!
//! A [`Model`] assumes node names form a hierarchy, like path names: they are
//! given either as a separator-joined string or as explicit segments. The
//! model owns a `Key -> Name` map and a `Key -> Node` map over the same
//! domain, delegates identity to a [`PathHash`], and routes every
//! registration conflict through its [`Patch`] policy.

use ahash::HashMap;
use regex::Regex;

use crate::key::{Key, PathHash};
use crate::node::{Node, Patch, Replace, Unresolved};

/// Default level separator.
pub const SEPARATOR: char = '.';

/// A model address: a separator-joined name or an explicit segment sequence.
///
/// Exactly one spelling is supplied per call; the model derives the other by
/// splitting or joining on its separator.
#[derive(Debug, Clone, Copy)]
pub enum Path<'a> {
    /// Separator-joined form, split on the model's separator.
    Name(&'a str),
    /// Explicit segments, joined with the model's separator to form the name.
    Segments(&'a [&'a str]),
}

impl<'a> From<&'a str> for Path<'a> {
    fn from(name: &'a str) -> Self {
        Path::Name(name)
    }
}

impl<'a> From<&'a [&'a str]> for Path<'a> {
    fn from(segments: &'a [&'a str]) -> Self {
        Path::Segments(segments)
    }
}

impl<'a, const N: usize> From<&'a [&'a str; N]> for Path<'a> {
    fn from(segments: &'a [&'a str; N]) -> Self {
        Path::Segments(segments)
    }
}

/// Hierarchical node storage with aliasing and conflict patching.
pub struct Model<N, P = Replace> {
    separator: char,
    hash: PathHash,
    names: HashMap<Key, String>,
    nodes: HashMap<Key, Node<N>>,
    patch: P,
}

impl<N> Model<N, Replace> {
    /// Create an empty model with the default separator and policy.
    pub fn new() -> Self {
        Self::with_patch(Replace)
    }
}

impl<N> Default for Model<N, Replace> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, P: Patch<N>> Model<N, P> {
    /// Create an empty model with a custom conflict policy.
    pub fn with_patch(patch: P) -> Self {
        Self {
            separator: SEPARATOR,
            hash: PathHash::new(),
            names: HashMap::default(),
            nodes: HashMap::default(),
            patch,
        }
    }

    /// Use `separator` to split names and join segments.
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// The model's level separator.
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if nothing has been registered or resolved yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over the registered nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<N>> {
        self.nodes.values()
    }

    /// Derive the canonical key and the stored-name spelling for `path`.
    fn address(&mut self, path: Path<'_>) -> (Key, String) {
        let separator = self.separator;
        match path {
            Path::Name(name) => (self.hash.hash(name.split(separator)), name.to_owned()),
            Path::Segments(segments) => {
                let name = segments.join(separator.to_string().as_str());
                (self.hash.hash(segments.iter().copied()), name)
            }
        }
    }

    /// Register `node` under `path` and return its key.
    ///
    /// The first insertion under a key stores directly. A later insertion
    /// stores `patch(old, new)` instead of overwriting. The stored name is
    /// first-writer-wins: when multiple names hash to the same key, later
    /// registrations never alter the name database, which is what keeps
    /// aliases reporting their canonical spelling.
    pub fn register<'p>(&mut self, node: N, path: impl Into<Path<'p>>) -> Key {
        let (key, name) = self.address(path.into());
        match self.nodes.remove(&key) {
            None => {
                tracing::trace!(name = %name, ?key, "register");
                self.names.insert(key, name);
                self.nodes.insert(key, Node::Bound(node));
            }
            Some(existing) => {
                tracing::trace!(name = %name, ?key, "register: patching duplicate");
                let winner = self.patch.patch(existing, Node::Bound(node));
                self.nodes.insert(key, winner);
            }
        }
        key
    }

    /// Find the node at `path`.
    ///
    /// Resolution never fails: if nothing is registered there yet, an
    /// [`Unresolved`] placeholder carrying the queried name is synthesized
    /// and registered as a side effect, so future resolutions of the same
    /// name see the same placeholder until a real registration supersedes it
    /// through the normal [`Patch`] path.
    pub fn resolve<'p>(&mut self, path: impl Into<Path<'p>>) -> &Node<N> {
        let (key, name) = self.address(path.into());
        self.names.entry(key).or_insert_with(|| name.clone());
        self.nodes.entry(key).or_insert_with(|| {
            tracing::trace!(name = %name, ?key, "resolve: synthesizing placeholder");
            Node::Unresolved(Unresolved::new(name))
        })
    }

    /// Declare `alias` an alternate spelling of `canonical`.
    ///
    /// Delegates the identity merge to the hash store, then reconciles the
    /// maps so exactly one name/node pair survives under the canonical key:
    /// the alias entries are deleted first in all cases; a node that lived
    /// only under the alias becomes the canonical entry (pure rename); if
    /// both keys held nodes, the canonical entry becomes
    /// `patch(alias_node, canonical_node)`.
    ///
    /// Returns the pre-merge `(alias, canonical)` keys. Idempotent.
    pub fn alias<'a, 'c>(
        &mut self,
        alias: impl Into<Path<'a>>,
        canonical: impl Into<Path<'c>>,
    ) -> (Key, Key) {
        let (alias_key, alias_name) = self.address(alias.into());
        let (canonical_key, canonical_name) = self.address(canonical.into());
        self.hash.merge(alias_key, canonical_key);
        if alias_key == canonical_key {
            // already merged; nothing to reconcile
            return (alias_key, canonical_key);
        }
        tracing::debug!(alias = %alias_name, canonical = %canonical_name, "alias");
        self.names.remove(&alias_key);
        let Some(alias_node) = self.nodes.remove(&alias_key) else {
            // nothing lived under the alias; a later registration arrives at
            // the canonical key and goes through the normal patch path
            return (alias_key, canonical_key);
        };
        match self.nodes.remove(&canonical_key) {
            None => {
                // pure rename
                self.names.insert(canonical_key, canonical_name);
                self.nodes.insert(canonical_key, alias_node);
            }
            Some(canonical_node) => {
                let winner = self.patch.patch(alias_node, canonical_node);
                self.nodes.insert(canonical_key, winner);
            }
        }
        (alias_key, canonical_key)
    }

    /// Iterate the `(name, node)` pairs whose keys strictly descend from
    /// `root`, each aliased descendant contributing exactly once.
    pub fn children<'p>(
        &mut self,
        root: impl Into<Path<'p>>,
    ) -> impl Iterator<Item = (&str, &Node<N>)> {
        let (key, _) = self.address(root.into());
        let descendants = self.hash.descendants(key);
        let names = &self.names;
        let nodes = &self.nodes;
        descendants
            .into_iter()
            .filter_map(move |key| Some((names.get(&key)?.as_str(), nodes.get(&key)?)))
    }

    /// Diagnostic listing of the entries whose name matches `pattern`,
    /// sorted by name. `None` matches everything.
    pub fn dump(&self, pattern: Option<&str>) -> Result<Vec<(&str, &Node<N>)>, regex::Error> {
        let regex = Regex::new(pattern.unwrap_or(""))?;
        let mut entries: Vec<_> = self
            .nodes
            .iter()
            .filter_map(|(key, node)| {
                let name = self.names.get(key)?;
                regex.is_match(name).then_some((name.as_str(), node))
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_segments_address_the_same_entry() {
        let mut model = Model::new();
        let key = model.register('a', &["pkg", "flag"]);
        assert_eq!(model.resolve("pkg.flag").bound(), Some(&'a'));
        assert_eq!(model.register('a', "pkg.flag"), key);
    }

    #[test]
    fn custom_separator_splits_and_joins() {
        let mut model = Model::new().with_separator('/');
        model.register(1u8, "etc/config");
        assert_eq!(model.resolve(&["etc", "config"]).bound(), Some(&1));
        let dump = model.dump(None).unwrap();
        assert_eq!(dump[0].0, "etc/config");
    }

    #[test]
    fn maps_share_the_same_domain() {
        let mut model = Model::new();
        model.register(1u8, "a.b");
        model.resolve("c.d");
        model.alias("x", "a");
        assert_eq!(model.len(), 2);
        assert_eq!(model.dump(None).unwrap().len(), 2);
    }

    #[test]
    fn dump_filters_by_pattern_and_sorts() {
        let mut model = Model::new();
        model.register(1u8, "pkg.beta");
        model.register(2u8, "pkg.alpha");
        model.register(3u8, "other.gamma");
        let entries = model.dump(Some("pkg")).unwrap();
        let names: Vec<_> = entries.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["pkg.alpha", "pkg.beta"]);
        assert!(model.dump(Some("[")).is_err());
    }

    #[test]
    fn stored_name_is_first_writer_wins() {
        let mut model = Model::new();
        model.register(1u8, "a.b");
        model.alias("x.y", "a.b");
        model.register(2u8, "x.y");
        let entries = model.dump(None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "a.b");
        assert_eq!(entries[0].1.bound(), Some(&2));
    }
}
