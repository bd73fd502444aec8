//! Model entries and the duplicate-registration policy.

/// Placeholder registered when a name is resolved before any definition.
///
/// The placeholder is itself stored in the model, so repeated resolutions of
/// the same name see the identical placeholder until a real registration
/// supersedes it through the normal [`Patch`] path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    name: String,
}

impl Unresolved {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The name that was queried.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A value stored in the model under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<N> {
    /// A registered evaluator.
    Bound(N),
    /// A name that has been resolved but not yet defined.
    Unresolved(Unresolved),
}

impl<N> Node<N> {
    /// The bound evaluator, if any.
    pub fn bound(&self) -> Option<&N> {
        match self {
            Node::Bound(node) => Some(node),
            Node::Unresolved(_) => None,
        }
    }

    /// True for placeholder entries.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Node::Unresolved(_))
    }
}

/// Conflict-resolution policy consulted whenever two nodes land on one key.
///
/// Registration and alias merges never overwrite silently; the policy sees
/// the incumbent and the arrival and returns the survivor.
pub trait Patch<N> {
    /// Decide which node survives. `old` is the incumbent, `new` the arrival.
    fn patch(&mut self, old: Node<N>, new: Node<N>) -> Node<N>;
}

impl<N, F> Patch<N> for F
where
    F: FnMut(Node<N>, Node<N>) -> Node<N>,
{
    fn patch(&mut self, old: Node<N>, new: Node<N>) -> Node<N> {
        self(old, new)
    }
}

/// Default policy: the arrival wins, except that a placeholder never
/// displaces a bound node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Replace;

impl<N> Patch<N> for Replace {
    fn patch(&mut self, old: Node<N>, new: Node<N>) -> Node<N> {
        match (old, new) {
            (old @ Node::Bound(_), Node::Unresolved(_)) => old,
            (_, new) => new,
        }
    }
}

/// First-writer-wins policy: the incumbent survives, except that a bound
/// arrival always supersedes a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Keep;

impl<N> Patch<N> for Keep {
    fn patch(&mut self, old: Node<N>, new: Node<N>) -> Node<N> {
        match (old, new) {
            (Node::Unresolved(_), new @ Node::Bound(_)) => new,
            (old, _) => old,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_prefers_the_arrival() {
        let mut policy = Replace;
        assert_eq!(policy.patch(Node::Bound(1), Node::Bound(2)), Node::Bound(2));
    }

    #[test]
    fn replace_never_demotes_to_a_placeholder() {
        let mut policy = Replace;
        let winner = policy.patch(Node::Bound(1), Node::Unresolved(Unresolved::new("a")));
        assert_eq!(winner, Node::Bound(1));
    }

    #[test]
    fn keep_prefers_the_incumbent_unless_it_is_a_placeholder() {
        let mut policy = Keep;
        assert_eq!(policy.patch(Node::Bound(1), Node::Bound(2)), Node::Bound(1));
        assert_eq!(
            policy.patch(Node::Unresolved(Unresolved::new("a")), Node::Bound(2)),
            Node::Bound(2)
        );
    }
}
