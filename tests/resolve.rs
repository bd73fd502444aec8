//! Model scenarios: registration, placeholder resolution, aliasing.

use pathflow::{Model, Node};

#[test]
fn distinct_keys_resolve_to_their_registered_nodes() {
    let mut model = Model::new();
    model.register("one", "a.b");
    model.register("two", "a.c");
    model.register("three", "d");

    assert_eq!(model.resolve("a.b").bound(), Some(&"one"));
    assert_eq!(model.resolve("a.c").bound(), Some(&"two"));
    assert_eq!(model.resolve("d").bound(), Some(&"three"));
}

#[test]
fn segments_and_names_are_interchangeable() {
    // separator '.', register under ('a', 'b'), resolve by name, alias,
    // resolve by segments
    let mut model = Model::new();
    model.register("node-a", &["a", "b"]);
    assert_eq!(model.resolve("a.b").bound(), Some(&"node-a"));

    model.alias("x.y", "a.b");
    assert_eq!(model.resolve(&["x", "y"]).bound(), Some(&"node-a"));
}

#[test]
fn resolving_an_unknown_name_registers_a_placeholder() {
    let mut model: Model<&str> = Model::new();
    let first = model.resolve("not.yet").clone();
    assert!(first.is_unresolved());
    match &first {
        Node::Unresolved(placeholder) => assert_eq!(placeholder.name(), "not.yet"),
        Node::Bound(_) => unreachable!(),
    }
    // the placeholder is registered, so the second resolution is identical
    assert_eq!(model.resolve("not.yet"), &first);
}

#[test]
fn a_registration_supersedes_the_placeholder_through_patch() {
    let mut model = Model::new();
    model.resolve("late.binding");
    model.register("real", "late.binding");

    let node = model.resolve("late.binding");
    assert!(!node.is_unresolved());
    assert_eq!(node.bound(), Some(&"real"));
}

#[test]
fn duplicate_registration_goes_through_patch_not_overwrite() {
    // the policy keeps the incumbent, which is observable only if patch was
    // actually consulted
    let calls = std::cell::RefCell::new(Vec::new());
    let mut model = Model::with_patch(|old: Node<&'static str>, new: Node<&'static str>| {
        calls.borrow_mut().push((old.bound().copied(), new.bound().copied()));
        old
    });
    model.register("first", &["p"]);
    model.register("second", &["p"]);

    assert_eq!(model.resolve(&["p"]).bound(), Some(&"first"));
    assert_eq!(
        calls.borrow().as_slice(),
        [(Some("first"), Some("second"))]
    );
}

#[test]
fn alias_is_order_independent() {
    // registration before the alias
    let mut before = Model::new();
    before.register("node-a", "a.b");
    before.alias("x.y", "a.b");
    assert_eq!(before.resolve("x.y").bound(), Some(&"node-a"));
    assert_eq!(before.resolve("a.b").bound(), Some(&"node-a"));

    // alias before the registration
    let mut after = Model::new();
    after.alias("x.y", "a.b");
    after.register("node-a", "a.b");
    assert_eq!(after.resolve("x.y").bound(), Some(&"node-a"));

    // registration under the alias spelling only: pure rename
    let mut renamed = Model::new();
    renamed.register("node-a", "x.y");
    renamed.alias("x.y", "a.b");
    assert_eq!(renamed.resolve("a.b").bound(), Some(&"node-a"));
    assert_eq!(renamed.resolve("x.y").bound(), Some(&"node-a"));
}

#[test]
fn alias_with_nodes_on_both_sides_patches_them() {
    let mut model = Model::new();
    model.register("under-alias", "x.y");
    model.register("under-canonical", "a.b");
    model.alias("x.y", "a.b");

    // default policy: the arrival (canonical node) wins
    assert_eq!(model.resolve("a.b").bound(), Some(&"under-canonical"));
    assert_eq!(model.resolve("x.y").bound(), Some(&"under-canonical"));
    // exactly one entry survives
    assert_eq!(model.len(), 1);
}

#[test]
fn alias_is_idempotent() {
    let mut model = Model::new();
    model.register("node-a", "a.b");
    model.alias("x.y", "a.b");
    model.alias("x.y", "a.b");

    assert_eq!(model.len(), 1);
    assert_eq!(model.resolve("x.y").bound(), Some(&"node-a"));
}

#[test]
fn children_deduplicate_aliased_descendants() {
    let mut model = Model::new();
    model.register("left", "root.a");
    model.register("right", "root.b");
    model.alias("root.c", "root.a");

    let mut names: Vec<String> = model
        .children("root")
        .map(|(name, _)| name.to_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["root.a", "root.b"]);
}

#[test]
fn children_are_strict_descendants() {
    let mut model = Model::new();
    model.register("top", "root");
    model.register("deep", "root.sub.leaf");

    let entries: Vec<_> = model.children("root").map(|(name, _)| name.to_owned()).collect();
    assert!(!entries.contains(&"root".to_owned()));
    assert!(entries.contains(&"root.sub.leaf".to_owned()));
}

#[test]
fn placeholder_patching_applies_on_alias_too() {
    let mut model = Model::new();
    model.resolve("x.y");
    model.register("real", "a.b");
    model.alias("x.y", "a.b");

    // Replace keeps the bound node over the placeholder
    assert_eq!(model.resolve("x.y").bound(), Some(&"real"));
    assert_eq!(model.len(), 1);
}

#[test]
fn placeholders_carry_the_queried_name() {
    let mut model: Model<u8> = Model::new();
    let placeholder = model.resolve("exactly.this").clone();
    match placeholder {
        Node::Unresolved(unresolved) => assert_eq!(unresolved.name(), "exactly.this"),
        Node::Bound(_) => unreachable!(),
    }
}
