//! Tests for plain and tri-state selection.

mod common;

use bough::prelude::*;
use common::{drain, init_logging, node, sample_records};
use serde_json::json;

fn tri_state_tree() -> Tree<Value> {
    init_logging();
    Tree::with_records(sample_records(), TreeOptions::new().tri_state(true))
}

// =============================================================================
// Plain selection
// =============================================================================

#[test]
fn test_plain_selection_is_stored_on_every_node() {
    let tree = common::sample_tree();
    let a = node(&tree, "a");

    assert!(a.is_selectable());
    a.set_is_selected(true);
    assert!(a.is_selected());
    assert!(a.is_all_selected());
    assert!(!a.is_partially_selected());
    assert!(!node(&tree, "a1").is_selected());
}

#[test]
fn test_toggle_selected() {
    let tree = common::sample_tree();
    let b = node(&tree, "b");
    b.toggle_selected();
    assert!(b.is_selected());
    b.toggle_selected();
    assert!(!b.is_selected());
}

#[test]
fn test_selection_events() {
    let tree = common::sample_tree();
    let mut events = tree.subscribe();
    let b = node(&tree, "b");
    b.set_is_selected(true);
    b.set_is_selected(true);
    b.set_is_selected(false);

    assert_eq!(
        drain(&mut events),
        vec![
            TreeEvent::new(TreeEventKind::Select, "b"),
            TreeEvent::new(TreeEventKind::Deselect, "b"),
        ]
    );
}

// =============================================================================
// Tri-state
// =============================================================================

#[test]
fn test_parents_are_not_selectable() {
    let tree = tri_state_tree();
    assert!(!node(&tree, "a").is_selectable());
    assert!(!node(&tree, "a1").is_selectable());
    assert!(node(&tree, "a1x").is_selectable());
    assert!(node(&tree, "b").is_selectable());
}

#[test]
fn test_unloaded_parent_is_selectable() {
    init_logging();
    let tree = Tree::with_records(
        vec![json!({ "id": "lazy", "hasChildren": true })],
        TreeOptions::new().tri_state(true),
    );
    let lazy = node(&tree, "lazy");
    assert!(lazy.is_selectable());
    lazy.set_is_selected(true);
    assert!(tree.selected_ids().contains(&NodeId::from("lazy")));
}

#[test]
fn test_parent_selection_fans_out() {
    let tree = tri_state_tree();
    let c = node(&tree, "c");
    c.set_is_selected(true);

    assert!(node(&tree, "c1").is_selected());
    assert!(c.is_selected());
    assert!(c.is_all_selected());
    assert!(!c.is_partially_selected());
    // The parent itself is never stored.
    assert!(!tree.selected_ids().contains(&NodeId::from("c")));
}

#[test]
fn test_deselecting_one_child_makes_parent_partial() {
    init_logging();
    let tree = Tree::with_records(
        vec![json!({ "id": "p", "children": [{ "id": "x" }, { "id": "y" }] })],
        TreeOptions::new().tri_state(true),
    );
    let p = node(&tree, "p");
    p.set_is_selected(true);
    assert!(node(&tree, "x").is_selected());
    assert!(node(&tree, "y").is_selected());
    assert!(p.is_all_selected());
    assert!(!p.is_partially_selected());

    node(&tree, "y").set_is_selected(false);
    assert!(p.is_selected());
    assert!(!p.is_all_selected());
    assert!(p.is_partially_selected());
}

#[test]
fn test_selection_is_recursive() {
    let tree = tri_state_tree();
    let a = node(&tree, "a");
    a.set_is_selected(true);
    for id in ["a1x", "a1y", "a2"] {
        assert!(node(&tree, id).is_selected(), "{}", id);
    }
    assert!(node(&tree, "a1").is_all_selected());

    node(&tree, "a1x").set_is_selected(false);
    assert!(node(&tree, "a1").is_partially_selected());
    assert!(a.is_partially_selected());
}

#[test]
fn test_toggle_selected_on_partial_parent_clears() {
    let tree = tri_state_tree();
    node(&tree, "a2").set_is_selected(true);
    let a = node(&tree, "a");
    assert!(a.is_partially_selected());

    a.toggle_selected();
    assert!(tree.selected_ids().is_empty());
}

#[test]
fn test_fan_out_skips_hidden_children() {
    let tree = tri_state_tree();
    node(&tree, "a2").hide();
    let a = node(&tree, "a");
    a.set_is_selected(true);

    assert!(!node(&tree, "a2").is_selected());
    assert!(node(&tree, "a1x").is_selected());
    // Reading "selected" looks at visible children, "all selected" at all.
    assert!(a.is_selected());
    assert!(!a.is_all_selected());
    assert!(a.is_partially_selected());
}

#[test]
fn test_selected_read_ignores_hidden_children() {
    let tree = tri_state_tree();
    node(&tree, "a2").set_is_selected(true);
    node(&tree, "a2").hide();
    assert!(!node(&tree, "a").is_selected());
}

#[test]
fn test_partial_implies_selected_everywhere() {
    let tree = tri_state_tree();
    node(&tree, "a1y").set_is_selected(true);
    node(&tree, "c1").set_is_selected(true);

    for id in ["a", "a1", "a1x", "a1y", "a2", "b", "c", "c1"] {
        let n = node(&tree, id);
        assert_eq!(
            n.is_partially_selected(),
            n.is_selected() && !n.is_all_selected(),
            "{}",
            id
        );
        if n.is_selectable() {
            assert!(!n.is_partially_selected(), "{}", id);
        }
    }
}
