//! Tests for lazy child loading.

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use bough::prelude::*;
use common::{calls, counting_source, drain, ids, init_logging, next_event, node, two_leaves};
use serde_json::json;

fn lazy_tree(calls: &Arc<AtomicUsize>, options: TreeOptions<Value>) -> Tree<Value> {
    init_logging();
    Tree::with_records(
        vec![json!({ "id": "lazy", "hasChildren": true }), json!({ "id": "leaf" })],
        options.child_source(counting_source(calls.clone(), two_leaves)),
    )
}

// =============================================================================
// Explicit loads
// =============================================================================

#[tokio::test]
async fn test_load_node_children_materializes_records() {
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = lazy_tree(&counter, TreeOptions::new());
    let lazy = node(&tree, "lazy");
    let mut events = tree.subscribe();

    lazy.load_node_children().await.unwrap();

    assert_eq!(calls(&counter), 1);
    assert_eq!(lazy.load_state(), LoadState::Loaded);
    assert_eq!(ids(&lazy.children().unwrap()), vec!["lazy/one", "lazy/two"]);
    assert_eq!(node(&tree, "lazy/two").index(), 1);
    // Records are stored back into the parent.
    assert_eq!(lazy.data().unwrap()["children"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        drain(&mut events),
        vec![TreeEvent::new(TreeEventKind::LoadNodeChildren, "lazy")]
    );
}

#[tokio::test]
async fn test_load_without_source_resolves_immediately() {
    init_logging();
    let tree = Tree::with_records(vec![json!({ "id": "lazy", "hasChildren": true })], TreeOptions::new());
    let lazy = node(&tree, "lazy");

    lazy.load_node_children().await.unwrap();

    assert!(lazy.children().is_none());
    assert_eq!(lazy.load_state(), LoadState::NotLoaded);
}

#[tokio::test]
async fn test_empty_load_still_fires_event() {
    init_logging();
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = Tree::with_records(
        vec![json!({ "id": "lazy", "hasChildren": true })],
        TreeOptions::new().child_source(counting_source(counter.clone(), |_| Ok(Vec::new()))),
    );
    let mut events = tree.subscribe();
    let lazy = node(&tree, "lazy");

    lazy.load_node_children().await.unwrap();

    assert_eq!(lazy.children(), Some(Vec::new()));
    assert_eq!(drain(&mut events).len(), 1);
}

#[tokio::test]
async fn test_failed_load_resets_state() {
    init_logging();
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = Tree::with_records(
        vec![json!({ "id": "lazy", "hasChildren": true })],
        TreeOptions::new().child_source(counting_source(counter.clone(), |id| {
            Err(TreeError::load(id.clone(), "offline"))
        })),
    );
    let lazy = node(&tree, "lazy");

    let err = lazy.load_node_children().await.unwrap_err();

    assert_eq!(err, TreeError::load("lazy", "offline"));
    assert_eq!(lazy.load_state(), LoadState::NotLoaded);
    assert!(lazy.children().is_none());
}

#[tokio::test]
async fn test_explicit_reload_refreshes() {
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = lazy_tree(&counter, TreeOptions::new());
    let lazy = node(&tree, "lazy");

    lazy.load_node_children().await.unwrap();
    node(&tree, "lazy/one").set_is_selected(true);
    lazy.load_node_children().await.unwrap();

    assert_eq!(calls(&counter), 2);
    assert_eq!(tree.len(), 4);
    // State of children that come back is kept.
    assert!(node(&tree, "lazy/one").is_selected());
}

// =============================================================================
// Single flight
// =============================================================================

#[tokio::test]
async fn test_concurrent_loads_share_one_fetch() {
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = lazy_tree(&counter, TreeOptions::new());
    let lazy = node(&tree, "lazy");

    let (first, second) = tokio::join!(lazy.load_node_children(), lazy.load_node_children());

    assert!(first.is_ok() && second.is_ok());
    assert_eq!(calls(&counter), 1);
}

#[tokio::test]
async fn test_toggling_expansion_does_not_refetch() {
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = lazy_tree(&counter, TreeOptions::new());
    let lazy = node(&tree, "lazy");

    lazy.expand();
    lazy.collapse();
    lazy.expand();
    assert_eq!(lazy.load_state(), LoadState::Loading);

    // Joins the load the expansion started.
    lazy.load_node_children().await.unwrap();
    assert_eq!(calls(&counter), 1);
    assert_eq!(lazy.load_state(), LoadState::Loaded);

    lazy.collapse();
    lazy.expand();
    assert_eq!(calls(&counter), 1);
}

// =============================================================================
// Auto-load
// =============================================================================

#[tokio::test]
async fn test_expanding_loads_in_background() {
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = lazy_tree(&counter, TreeOptions::new());
    let mut events = tree.subscribe();
    let lazy = node(&tree, "lazy");
    assert_eq!(calls(&counter), 0);

    lazy.expand();
    assert_eq!(calls(&counter), 1);
    assert!(lazy.children().is_none());

    let event = next_event(&mut events, TreeEventKind::LoadNodeChildren).await;
    assert_eq!(event.node.as_str(), "lazy");
    assert_eq!(lazy.children().map(|c| c.len()), Some(2));
}

#[tokio::test]
async fn test_expanded_record_loads_at_construction() {
    init_logging();
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = Tree::with_records(
        vec![json!({
            "id": "root",
            "children": [{ "id": "sub", "hasChildren": true, "isExpanded": true }]
        })],
        TreeOptions::new().child_source(counting_source(counter.clone(), two_leaves)),
    );
    let mut events = tree.subscribe();
    let sub = node(&tree, "sub");

    // No explicit expand: the reaction fired while the node was built.
    assert_eq!(calls(&counter), 1);
    assert!(sub.is_expanded());
    assert_eq!(sub.load_state(), LoadState::Loading);

    next_event(&mut events, TreeEventKind::LoadNodeChildren).await;
    assert_eq!(ids(&sub.children().unwrap()), vec!["sub/one", "sub/two"]);
}

#[tokio::test]
async fn test_loaded_children_marked_expanded_load_too() {
    init_logging();
    let counter = Arc::new(AtomicUsize::new(0));
    let source = counting_source(counter.clone(), |id| {
        if id.as_str() == "top" {
            Ok(vec![json!({ "id": "nested", "hasChildren": true, "isExpanded": true })])
        } else {
            two_leaves(id)
        }
    });
    let tree = Tree::with_records(
        vec![json!({ "id": "top", "hasChildren": true })],
        TreeOptions::new().child_source(source),
    );
    let mut events = tree.subscribe();

    node(&tree, "top").expand();
    let first = next_event(&mut events, TreeEventKind::LoadNodeChildren).await;
    let second = next_event(&mut events, TreeEventKind::LoadNodeChildren).await;

    assert_eq!(first.node.as_str(), "top");
    assert_eq!(second.node.as_str(), "nested");
    assert!(node(&tree, "nested").is_expanded());
    assert_eq!(calls(&counter), 2);
    assert!(tree.contains(&NodeId::from("nested/two")));
}

#[tokio::test]
async fn test_disposed_node_discards_late_load() {
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = lazy_tree(&counter, TreeOptions::new());
    let mut events = tree.subscribe();
    let lazy = node(&tree, "lazy");

    lazy.expand();
    lazy.dispose();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(calls(&counter), 1);
    assert!(!tree.contains(&NodeId::from("lazy/one")));
    assert!(
        drain(&mut events)
            .iter()
            .all(|event| event.kind != TreeEventKind::LoadNodeChildren)
    );
    assert!(!tree.expanded_ids().contains(&NodeId::from("lazy")));
}

#[tokio::test]
async fn test_rename_during_load_restarts_it() {
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = lazy_tree(&counter, TreeOptions::new());
    let mut events = tree.subscribe();
    let mut lazy = node(&tree, "lazy");

    lazy.expand();
    assert_eq!(calls(&counter), 1);
    lazy.set_id("renamed").unwrap();

    // The expanded node reloads under its new id.
    assert_eq!(calls(&counter), 2);
    let event = next_event(&mut events, TreeEventKind::LoadNodeChildren).await;
    assert_eq!(event.node.as_str(), "renamed");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(lazy.load_state(), LoadState::Loaded);
    assert_eq!(ids(&lazy.children().unwrap()), vec!["renamed/one", "renamed/two"]);
    assert!(!tree.contains(&NodeId::from("lazy/one")));
}

#[tokio::test]
async fn test_rename_collapsed_node_during_load() {
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = lazy_tree(&counter, TreeOptions::new());
    let mut lazy = node(&tree, "lazy");

    lazy.expand();
    lazy.collapse();
    lazy.set_id("renamed").unwrap();
    assert_eq!(lazy.load_state(), LoadState::NotLoaded);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(lazy.children().is_none());

    lazy.load_node_children().await.unwrap();
    assert_eq!(calls(&counter), 2);
    assert_eq!(lazy.load_state(), LoadState::Loaded);
    assert_eq!(lazy.children().map(|c| c.len()), Some(2));
}

#[test]
fn test_without_runtime_load_is_abandoned() {
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = lazy_tree(&counter, TreeOptions::new());
    let lazy = node(&tree, "lazy");

    lazy.expand();

    assert!(lazy.is_expanded());
    assert!(lazy.children().is_none());
    assert_eq!(lazy.load_state(), LoadState::NotLoaded);
}

// =============================================================================
// Selection and bulk expansion
// =============================================================================

#[tokio::test]
async fn test_selection_moves_onto_loaded_children() {
    let counter = Arc::new(AtomicUsize::new(0));
    let tree = lazy_tree(&counter, TreeOptions::new().tri_state(true));
    let lazy = node(&tree, "lazy");

    lazy.set_is_selected(true);
    assert!(tree.selected_ids().contains(&NodeId::from("lazy")));

    lazy.load_node_children().await.unwrap();

    assert!(!lazy.is_selectable());
    assert!(node(&tree, "lazy/one").is_selected());
    assert!(node(&tree, "lazy/two").is_selected());
    assert!(lazy.is_all_selected());
    assert!(!tree.selected_ids().contains(&NodeId::from("lazy")));
}

#[tokio::test]
async fn test_expand_all_loads_lazy_subtrees() {
    init_logging();
    let counter = Arc::new(AtomicUsize::new(0));
    let source = counting_source(counter.clone(), |id| {
        if id.as_str() == "top" {
            Ok(vec![json!({ "id": "mid", "hasChildren": true }), json!({ "id": "end" })])
        } else {
            two_leaves(id)
        }
    });
    let tree = Tree::with_records(
        vec![json!({ "id": "top", "hasChildren": true })],
        TreeOptions::new().child_source(source),
    );

    tree.expand_all().await;

    assert_eq!(calls(&counter), 2);
    assert!(node(&tree, "top").is_expanded());
    assert!(node(&tree, "mid").is_expanded());
    assert_eq!(tree.len(), 5);
}

#[tokio::test]
async fn test_do_for_all_visits_in_order() {
    let tree = common::sample_tree();
    let visited = Arc::new(std::sync::Mutex::new(Vec::new()));

    let seen = visited.clone();
    node(&tree, "a")
        .do_for_all(move |n| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(n.id().to_string());
            }
        })
        .await;

    assert_eq!(*visited.lock().unwrap(), vec!["a", "a1", "a1x", "a1y", "a2"]);
}
