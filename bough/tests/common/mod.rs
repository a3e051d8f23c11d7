//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bough::field::{Field, FieldMapping, FieldValue, TreeRecord};
use bough::prelude::*;
use futures::future::BoxFuture;
use serde_json::json;
use simplelog::{Config, LevelFilter, TestLogger};
use tokio::sync::broadcast;

pub fn init_logging() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

/// A typed record that ignores the field mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub id: Option<NodeId>,
    pub name: String,
    pub lazy: bool,
    pub open: bool,
    pub children: Option<Vec<Folder>>,
}

impl Folder {
    pub fn new(id: &str) -> Self {
        Self {
            id: Some(NodeId::from(id)),
            name: id.to_uppercase(),
            lazy: false,
            open: false,
            children: None,
        }
    }

    pub fn with_children(mut self, children: Vec<Folder>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }
}

impl TreeRecord for Folder {
    fn get_field(&self, _: &FieldMapping, field: Field) -> Option<FieldValue<Self>> {
        match field {
            Field::Id => self.id.clone().map(FieldValue::Id),
            Field::Display => Some(FieldValue::Text(self.name.clone())),
            Field::Children => self.children.clone().map(FieldValue::Records),
            Field::HasChildren => Some(FieldValue::Flag(self.lazy)),
            Field::IsExpanded => Some(FieldValue::Flag(self.open)),
        }
    }

    fn set_field(&mut self, _: &FieldMapping, field: Field, value: FieldValue<Self>) {
        match (field, value) {
            (Field::Id, FieldValue::Id(id)) => self.id = Some(id),
            (Field::Display, FieldValue::Text(name)) => self.name = name,
            (Field::Children, FieldValue::Records(records)) => self.children = Some(records),
            (Field::HasChildren, FieldValue::Flag(flag)) => self.lazy = flag,
            (Field::IsExpanded, FieldValue::Flag(flag)) => self.open = flag,
            _ => {}
        }
    }
}

/// A JSON tree:
///
/// ```text
/// a
/// ├── a1
/// │   ├── a1x
/// │   └── a1y
/// └── a2
/// b
/// c
/// └── c1
/// ```
pub fn sample_records() -> Vec<Value> {
    vec![
        json!({
            "id": "a",
            "display": "Alpha",
            "children": [
                { "id": "a1", "children": [{ "id": "a1x" }, { "id": "a1y" }] },
                { "id": "a2" }
            ]
        }),
        json!({ "id": "b" }),
        json!({ "id": "c", "children": [{ "id": "c1" }] }),
    ]
}

pub fn sample_tree() -> Tree<Value> {
    init_logging();
    Tree::with_records(sample_records(), TreeOptions::new())
}

pub fn node<R: TreeRecord>(tree: &Tree<R>, id: &str) -> TreeNode<R> {
    tree.node(id).unwrap_or_else(|| panic!("node '{}' missing", id))
}

pub fn ids<R: TreeRecord>(nodes: &[TreeNode<R>]) -> Vec<String> {
    nodes.iter().map(|node| node.id().to_string()).collect()
}

/// A child source that counts its calls and answers from `children_of`
/// after a short delay.
pub fn counting_source<F>(calls: Arc<AtomicUsize>, children_of: F) -> impl ChildSource<Value>
where
    F: Fn(&NodeId) -> Result<Vec<Value>, TreeError> + Send + Sync + 'static,
{
    move |node: TreeNode<Value>| -> BoxFuture<'static, Result<Vec<Value>, TreeError>> {
        calls.fetch_add(1, Ordering::SeqCst);
        let result = children_of(node.id());
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            result
        }
        .boxed()
    }
}

/// Two leaf children named after the parent: `<id>/one`, `<id>/two`.
pub fn two_leaves(id: &NodeId) -> Result<Vec<Value>, TreeError> {
    Ok(vec![
        json!({ "id": format!("{}/one", id) }),
        json!({ "id": format!("{}/two", id) }),
    ])
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Wait for the next event of `kind`, failing after a second.
pub async fn next_event(
    events: &mut broadcast::Receiver<TreeEvent>,
    kind: TreeEventKind,
) -> TreeEvent {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if event.kind == kind => return event,
                Ok(_) => continue,
                Err(err) => panic!("event stream closed: {}", err),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(1), wait)
        .await
        .unwrap_or_else(|_| panic!("no {:?} event", kind))
}

/// Drain every event that is already queued.
pub fn drain(events: &mut broadcast::Receiver<TreeEvent>) -> Vec<TreeEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
