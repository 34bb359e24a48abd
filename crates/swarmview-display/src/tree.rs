//! Live display tree
//!
//! An arena of [`Node`]s under a single root, guarded by a `RwLock`, that
//! publishes structural changes on a broadcast stream. Multi-step edits go
//! through [`DisplayTree::edit`], which runs a closure against a
//! [`TreeTxn`] under the write lock and emits the collected mutation events
//! once the lock is released.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

use crate::element::{BoundElement, Element, ElementId, ElementKind, Node};
use crate::error::{DisplayError, DisplayResult};

/// Default capacity of the mutation stream
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Structural change to the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// A subtree rooted at `root` was inserted
    Inserted { root: ElementId },
    /// An element and its subtree were removed
    Removed { id: ElementId },
}

#[derive(Debug)]
struct Arena {
    nodes: HashMap<ElementId, Node>,
    root: ElementId,
    next_id: u64,
}

impl Arena {
    fn new() -> Self {
        let root = ElementId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                id: root,
                kind: ElementKind::Container,
                attrs: Default::default(),
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    fn node(&self, id: ElementId) -> DisplayResult<&Node> {
        self.nodes.get(&id).ok_or(DisplayError::UnknownElement(id))
    }

    fn node_mut(&mut self, id: ElementId) -> DisplayResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(DisplayError::UnknownElement(id))
    }

    /// Allocate `element` and its descendants; returns the subtree root
    fn build(&mut self, element: Element, parent: ElementId) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;

        let children = element
            .children
            .into_iter()
            .map(|child| self.build(child, id))
            .collect();

        self.nodes.insert(
            id,
            Node {
                id,
                kind: element.kind,
                attrs: element.attrs,
                parent: Some(parent),
                children,
            },
        );
        id
    }

    fn drop_subtree(&mut self, id: ElementId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.drop_subtree(child);
            }
        }
    }

    /// Parent of a non-root element and its index among the siblings
    fn position(&self, id: ElementId) -> DisplayResult<(ElementId, usize)> {
        let parent = self.node(id)?.parent.ok_or(DisplayError::RootElement)?;
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|c| *c == id)
            .ok_or(DisplayError::UnknownElement(id))?;
        Ok((parent, index))
    }

    fn collect(&self, from: ElementId, out: &mut Vec<BoundElement>) {
        let Some(node) = self.nodes.get(&from) else {
            return;
        };
        if let Some(media) = node.media_id() {
            out.push(BoundElement {
                element: node.id,
                media,
                loaded: node.is_loaded(),
            });
        }
        for child in &node.children {
            self.collect(*child, out);
        }
    }
}

/// A set of edits applied under one write lock
pub struct TreeTxn<'a> {
    arena: &'a mut Arena,
    events: Vec<Mutation>,
}

impl TreeTxn<'_> {
    pub fn root(&self) -> ElementId {
        self.arena.root
    }

    pub fn get(&self, id: ElementId) -> Option<&Node> {
        self.arena.nodes.get(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.arena.nodes.contains_key(&id)
    }

    pub fn attr(&self, id: ElementId, name: &str) -> Option<&str> {
        self.get(id).and_then(|n| n.attr(name))
    }

    /// Append `element` as the last child of `parent`
    pub fn append(&mut self, parent: ElementId, element: Element) -> DisplayResult<ElementId> {
        self.arena.node(parent)?;
        let id = self.arena.build(element, parent);
        self.arena.node_mut(parent)?.children.push(id);
        self.events.push(Mutation::Inserted { root: id });
        Ok(id)
    }

    /// Insert `element` right after `sibling`
    pub fn insert_after(
        &mut self,
        sibling: ElementId,
        element: Element,
    ) -> DisplayResult<ElementId> {
        let (parent, index) = self.arena.position(sibling)?;
        let id = self.arena.build(element, parent);
        self.arena.node_mut(parent)?.children.insert(index + 1, id);
        self.events.push(Mutation::Inserted { root: id });
        Ok(id)
    }

    /// Swap `target` and its subtree for `element` at the same position
    pub fn replace(&mut self, target: ElementId, element: Element) -> DisplayResult<ElementId> {
        let (parent, index) = self.arena.position(target)?;
        self.arena.drop_subtree(target);
        let id = self.arena.build(element, parent);
        self.arena.node_mut(parent)?.children[index] = id;
        self.events.push(Mutation::Removed { id: target });
        self.events.push(Mutation::Inserted { root: id });
        Ok(id)
    }

    /// Detach and drop `id` with its subtree
    pub fn remove(&mut self, id: ElementId) -> DisplayResult<()> {
        let (parent, index) = self.arena.position(id)?;
        self.arena.node_mut(parent)?.children.remove(index);
        self.arena.drop_subtree(id);
        self.events.push(Mutation::Removed { id });
        Ok(())
    }

    pub fn set_attr(
        &mut self,
        id: ElementId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> DisplayResult<()> {
        self.arena
            .node_mut(id)?
            .attrs
            .insert(name.into(), value.into());
        Ok(())
    }
}

/// Shared, observable display tree
#[derive(Debug)]
pub struct DisplayTree {
    arena: RwLock<Arena>,
    events: broadcast::Sender<Mutation>,
}

impl Default for DisplayTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayTree {
    /// Create a tree holding only the root container
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a tree whose mutation stream buffers `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            arena: RwLock::new(Arena::new()),
            events,
        }
    }

    pub fn root(&self) -> ElementId {
        self.arena.read().root
    }

    /// Receive mutation events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Mutation> {
        self.events.subscribe()
    }

    /// Run `f` against the tree under the write lock
    ///
    /// Mutation events recorded by the transaction are published after the
    /// lock is released, even when `f` returns early.
    pub fn edit<R>(&self, f: impl FnOnce(&mut TreeTxn<'_>) -> R) -> R {
        let (result, events) = {
            let mut arena = self.arena.write();
            let mut txn = TreeTxn {
                arena: &mut *arena,
                events: Vec::new(),
            };
            let result = f(&mut txn);
            (result, txn.events)
        };

        for event in events {
            trace!(?event, "Tree mutation");
            // No subscribers is fine
            let _ = self.events.send(event);
        }
        result
    }

    pub fn append(&self, parent: ElementId, element: Element) -> DisplayResult<ElementId> {
        self.edit(|txn| txn.append(parent, element))
    }

    pub fn insert_after(&self, sibling: ElementId, element: Element) -> DisplayResult<ElementId> {
        self.edit(|txn| txn.insert_after(sibling, element))
    }

    pub fn replace(&self, target: ElementId, element: Element) -> DisplayResult<ElementId> {
        self.edit(|txn| txn.replace(target, element))
    }

    pub fn remove(&self, id: ElementId) -> DisplayResult<()> {
        self.edit(|txn| txn.remove(id))
    }

    pub fn set_attr(
        &self,
        id: ElementId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> DisplayResult<()> {
        self.edit(|txn| txn.set_attr(id, name, value))
    }

    /// Snapshot of one element
    pub fn get(&self, id: ElementId) -> Option<Node> {
        self.arena.read().nodes.get(&id).cloned()
    }

    pub fn attr(&self, id: ElementId, name: &str) -> Option<String> {
        self.arena
            .read()
            .nodes
            .get(&id)
            .and_then(|n| n.attr(name))
            .map(str::to_string)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.arena.read().nodes.contains_key(&id)
    }

    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.arena
            .read()
            .nodes
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Number of elements, root included
    pub fn len(&self) -> usize {
        self.arena.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Every element under `root` (inclusive) that carries a media id
    pub fn tagged_elements(&self, root: ElementId) -> Vec<BoundElement> {
        let mut out = Vec::new();
        self.arena.read().collect(root, &mut out);
        out
    }

    /// Elements under `root` (inclusive) that still need binding
    pub fn bound_elements(&self, root: ElementId) -> Vec<BoundElement> {
        let mut out = self.tagged_elements(root);
        out.retain(|b| !b.loaded);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::attr;

    #[test]
    fn test_append_subtree() {
        let tree = DisplayTree::new();
        let mut rx = tree.subscribe();

        let section = tree
            .append(
                tree.root(),
                Element::container()
                    .with_child(Element::image("1.png"))
                    .with_child(Element::container().with_child(Element::video("2"))),
            )
            .unwrap();

        assert_eq!(tree.len(), 5);
        assert_eq!(rx.try_recv().unwrap(), Mutation::Inserted { root: section });
        assert!(rx.try_recv().is_err());

        let pending = tree.bound_elements(section);
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].media.key(), "1.png");
        assert_eq!(pending[1].media.to_string(), "video:2");
    }

    #[test]
    fn test_loaded_elements_not_pending() {
        let tree = DisplayTree::new();
        let id = tree.append(tree.root(), Element::image("1.png")).unwrap();
        tree.set_attr(id, attr::LOADED, "true").unwrap();

        assert!(tree.bound_elements(tree.root()).is_empty());
        assert_eq!(tree.tagged_elements(tree.root()).len(), 1);
    }

    #[test]
    fn test_replace_keeps_position() {
        let tree = DisplayTree::new();
        let root = tree.root();
        let a = tree.append(root, Element::image("a")).unwrap();
        let b = tree.append(root, Element::image("b")).unwrap();
        let mut rx = tree.subscribe();

        let e = tree
            .replace(a, Element::new(ElementKind::Embed))
            .unwrap();
        assert_eq!(tree.children(root), vec![e, b]);
        assert!(!tree.contains(a));
        assert_eq!(rx.try_recv().unwrap(), Mutation::Removed { id: a });
        assert_eq!(rx.try_recv().unwrap(), Mutation::Inserted { root: e });

        let link = tree.insert_after(e, Element::new(ElementKind::Anchor)).unwrap();
        assert_eq!(tree.children(root), vec![e, link, b]);
    }

    #[test]
    fn test_remove_and_root_guards() {
        let tree = DisplayTree::new();
        let root = tree.root();
        let section = tree
            .append(root, Element::container().with_child(Element::image("x")))
            .unwrap();

        tree.remove(section).unwrap();
        assert!(tree.is_empty());
        assert_eq!(
            tree.remove(section),
            Err(DisplayError::UnknownElement(section))
        );
        assert_eq!(tree.remove(root), Err(DisplayError::RootElement));
        assert_eq!(
            tree.insert_after(root, Element::container()),
            Err(DisplayError::RootElement)
        );
    }

    #[test]
    fn test_edit_is_atomic_batch() {
        let tree = DisplayTree::new();
        let mut rx = tree.subscribe();

        let (a, b) = tree.edit(|txn| {
            let root = txn.root();
            let a = txn.append(root, Element::image("a")).unwrap();
            let b = txn.append(root, Element::image("b")).unwrap();
            txn.set_attr(a, attr::SRC, "blob:x").unwrap();
            (a, b)
        });

        assert_eq!(tree.attr(a, attr::SRC).as_deref(), Some("blob:x"));
        assert_eq!(rx.try_recv().unwrap(), Mutation::Inserted { root: a });
        assert_eq!(rx.try_recv().unwrap(), Mutation::Inserted { root: b });
    }
}
