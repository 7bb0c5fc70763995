use std::collections::HashMap;

use crate::classify::{FareCard, TeamRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    ActiveFares,
    PastFares,
    Teams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Divider,
    Header,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Node(NodeId),
    Marker(Marker),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Tail,
    BeforeDivider,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Fare(FareCard),
    Team(TeamRow),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub key: String,
    pub container: Container,
    pub content: NodeContent,
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub created: u64,
    pub updated: u64,
    pub moved: u64,
    pub removed: u64,
}

pub trait Renderer {
    fn create(
        &mut self,
        key: String,
        container: Container,
        placement: Placement,
        content: NodeContent,
    ) -> NodeId;

    /// Returns `true` when the visible content actually changed.
    fn update(&mut self, id: NodeId, content: NodeContent) -> bool;

    fn move_to(&mut self, id: NodeId, container: Container, placement: Placement);

    /// Puts `order` directly after the pinned markers.
    fn reorder(&mut self, container: Container, order: &[NodeId]);

    fn remove(&mut self, id: NodeId) -> bool;
}

#[derive(Debug)]
pub struct NodeTree {
    next_id: u64,
    nodes: HashMap<NodeId, Node>,
    active: Vec<Slot>,
    past: Vec<Slot>,
    teams: Vec<Slot>,
    stats: TreeStats,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            nodes: HashMap::new(),
            active: Vec::new(),
            past: vec![Slot::Marker(Marker::Divider)],
            teams: vec![Slot::Marker(Marker::Header)],
            stats: TreeStats::default(),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    pub fn children(&self, container: Container) -> &[Slot] {
        match container {
            Container::ActiveFares => &self.active,
            Container::PastFares => &self.past,
            Container::Teams => &self.teams,
        }
    }

    pub fn node_ids(&self, container: Container) -> Vec<NodeId> {
        self.children(container)
            .iter()
            .filter_map(|slot| match slot {
                Slot::Node(id) => Some(*id),
                Slot::Marker(_) => None,
            })
            .collect()
    }

    pub fn keys(&self, container: Container) -> Vec<String> {
        self.children(container)
            .iter()
            .map(|slot| match slot {
                Slot::Node(id) => self
                    .nodes
                    .get(id)
                    .map(|n| n.key.clone())
                    .unwrap_or_default(),
                Slot::Marker(Marker::Divider) => "|divider|".to_string(),
                Slot::Marker(Marker::Header) => "|header|".to_string(),
            })
            .collect()
    }

    fn children_mut(&mut self, container: Container) -> &mut Vec<Slot> {
        match container {
            Container::ActiveFares => &mut self.active,
            Container::PastFares => &mut self.past,
            Container::Teams => &mut self.teams,
        }
    }

    fn detach(&mut self, id: NodeId, container: Container) {
        self.children_mut(container)
            .retain(|slot| *slot != Slot::Node(id));
    }

    fn attach(&mut self, id: NodeId, container: Container, placement: Placement) {
        let children = self.children_mut(container);
        let at = match placement {
            Placement::Tail => children.len(),
            Placement::BeforeDivider => children
                .iter()
                .position(|slot| *slot == Slot::Marker(Marker::Divider))
                .unwrap_or(children.len()),
        };
        children.insert(at, Slot::Node(id));
    }
}

impl Renderer for NodeTree {
    fn create(
        &mut self,
        key: String,
        container: Container,
        placement: Placement,
        content: NodeContent,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                key,
                container,
                content,
                revision: 0,
            },
        );
        self.attach(id, container, placement);
        self.stats.created += 1;
        id
    }

    fn update(&mut self, id: NodeId, content: NodeContent) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        if node.content == content {
            return false;
        }
        node.content = content;
        node.revision += 1;
        self.stats.updated += 1;
        true
    }

    fn move_to(&mut self, id: NodeId, container: Container, placement: Placement) {
        let Some(current) = self.nodes.get(&id).map(|n| n.container) else {
            return;
        };
        self.detach(id, current);
        self.attach(id, container, placement);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.container = container;
        }
        self.stats.moved += 1;
    }

    fn reorder(&mut self, container: Container, order: &[NodeId]) {
        let children = self.children_mut(container);
        let mut pinned = Vec::new();
        let mut rest = Vec::new();
        for slot in children.drain(..) {
            match slot {
                Slot::Marker(_) => pinned.push(slot),
                Slot::Node(id) if !order.contains(&id) => rest.push(slot),
                Slot::Node(_) => {}
            }
        }
        let present: Vec<NodeId> = order
            .iter()
            .copied()
            .filter(|id| self.nodes.get(id).is_some_and(|n| n.container == container))
            .collect();
        let children = self.children_mut(container);
        children.extend(pinned);
        children.extend(present.into_iter().map(Slot::Node));
        children.extend(rest);
    }

    fn remove(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.remove(&id) else {
            return false;
        };
        self.detach(id, node.container);
        self.stats.removed += 1;
        true
    }
}
