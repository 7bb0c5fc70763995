use std::collections::{BTreeMap, HashMap, HashSet};

use crate::classify::{self, FarePartition};
use crate::model::{Fare, Millis, Team};
use crate::render::{Container, NodeContent, NodeId, Placement, Renderer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub created: usize,
    pub updated: usize,
    pub moved: usize,
    pub removed: usize,
}

impl PassStats {
    pub fn is_structural(&self) -> bool {
        self.created + self.moved + self.removed > 0
    }
}

pub fn fare_key(id: u64) -> String {
    format!("fare-{id}")
}

pub fn team_key(number: u32) -> String {
    format!("team-{number}")
}

pub fn fare_placement(partition: FarePartition) -> (Container, Placement) {
    match partition {
        FarePartition::Active => (Container::ActiveFares, Placement::Tail),
        FarePartition::PastClaimed => (Container::PastFares, Placement::BeforeDivider),
        FarePartition::PastUnclaimed => (Container::PastFares, Placement::Tail),
    }
}

#[derive(Debug, Clone, Copy)]
struct FareEntry {
    node: NodeId,
    partition: FarePartition,
}

/// Fare nodes are never pruned.
#[derive(Debug, Default)]
pub struct FareReconciler {
    entries: HashMap<u64, FareEntry>,
}

impl FareReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn node_for(&self, id: u64) -> Option<NodeId> {
        self.entries.get(&id).map(|e| e.node)
    }

    pub fn partition_of(&self, id: u64) -> Option<FarePartition> {
        self.entries.get(&id).map(|e| e.partition)
    }

    pub fn apply<R: Renderer>(&mut self, renderer: &mut R, fares: &[Fare], now: Millis) -> PassStats {
        let mut stats = PassStats::default();
        for fare in fares {
            let partition = classify::fare_partition(fare, now);
            let content = NodeContent::Fare(classify::fare_card(fare, now));
            let (container, placement) = fare_placement(partition);

            match self.entries.get_mut(&fare.id) {
                Some(entry) => {
                    if renderer.update(entry.node, content) {
                        stats.updated += 1;
                    }
                    // Only a partition change repositions; stable fares keep their slot.
                    if entry.partition != partition {
                        renderer.move_to(entry.node, container, placement);
                        stats.moved += 1;
                    }
                    entry.partition = partition;
                }
                None => {
                    let node = renderer.create(fare_key(fare.id), container, placement, content);
                    self.entries.insert(fare.id, FareEntry { node, partition });
                    stats.created += 1;
                }
            }
        }
        stats
    }
}

#[derive(Debug, Default)]
pub struct TeamReconciler {
    nodes: HashMap<u32, NodeId>,
}

impl TeamReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_for(&self, number: u32) -> Option<NodeId> {
        self.nodes.get(&number).copied()
    }

    pub fn apply<R: Renderer>(&mut self, renderer: &mut R, teams: &[Team], now: Millis) -> PassStats {
        let mut stats = PassStats::default();

        // Duplicate numbers collapse onto the last record seen.
        let ordered: BTreeMap<u32, &Team> = teams.iter().map(|t| (t.number, t)).collect();

        let mut order = Vec::with_capacity(ordered.len());
        for (number, team) in &ordered {
            let content = NodeContent::Team(classify::team_row(team, now));
            let node = match self.nodes.get(number) {
                Some(&node) => {
                    if renderer.update(node, content) {
                        stats.updated += 1;
                    }
                    node
                }
                None => {
                    let node = renderer.create(
                        team_key(*number),
                        Container::Teams,
                        Placement::Tail,
                        content,
                    );
                    self.nodes.insert(*number, node);
                    stats.created += 1;
                    node
                }
            };
            order.push(node);
        }

        renderer.reorder(Container::Teams, &order);

        let seen: HashSet<u32> = ordered.keys().copied().collect();
        self.nodes.retain(|number, node| {
            if seen.contains(number) {
                return true;
            }
            renderer.remove(*node);
            stats.removed += 1;
            false
        });

        stats
    }
}
