//! Per-node state: neighbor measurements, resolved edges, target
//! bookkeeping and the anchor map. Nodes hold no peer handles; all remote
//! traffic is routed through the network arena by id.

use crate::config::{Config, RangeFilterSection};
use crate::filter::RangeFilter;
use crate::models::{NodeId, Point2D, TargetRecord};
use crate::solution::{Solution, SolutionSet, SolutionSetParams};
use log::{debug, info};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// How a node picks its next solver attempt. Selected at construction;
/// there is exactly one node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Strategy {
    #[serde(rename = "RandomTargetStrategy")]
    RandomTarget,
    #[serde(rename = "RandomGateStrategy")]
    RandomGate,
    #[serde(rename = "RandomTargetHopLevelStrategy")]
    RandomTargetHopLevel,
}

pub struct Node {
    id: NodeId,
    strategy: Strategy,

    is_anchor: bool,
    anchor_reached: bool,
    anchors: HashMap<NodeId, Point2D>,
    position: Option<Point2D>,

    known: HashMap<NodeId, SolutionSet>,
    known_set: HashSet<NodeId>,
    unknown_set: Vec<NodeId>,
    targets: HashMap<NodeId, TargetRecord>,
    neighbors: HashSet<NodeId>,
    range_filters: HashMap<NodeId, RangeFilter>,

    hop_layers: Vec<Vec<NodeId>>,
    hop_level: usize,
    current_target_source: Vec<NodeId>,
    known_count_by_hop_level: Vec<usize>,

    anchors_required: usize,
    hop_level_advance_threshold: f64,
    set_params: SolutionSetParams,
    filter_cfg: RangeFilterSection,
}

impl Node {
    /// `neighbors` is the adjacency oracle's answer for this node,
    /// `hop_layers` the BFS layering of its reachable component (layer 0 is
    /// the node itself). Unreachable nodes appear in no layer and are
    /// therefore never targets.
    pub fn new(
        id: NodeId,
        strategy: Strategy,
        neighbors: Vec<NodeId>,
        hop_layers: Vec<Vec<NodeId>>,
        cfg: &Config,
    ) -> Self {
        let mut targets = HashMap::new();
        let mut unknown_set = Vec::new();
        for (hops, layer) in hop_layers.iter().enumerate() {
            for &peer in layer {
                targets.insert(peer, TargetRecord::new(peer, hops));
                if peer != id {
                    unknown_set.push(peer);
                }
            }
        }
        unknown_set.sort_unstable();

        // The hop-level strategy starts two hops out; direct neighbors are
        // measured, not solved for.
        let hop_level = 2;
        let current_target_source = hop_layers.get(hop_level).cloned().unwrap_or_default();
        let known_count_by_hop_level = vec![0; hop_layers.len()];

        Node {
            id,
            strategy,
            is_anchor: false,
            anchor_reached: false,
            anchors: HashMap::new(),
            position: None,
            known: HashMap::new(),
            known_set: HashSet::new(),
            unknown_set,
            targets,
            neighbors: neighbors.into_iter().filter(|&n| n != id).collect(),
            range_filters: HashMap::new(),
            hop_layers,
            hop_level,
            current_target_source,
            known_count_by_hop_level,
            anchors_required: cfg.grid.n_required_anchors,
            hop_level_advance_threshold: cfg.node.hop_level_advance_threshold,
            set_params: SolutionSetParams::from_config(cfg),
            filter_cfg: cfg.range_filter.clone(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn neighbors(&self) -> &HashSet<NodeId> {
        &self.neighbors
    }

    pub fn set_is_anchor(&mut self, position: Point2D) {
        self.is_anchor = true;
        self.position = Some(position);
    }

    pub fn is_anchor(&self) -> bool {
        self.is_anchor
    }

    /// The only anchor oracle the rest of the system consumes.
    pub fn is_anchor_and_position(&self) -> Option<Point2D> {
        if self.is_anchor { self.position } else { None }
    }

    pub fn position(&self) -> Option<Point2D> {
        self.position
    }

    /// Assigned by the positioning collaborator once enough anchors are in.
    pub fn set_position(&mut self, position: Point2D) {
        self.position = Some(position);
    }

    pub fn anchor_reached(&self) -> bool {
        self.anchor_reached
    }

    pub fn anchors(&self) -> &HashMap<NodeId, Point2D> {
        &self.anchors
    }

    /// The resolved distance to a target, if any.
    pub fn known_to(&self, target: NodeId) -> Option<Solution> {
        self.known.get(&target)?.get()
    }

    /// Ids whose distance from this node is resolved.
    pub fn completed_ids(&self) -> &HashSet<NodeId> {
        &self.known_set
    }

    pub fn unknown_ids(&self) -> &[NodeId] {
        &self.unknown_set
    }

    pub fn hops_to(&self, target: NodeId) -> Option<usize> {
        self.targets.get(&target).map(|t| t.hops)
    }

    pub fn hop_level(&self) -> usize {
        self.hop_level
    }

    /// The pool the strategy draws its next target from.
    pub fn target_pool(&self) -> &[NodeId] {
        match self.strategy {
            Strategy::RandomTargetHopLevel => &self.current_target_source,
            Strategy::RandomTarget | Strategy::RandomGate => &self.unknown_set,
        }
    }

    /// Feeds one raw range sample for a neighbor through its filter.
    pub fn add_range_sample(&mut self, neighbor: NodeId, sample: f64) {
        self.range_filters
            .entry(neighbor)
            .or_insert_with(|| RangeFilter::from_config(&self.filter_cfg))
            .add(sample);
    }

    /// The filtered range estimate for a neighbor, once stable.
    pub fn filtered_range_to(&mut self, neighbor: NodeId) -> Option<f64> {
        self.range_filters.get_mut(&neighbor)?.get()
    }

    /// Seeds the edge to `target` with a directly measured value.
    /// `target_anchor` is the anchor oracle's answer for the target.
    pub fn add_exact_solution(
        &mut self,
        target: NodeId,
        value: f64,
        target_anchor: Option<Point2D>,
    ) {
        match self.known.get_mut(&target) {
            Some(set) => {
                set.add(Solution::exact(value));
            }
            None => {
                self.known
                    .insert(target, SolutionSet::with_exact(value, self.set_params));
            }
        }
        self.mark_known(target, target_anchor);
    }

    /// Ingests a batch of derived candidates for `target`; also the entry
    /// point peers use to push solutions to this node. Returns true iff the
    /// edge resolved just now.
    pub fn add_solutions(
        &mut self,
        target: NodeId,
        solutions: &[Solution],
        target_anchor: Option<Point2D>,
    ) -> bool {
        let set = self
            .known
            .entry(target)
            .or_insert_with(|| SolutionSet::new(self.set_params));
        let resolved_now = set.extend(solutions);
        if resolved_now {
            debug!(
                "[{}] resolved distance to {} ({:.3})",
                self.id,
                target,
                set.get().map(|s| s.value).unwrap_or(f64::NAN)
            );
            self.mark_known(target, target_anchor);
        }
        resolved_now
    }

    fn mark_known(&mut self, target: NodeId, target_anchor: Option<Point2D>) {
        let hops = match self.targets.get_mut(&target) {
            Some(record) if !record.completed => {
                record.completed = true;
                record.hops
            }
            // Already completed, or a push for a node outside the
            // reachable universe: nothing to update.
            _ => return,
        };

        self.known_set.insert(target);
        self.unknown_set.retain(|&t| t != target);
        self.process_hop_level(target, hops);
        self.check_anchor_hit(target, target_anchor);
    }

    fn process_hop_level(&mut self, target: NodeId, hops: usize) {
        self.current_target_source.retain(|&t| t != target);

        if let Some(count) = self.known_count_by_hop_level.get_mut(hops) {
            *count += 1;
        }
        if hops != self.hop_level {
            return;
        }
        let layer_size = match self.hop_layers.get(self.hop_level) {
            Some(layer) if !layer.is_empty() => layer.len(),
            _ => return,
        };
        let completion = self.known_count_by_hop_level[self.hop_level] as f64 / layer_size as f64;
        if completion > self.hop_level_advance_threshold {
            self.hop_level += 1;
            debug!("[{}] hop level -> {}", self.id, self.hop_level);
            if let Some(layer) = self.hop_layers.get(self.hop_level) {
                self.current_target_source.extend(layer.iter().copied());
            }
        }
    }

    fn check_anchor_hit(&mut self, target: NodeId, position: Option<Point2D>) {
        let Some(position) = position else { return };
        self.anchors.insert(target, position);
        if !self.anchor_reached && self.anchors.len() >= self.anchors_required {
            self.anchor_reached = true;
            info!("[{}] required anchors acquired", self.id);
        }
    }
}
