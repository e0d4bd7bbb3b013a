//! Address book and message router. The network owns every node in a
//! dense arena indexed by id; nodes refer to each other only through it.
//! All inter-node calls are synchronous: a step reads remote state, runs
//! the solver, then applies the results to both endpoints so each marks
//! the edge known independently.

use crate::models::NodeId;
use crate::node::{Node, Strategy};
use crate::solution::Solution;
use crate::solver;
use anyhow::{Result, bail};
use rand::Rng;
use rand::rngs::StdRng;

#[derive(Default)]
pub struct Network {
    nodes: Vec<Node>,
}

impl Network {
    pub fn new() -> Self {
        Network { nodes: Vec::new() }
    }

    /// Ids must arrive dense and in order; the arena index is the address.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if node.id() != self.nodes.len() {
            bail!(
                "node id {} out of order, expected {}",
                node.id(),
                self.nodes.len()
            );
        }
        self.nodes.push(node);
        Ok(())
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Every resolved directed edge as (origin, target, distance).
    pub fn resolved_pairs(&self) -> Vec<(NodeId, NodeId, f64)> {
        let mut pairs = Vec::new();
        for node in &self.nodes {
            for &target in node.completed_ids() {
                if let Some(solution) = node.known_to(target) {
                    pairs.push((node.id(), target, solution.value));
                }
            }
        }
        pairs.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        pairs
    }

    /// One best-effort attempt for `origin` to derive a new edge. Every
    /// missing datum silently no-ops the step; the scheduler's next pass is
    /// the retry.
    pub fn try_measure_new_length(&mut self, origin: NodeId, rng: &mut StdRng) {
        let Some(node) = self.nodes.get(origin) else {
            return;
        };
        match node.strategy() {
            Strategy::RandomTarget | Strategy::RandomTargetHopLevel => {
                let pool = node.target_pool();
                if pool.is_empty() {
                    return;
                }
                let target = pool[rng.random_range(0..pool.len())];
                self.attempt_target(origin, target, rng);
            }
            Strategy::RandomGate => self.attempt_random_gate(origin, rng),
        }
    }

    /// Random-target step: pick a gate from the intersection of both
    /// endpoints' completed sets and solve for the one chosen target.
    fn attempt_target(&mut self, origin: NodeId, target: NodeId, rng: &mut StdRng) {
        let gate = {
            let node = &self.nodes[origin];
            let Some(target_node) = self.nodes.get(target) else {
                return;
            };
            let mut gate_pool: Vec<NodeId> = target_node
                .completed_ids()
                .intersection(node.completed_ids())
                .copied()
                .collect();
            if gate_pool.len() < 2 {
                return;
            }
            gate_pool.sort_unstable();
            sample_pair(&gate_pool, rng)
        };

        if let Some(batch) = self.solve_for_target(origin, target, gate) {
            self.deliver(origin, target, &batch);
        }
    }

    /// Random-gate step: pick a gate from the origin's resolved edges and
    /// solve for every target both gate ends have completed.
    fn attempt_random_gate(&mut self, origin: NodeId, rng: &mut StdRng) {
        let (gate, targets) = {
            let node = &self.nodes[origin];
            let mut resolved: Vec<NodeId> = node.completed_ids().iter().copied().collect();
            if resolved.len() < 2 {
                return;
            }
            resolved.sort_unstable();
            let gate = sample_pair(&resolved, rng);

            let (Some(left), Some(right)) = (self.nodes.get(gate.0), self.nodes.get(gate.1))
            else {
                return;
            };
            let mut targets: Vec<NodeId> = left
                .completed_ids()
                .intersection(right.completed_ids())
                .copied()
                .filter(|&t| t != origin && !node.neighbors().contains(&t))
                .collect();
            targets.sort_unstable();
            (gate, targets)
        };

        for target in targets {
            if let Some(batch) = self.solve_for_target(origin, target, gate) {
                self.deliver(origin, target, &batch);
            }
        }
    }

    /// Gathers the five edges of the gate quadrilateral and runs the
    /// solver. `None` means some edge is not resolved yet.
    fn solve_for_target(
        &self,
        origin: NodeId,
        target: NodeId,
        gate: (NodeId, NodeId),
    ) -> Option<Vec<Solution>> {
        let node = self.nodes.get(origin)?;
        let (g0, g1) = gate;
        let p0p1 = node.known_to(g0)?;
        let p0p2 = node.known_to(g1)?;
        let p1p2 = self.nodes.get(g0)?.known_to(g1)?;
        let p1p3 = self.nodes.get(target)?.known_to(g0)?;
        let p2p3 = self.nodes.get(target)?.known_to(g1)?;

        let edges = [p0p1, p0p2, p1p2, p1p3, p2p3];
        // Noise depth propagates conservatively: the worst input wins.
        let badness = edges.iter().map(|s| s.badness).max().unwrap_or(0);

        let roots = solver::simplex_diagonal(
            p0p1.value,
            p0p2.value,
            p1p2.value,
            p1p3.value,
            p2p3.value,
        );
        Some(
            roots
                .into_iter()
                .map(|r| Solution::derived(r, badness, gate))
                .collect(),
        )
    }

    /// Inserts the batch at both endpoints. Anchor lookups happen before
    /// either endpoint mutates, mirroring a query/response exchange.
    fn deliver(&mut self, origin: NodeId, target: NodeId, batch: &[Solution]) {
        if batch.is_empty() {
            return;
        }
        let target_anchor = self.nodes[target].is_anchor_and_position();
        let origin_anchor = self.nodes[origin].is_anchor_and_position();
        self.nodes[origin].add_solutions(target, batch, target_anchor);
        self.nodes[target].add_solutions(origin, batch, origin_anchor);
    }
}

/// Two distinct elements drawn uniformly without replacement.
fn sample_pair(pool: &[NodeId], rng: &mut StdRng) -> (NodeId, NodeId) {
    let i = rng.random_range(0..pool.len());
    let mut j = rng.random_range(0..pool.len() - 1);
    if j >= i {
        j += 1;
    }
    (pool[i], pool[j])
}
