//! Assembles a run from the configuration and drives it: grid placement,
//! node construction, neighbor measurement, the round-robin scheduler,
//! and the final report. All run state lives on this value; there are no
//! globals.

use crate::config::Config;
use crate::grid::Grid;
use crate::models::{NodeId, Point2D};
use crate::network::Network;
use crate::node::Node;
use crate::positioning::position_from_anchors;
use anyhow::Result;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

pub struct Simulation {
    config: Config,
    grid: Grid,
    network: Network,
    rng: StdRng,
}

impl Simulation {
    /// A simulation over a randomly placed grid.
    pub fn new(config: Config) -> Result<Simulation> {
        let grid = Grid::random(
            config.grid.n_nodes,
            config.grid.size,
            config.grid.min_node_real_distance,
            config.node.max_reach,
            config.measurement.sd,
            config.simulation.seed,
        )?;
        Simulation::with_grid(config, grid)
    }

    /// A simulation over an explicit topology. The first
    /// `grid.n_anchors` ids become anchors.
    pub fn with_grid(config: Config, grid: Grid) -> Result<Simulation> {
        let mut network = Network::new();
        for id in 0..grid.node_count() {
            let neighbors = grid.neighbors_of(id);
            let hop_layers = grid.hop_layers_from(id);
            let mut node = Node::new(id, config.simulation.node, neighbors, hop_layers, &config);
            if id < config.grid.n_anchors {
                node.set_is_anchor(grid.true_position(id));
            }
            network.add_node(node)?;
        }

        // Strategy sampling draws from its own stream so a replayed grid
        // seed reproduces the same placement and noise.
        let rng = StdRng::seed_from_u64(config.simulation.seed.wrapping_add(1));
        let mut simulation = Simulation {
            config,
            grid,
            network,
            rng,
        };
        simulation.measure_neighbor_distances();
        Ok(simulation)
    }

    /// Every node feeds its range filters with raw samples for each
    /// neighbor and seeds the surviving estimates as exact edges.
    fn measure_neighbor_distances(&mut self) {
        let samples_per_edge = self.config.measurement.samples_per_edge;
        for id in 0..self.network.node_count() {
            let neighbors: Vec<NodeId> = {
                let Some(node) = self.network.get_node(id) else {
                    continue;
                };
                let mut n: Vec<NodeId> = node.neighbors().iter().copied().collect();
                n.sort_unstable();
                n
            };
            for neighbor in neighbors {
                let samples: Vec<f64> = (0..samples_per_edge)
                    .filter_map(|_| self.grid.measured_distance(id, neighbor))
                    .collect();
                let neighbor_anchor = self
                    .network
                    .get_node(neighbor)
                    .and_then(|n| n.is_anchor_and_position());
                let Some(node) = self.network.get_node_mut(id) else {
                    continue;
                };
                for sample in samples {
                    node.add_range_sample(neighbor, sample);
                }
                if let Some(estimate) = node.filtered_range_to(neighbor) {
                    node.add_exact_solution(neighbor, estimate, neighbor_anchor);
                }
            }
        }
    }

    /// The round-robin scheduler: a fixed number of passes, each giving
    /// every node one solver attempt, in id order. Earlier nodes'
    /// resolutions are visible to later nodes within the same pass.
    pub fn run(&mut self) {
        for iteration in 0..self.config.simulation.iterations {
            for id in 0..self.network.node_count() {
                self.network.try_measure_new_length(id, &mut self.rng);
            }
            if iteration % 100 == 0 {
                debug!("iteration {}", iteration);
            }
        }
    }

    /// Computes the least-squares position of every node that reached its
    /// required anchors. Anchors keep their ground-truth position.
    pub fn compute_positions(&mut self) {
        for id in 0..self.network.node_count() {
            let fix = {
                let Some(node) = self.network.get_node(id) else {
                    continue;
                };
                if node.is_anchor() || !node.anchor_reached() {
                    continue;
                }
                let mut anchor_ids: Vec<NodeId> = node.anchors().keys().copied().collect();
                anchor_ids.sort_unstable();

                let mut anchors = Vec::new();
                let mut distances = Vec::new();
                for anchor_id in anchor_ids {
                    let (Some(position), Some(solution)) =
                        (node.anchors().get(&anchor_id).copied(), node.known_to(anchor_id))
                    else {
                        continue;
                    };
                    anchors.push(position);
                    distances.push(solution.value);
                }
                position_from_anchors(&anchors, &distances)
            };
            if let Some(position) = fix {
                if let Some(node) = self.network.get_node_mut(id) {
                    node.set_position(position);
                    info!(
                        "[{}] positioned at ({:.2}, {:.2})",
                        id, position.x, position.y
                    );
                }
            }
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolved distance from `origin` to `target`, if any.
    pub fn known_distance(&self, origin: NodeId, target: NodeId) -> Option<f64> {
        Some(self.network.get_node(origin)?.known_to(target)?.value)
    }

    pub fn report(&self) -> SimulationReport {
        let nodes: Vec<NodeReport> = self
            .network
            .nodes()
            .map(|node| {
                let id = node.id();
                let true_position = self.grid.true_position(id);

                let mut error_sum = 0.0;
                let mut error_count = 0usize;
                for &target in node.completed_ids() {
                    let (Some(solution), Some(truth)) =
                        (node.known_to(target), self.grid.true_distance(id, target, true))
                    else {
                        continue;
                    };
                    error_sum += (solution.value - truth).abs();
                    error_count += 1;
                }

                let position = node.position();
                NodeReport {
                    id,
                    is_anchor: node.is_anchor(),
                    anchor_reached: node.anchor_reached(),
                    resolved_edges: node.completed_ids().len(),
                    mean_abs_distance_error: (error_count > 0)
                        .then(|| error_sum / error_count as f64),
                    position,
                    position_error: position.map(|p| p.distance_to(&true_position)),
                }
            })
            .collect();

        let n_anchored = nodes
            .iter()
            .filter(|n| n.is_anchor || n.anchor_reached)
            .count();

        SimulationReport {
            n_nodes: self.network.node_count(),
            n_anchored,
            nodes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub n_nodes: usize,
    /// Nodes that are anchors or have collected the required anchor count.
    pub n_anchored: usize,
    pub nodes: Vec<NodeReport>,
}

#[derive(Debug, Serialize)]
pub struct NodeReport {
    pub id: NodeId,
    pub is_anchor: bool,
    pub anchor_reached: bool,
    pub resolved_edges: usize,
    pub mean_abs_distance_error: Option<f64>,
    pub position: Option<Point2D>,
    pub position_error: Option<f64>,
}
