//! Physical placement of the mesh and the oracles built on it: noisy
//! neighbor-only ranging, adjacency within radio reach, and BFS hop
//! layers. Ground-truth positions live here and are handed out only to
//! anchors (and to reports comparing against the truth).

use crate::models::{NodeId, Point2D};
use anyhow::{Result, bail};
use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use std::collections::{BTreeSet, HashSet};

/// Placement gives up after this many rejected draws for a single node.
const MAX_PLACEMENT_ATTEMPTS: usize = 10_000;

/// A node index with its coordinates, stored in the R-Tree.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SpatialNode {
    index: usize,
    x: f64,
    y: f64,
}

impl RTreeObject for SpatialNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for SpatialNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

pub struct Grid {
    points: Vec<Point2D>,
    rtree: RTree<SpatialNode>,
    reach: f64,
    noise: Option<Normal<f64>>,
    rng: StdRng,
}

impl Grid {
    /// Scatters `n_nodes` points over a `size` x `size` square, rejecting
    /// draws closer than `min_spacing` to an existing point.
    pub fn random(
        n_nodes: usize,
        size: f64,
        min_spacing: f64,
        reach: f64,
        sd: f64,
        seed: u64,
    ) -> Result<Grid> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut points: Vec<Point2D> = Vec::with_capacity(n_nodes);
        for _ in 0..n_nodes {
            let mut placed = false;
            for _ in 0..MAX_PLACEMENT_ATTEMPTS {
                let candidate = Point2D::new(
                    rng.random_range(0.0..size),
                    rng.random_range(0.0..size),
                );
                if points
                    .iter()
                    .all(|p| p.distance_to(&candidate) >= min_spacing)
                {
                    points.push(candidate);
                    placed = true;
                    break;
                }
            }
            if !placed {
                bail!(
                    "could not place {} nodes with spacing {} on a {}x{} grid",
                    n_nodes,
                    min_spacing,
                    size,
                    size
                );
            }
        }
        Grid::build(points, reach, sd, rng)
    }

    /// A grid with explicit coordinates, for known topologies.
    pub fn from_points(points: Vec<Point2D>, reach: f64, sd: f64, seed: u64) -> Result<Grid> {
        Grid::build(points, reach, sd, StdRng::seed_from_u64(seed))
    }

    fn build(points: Vec<Point2D>, reach: f64, sd: f64, rng: StdRng) -> Result<Grid> {
        if reach <= 0.0 || !reach.is_finite() {
            bail!("node reach must be positive and finite, got {}", reach);
        }
        if sd < 0.0 || !sd.is_finite() {
            bail!("measurement sd must be non-negative and finite, got {}", sd);
        }
        let noise = if sd > 0.0 {
            Some(Normal::new(0.0, sd)?)
        } else {
            None
        };
        let rtree = RTree::bulk_load(
            points
                .iter()
                .enumerate()
                .map(|(index, p)| SpatialNode {
                    index,
                    x: p.x,
                    y: p.y,
                })
                .collect(),
        );
        Ok(Grid {
            points,
            rtree,
            reach,
            noise,
            rng,
        })
    }

    pub fn node_count(&self) -> usize {
        self.points.len()
    }

    pub fn reach(&self) -> f64 {
        self.reach
    }

    pub fn true_position(&self, id: NodeId) -> Point2D {
        self.points[id]
    }

    /// The real distance between two nodes, or `None` beyond radio reach
    /// unless `override_range` asks for it anyway.
    pub fn true_distance(&self, origin: NodeId, target: NodeId, override_range: bool) -> Option<f64> {
        let distance = self.points[origin].distance_to(&self.points[target]);
        if !override_range && distance > self.reach {
            return None;
        }
        Some(distance)
    }

    /// The range oracle: one noisy sample of the distance to a node in
    /// direct range, `None` for anything farther.
    pub fn measured_distance(&mut self, origin: NodeId, target: NodeId) -> Option<f64> {
        let distance = self.true_distance(origin, target, false)?;
        match &self.noise {
            Some(noise) => Some(distance + noise.sample(&mut self.rng)),
            None => Some(distance),
        }
    }

    /// The adjacency oracle: ids within reach of `origin`, ascending.
    pub fn neighbors_of(&self, origin: NodeId) -> Vec<NodeId> {
        let p = self.points[origin];
        let mut neighbors: Vec<NodeId> = self
            .rtree
            .locate_within_distance([p.x, p.y], self.reach * self.reach)
            .map(|s| s.index)
            .filter(|&i| i != origin)
            .collect();
        neighbors.sort_unstable();
        neighbors
    }

    /// BFS layering of the reachability graph: layer k holds the nodes at
    /// depth k from `origin`. Unreachable nodes appear in no layer.
    pub fn hop_layers_from(&self, origin: NodeId) -> Vec<Vec<NodeId>> {
        let mut visited: HashSet<NodeId> = HashSet::from([origin]);
        let mut layers = vec![vec![origin]];
        let mut frontier = vec![origin];
        loop {
            let mut next: BTreeSet<NodeId> = BTreeSet::new();
            for &node in &frontier {
                for neighbor in self.neighbors_of(node) {
                    if !visited.contains(&neighbor) {
                        next.insert(neighbor);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            visited.extend(next.iter().copied());
            frontier = next.into_iter().collect();
            layers.push(frontier.clone());
        }
        layers
    }
}
