//! Candidate distances for a single edge and the per-edge accumulator that
//! elects one of them once the evidence clusters.

use crate::config::Config;
use crate::models::NodeId;

/// Tag value for solutions that did not come from a gate.
pub const UNGATED: i64 = -1;

/// Canonical tag of an unordered gate pair, used to deduplicate candidates
/// by provenance.
pub fn gate_tag(gate: (NodeId, NodeId)) -> i64 {
    let lo = gate.0.min(gate.1) as i64;
    let hi = gate.0.max(gate.1) as i64;
    2 * lo + 3 * hi
}

/// One candidate value for an edge. `badness` counts the propagated noise
/// depth of the evidence chain; it is carried on every derived solution but
/// not consumed by the current resolution rule.
#[derive(Debug, Clone, Copy)]
pub struct Solution {
    pub value: f64,
    pub badness: u32,
    pub is_exact: bool,
    pub tag: i64,
}

impl Solution {
    /// A solution sourced from a direct measurement.
    pub fn exact(value: f64) -> Self {
        Solution {
            value,
            badness: 0,
            is_exact: true,
            tag: UNGATED,
        }
    }

    /// A solver-produced candidate, tagged with the gate it came from.
    pub fn derived(value: f64, badness: u32, gate: (NodeId, NodeId)) -> Self {
        Solution {
            value,
            badness,
            is_exact: false,
            tag: gate_tag(gate),
        }
    }
}

/// Parameters every `SolutionSet` is constructed with; derived once from
/// the configuration.
#[derive(Debug, Clone, Copy)]
pub struct SolutionSetParams {
    /// Candidates below this are rejected as spurious: an edge that short
    /// would be in direct range and measured directly.
    pub cutoff: f64,
    pub deriv_filter_size: usize,
    /// Threshold on the windowed derivative sum, already multiplied by the
    /// filter size.
    pub deriv_filter_sum_threshold: f64,
    pub max_set_length: usize,
}

impl SolutionSetParams {
    pub fn from_config(cfg: &Config) -> Self {
        let ss = &cfg.solution_set;
        SolutionSetParams {
            cutoff: cfg.node.max_reach * ss.max_reach_constant,
            deriv_filter_size: ss.deriv_filter_size,
            deriv_filter_sum_threshold: ss.deriv_filter_avg_threshold
                * ss.deriv_filter_size as f64,
            max_set_length: ss.max_set_length,
        }
    }
}

/// Accumulates candidate solutions for one (origin, target) edge and locks
/// a resolved value once a cluster stands out. Correct candidates pile up
/// near the true length while wrong geometric roots scatter, so the densest
/// stretch of the sorted values is the answer.
pub struct SolutionSet {
    solutions: Vec<Solution>,
    resolved: Option<Solution>,
    is_exact: bool,
    params: SolutionSetParams,
}

impl SolutionSet {
    pub fn new(params: SolutionSetParams) -> Self {
        SolutionSet {
            solutions: Vec::new(),
            resolved: None,
            is_exact: false,
            params,
        }
    }

    /// A set seeded from a direct measurement: resolved immediately and
    /// permanently.
    pub fn with_exact(value: f64, params: SolutionSetParams) -> Self {
        SolutionSet {
            solutions: Vec::new(),
            resolved: Some(Solution::exact(value)),
            is_exact: true,
            params,
        }
    }

    pub fn get(&self) -> Option<Solution> {
        self.resolved
    }

    pub fn is_exact(&self) -> bool {
        self.is_exact
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    /// Inserts one candidate. Returns true iff this call established the
    /// resolved value.
    pub fn add(&mut self, solution: Solution) -> bool {
        self.insert(solution);
        self.update_resolved()
    }

    /// Bulk insert under the same rule as `add`.
    pub fn extend(&mut self, solutions: &[Solution]) -> bool {
        for solution in solutions {
            self.insert(*solution);
        }
        self.update_resolved()
    }

    fn insert(&mut self, solution: Solution) {
        if solution.is_exact {
            // Exact wins immediately and freezes the set.
            self.is_exact = true;
            self.resolved = Some(solution);
            return;
        }
        if self.resolved.is_some() {
            return;
        }
        if solution.value < self.params.cutoff {
            return;
        }
        if solution.tag != UNGATED && self.solutions.iter().any(|s| s.tag == solution.tag) {
            return;
        }
        let idx = self
            .solutions
            .partition_point(|s| s.value <= solution.value);
        self.solutions.insert(idx, solution);
    }

    /// Cluster detection on the sorted values: the minimum of a windowed
    /// sum of first differences marks the densest stretch. Resolution
    /// happens at most once; past the hard capacity it is forced with the
    /// same minimum rule.
    fn update_resolved(&mut self) -> bool {
        if self.resolved.is_some() {
            return false;
        }
        let f = self.params.deriv_filter_size;
        if self.solutions.len() < 2 * f {
            return false;
        }

        let deriv: Vec<f64> = self
            .solutions
            .windows(2)
            .map(|w| w[1].value - w[0].value)
            .collect();
        let delta = f / 2;

        let mut best_j = delta;
        let mut best_sum = f64::INFINITY;
        for j in delta..deriv.len() - delta {
            let sum: f64 = deriv[j - delta..j + delta].iter().sum();
            if sum < best_sum {
                best_sum = sum;
                best_j = j;
            }
        }

        let must_choose = self.solutions.len() > self.params.max_set_length;
        if !must_choose && best_sum > self.params.deriv_filter_sum_threshold {
            return false;
        }

        self.resolved = Some(self.solutions[best_j + delta]);
        true
    }
}
