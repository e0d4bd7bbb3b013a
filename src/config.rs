use crate::node::Strategy;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Flat keyed configuration for a run. Every key has a default, so an empty
/// YAML document (or no file at all) yields a usable setup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub node: NodeSection,
    pub grid: GridSection,
    pub measurement: MeasurementSection,
    pub range_filter: RangeFilterSection,
    pub solution_set: SolutionSetSection,
    pub simulation: SimulationSection,
}

impl Config {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Config::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Config> {
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(text).context("parsing config")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeSection {
    /// Radio reach used by the adjacency oracle.
    pub max_reach: f64,
    /// Fraction of the current hop layer that must resolve before the
    /// hop-level strategy advances to the next layer.
    pub hop_level_advance_threshold: f64,
}

impl Default for NodeSection {
    fn default() -> Self {
        NodeSection {
            max_reach: 3.5,
            hop_level_advance_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridSection {
    pub n_nodes: usize,
    pub n_anchors: usize,
    pub n_required_anchors: usize,
    pub min_node_real_distance: f64,
    pub size: f64,
}

impl Default for GridSection {
    fn default() -> Self {
        GridSection {
            n_nodes: 16,
            n_anchors: 3,
            n_required_anchors: 3,
            min_node_real_distance: 0.8,
            size: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeasurementSection {
    /// Standard deviation of the synthetic Gaussian range noise.
    pub sd: f64,
    /// How many raw samples each node feeds through its range filter per
    /// neighbor edge during setup.
    pub samples_per_edge: usize,
}

impl Default for MeasurementSection {
    fn default() -> Self {
        MeasurementSection {
            sd: 0.05,
            samples_per_edge: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RangeFilterSection {
    pub median_filter_size: usize,
    pub required_measurements: usize,
    pub max_measurements: usize,
}

impl Default for RangeFilterSection {
    fn default() -> Self {
        RangeFilterSection {
            median_filter_size: 5,
            required_measurements: 10,
            max_measurements: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolutionSetSection {
    pub max_set_length: usize,
    pub deriv_filter_size: usize,
    pub deriv_filter_avg_threshold: f64,
    /// Candidates below `max_reach * max_reach_constant` are spurious: that
    /// short an edge would have been measured directly.
    pub max_reach_constant: f64,
}

impl Default for SolutionSetSection {
    fn default() -> Self {
        SolutionSetSection {
            max_set_length: 256,
            deriv_filter_size: 5,
            deriv_filter_avg_threshold: 0.02,
            max_reach_constant: 0.6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSection {
    pub iterations: usize,
    /// Strategy selector; accepts the same names as the original options:
    /// RandomTargetStrategy, RandomGateStrategy, RandomTargetHopLevelStrategy.
    pub node: Strategy,
    pub seed: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        SimulationSection {
            iterations: 1000,
            node: Strategy::RandomTargetHopLevel,
            seed: 42,
        }
    }
}
