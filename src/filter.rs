//! Windowed median-then-mean filter for raw range samples.
//!
//! ToF/phase range estimators produce isolated outliers on top of roughly
//! Gaussian noise. The sliding median strips the outliers, the mean of the
//! filtered sequence averages out the rest.

use crate::config::RangeFilterSection;
use std::collections::VecDeque;

pub struct RangeFilter {
    samples: VecDeque<f64>,
    median_filter_size: usize,
    required_measurements: usize,
    max_measurements: usize,
    cached: Option<f64>,
}

impl RangeFilter {
    pub fn new(
        median_filter_size: usize,
        required_measurements: usize,
        max_measurements: usize,
    ) -> Self {
        RangeFilter {
            samples: VecDeque::with_capacity(max_measurements + 1),
            median_filter_size,
            required_measurements,
            max_measurements,
            cached: None,
        }
    }

    pub fn from_config(cfg: &RangeFilterSection) -> Self {
        RangeFilter::new(
            cfg.median_filter_size,
            cfg.required_measurements,
            cfg.max_measurements,
        )
    }

    /// Appends a raw sample, dropping the oldest once the window is full.
    pub fn add(&mut self, sample: f64) {
        self.samples.push_back(sample);
        if self.samples.len() > self.max_measurements {
            self.samples.pop_front();
        }
        self.cached = None;
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// The current estimate, or `None` until enough samples have arrived.
    /// Idempotent between `add` calls.
    pub fn get(&mut self) -> Option<f64> {
        if let Some(v) = self.cached {
            return Some(v);
        }
        if self.samples.len() < self.required_measurements {
            return None;
        }

        // The half-window must be odd so the full window stays centered.
        let mut half = self.median_filter_size / 2;
        if half % 2 == 0 {
            half += 1;
        }

        let raw: Vec<f64> = self.samples.iter().copied().collect();
        if raw.len() < 2 * half + 1 {
            return None;
        }
        let filtered: Vec<f64> = (half..raw.len() - half)
            .map(|i| median(&raw[i - half..i + half]))
            .collect();

        let estimate = filtered.iter().sum::<f64>() / filtered.len() as f64;
        self.cached = Some(estimate);
        Some(estimate)
    }
}

impl Default for RangeFilter {
    fn default() -> Self {
        RangeFilter::from_config(&RangeFilterSection::default())
    }
}

fn median(window: &[f64]) -> f64 {
    let mut sorted = window.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
