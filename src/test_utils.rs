use crate::config::Config;
use crate::models::Point2D;

/// Two parallel rows of `columns` nodes, one unit apart in both axes. An
/// elongated chain topologically: with reach around 2.3 each node sees
/// only the nearby columns and far pairs must resolve through the mesh.
pub fn ladder_points(columns: usize) -> Vec<Point2D> {
    let mut points = Vec::with_capacity(columns * 2);
    for col in 0..columns {
        points.push(Point2D::new(col as f64, 0.0));
        points.push(Point2D::new(col as f64, 1.0));
    }
    points
}

/// A tight cluster of anchors and relays with one node hanging off the
/// far side, out of direct reach of every anchor. Built for reach 3.0:
///
/// * ids 0-2: anchors on the left,
/// * ids 3-6: relays in the middle, in reach of everything,
/// * id 7: the test node, neighbored only by the relays.
pub fn anchor_cluster_points() -> Vec<Point2D> {
    vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(0.5, 2.5),
        Point2D::new(2.0, 0.2),
        Point2D::new(2.2, 0.8),
        Point2D::new(2.4, 1.6),
        Point2D::new(2.4, 2.2),
        Point2D::new(2.4, 0.4),
        Point2D::new(5.0, 1.2),
    ]
}

/// Configuration tuned for small test topologies: short filter windows,
/// lenient clustering, and low noise so runs converge in few passes.
pub fn test_config(max_reach: f64, sd: f64) -> Config {
    let mut config = Config::default();
    config.node.max_reach = max_reach;
    config.measurement.sd = sd;
    config.solution_set.deriv_filter_size = 3;
    config.solution_set.deriv_filter_avg_threshold = 0.2;
    config.solution_set.max_reach_constant = 0.6;
    config
}
