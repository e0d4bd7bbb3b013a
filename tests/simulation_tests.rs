use simplex_mesh::grid::Grid;
use simplex_mesh::models::Point2D;
use simplex_mesh::node::Strategy;
use simplex_mesh::simulation::Simulation;
use simplex_mesh::test_utils::{anchor_cluster_points, ladder_points, test_config};

#[test]
fn test_ladder_chain_completes_all_pairs() {
    // An elongated 2x6 ladder: each node reaches only the nearby columns,
    // so most pairs must be derived through the mesh.
    let mut config = test_config(2.3, 0.01);
    config.grid.n_anchors = 0;
    config.simulation.iterations = 4000;
    config.simulation.node = Strategy::RandomTargetHopLevel;
    config.simulation.seed = 11;

    let grid = Grid::from_points(ladder_points(6), 2.3, 0.01, 11).unwrap();
    let mut simulation = Simulation::with_grid(config, grid).unwrap();
    simulation.run();

    let n = simulation.network().node_count();
    assert_eq!(
        simulation.network().resolved_pairs().len(),
        n * (n - 1),
        "every directed pair should carry a resolved edge"
    );
    for a in 0..n {
        for b in 0..n {
            if a == b {
                continue;
            }
            let d = simulation
                .known_distance(a, b)
                .unwrap_or_else(|| panic!("pair ({}, {}) never resolved", a, b));
            let truth = simulation.grid().true_distance(a, b, true).unwrap();
            assert!(
                (d - truth).abs() < 0.25,
                "pair ({}, {}): got {}, truth {}",
                a,
                b,
                d,
                truth
            );
        }
    }
}

#[test]
fn test_resolved_edges_are_symmetric() {
    let mut config = test_config(2.3, 0.01);
    config.grid.n_anchors = 0;
    config.simulation.iterations = 2000;
    config.simulation.node = Strategy::RandomTargetHopLevel;
    config.simulation.seed = 5;

    let grid = Grid::from_points(ladder_points(5), 2.3, 0.01, 5).unwrap();
    let mut simulation = Simulation::with_grid(config, grid).unwrap();
    simulation.run();

    let n = simulation.network().node_count();
    for a in 0..n {
        for b in a + 1..n {
            let (Some(d_ab), d_ba) = (
                simulation.known_distance(a, b),
                simulation.known_distance(b, a),
            ) else {
                continue;
            };
            let d_ba = d_ba
                .unwrap_or_else(|| panic!("({}, {}) resolved but ({}, {}) did not", a, b, b, a));
            // Derived edges receive identical batches on both ends and
            // agree exactly; neighbor edges are measured independently.
            let neighbors = simulation
                .network()
                .get_node(a)
                .unwrap()
                .neighbors()
                .contains(&b);
            let tolerance = if neighbors { 0.05 } else { 1e-9 };
            assert!(
                (d_ab - d_ba).abs() < tolerance,
                "asymmetric edge ({}, {}): {} vs {}",
                a,
                b,
                d_ab,
                d_ba
            );
        }
    }
}

#[test]
fn test_anchor_reach_through_the_mesh() {
    // Three anchors on the left, four relays in the middle, and a test
    // node that cannot range any anchor directly.
    let mut config = test_config(3.0, 0.01);
    config.grid.n_anchors = 3;
    config.grid.n_required_anchors = 3;
    config.simulation.iterations = 3000;
    config.simulation.node = Strategy::RandomTargetHopLevel;
    config.simulation.seed = 21;

    let grid = Grid::from_points(anchor_cluster_points(), 3.0, 0.01, 21).unwrap();

    // Sanity on the topology itself: node 7 has no anchor neighbors.
    for anchor in 0..3 {
        assert!(
            !grid.neighbors_of(7).contains(&anchor),
            "topology broken: {} is a direct neighbor of the test node",
            anchor
        );
    }

    let mut simulation = Simulation::with_grid(config, grid).unwrap();
    simulation.run();

    let node = simulation.network().get_node(7).unwrap();
    assert!(node.anchor_reached(), "test node never collected 3 anchors");
    for anchor in 0..3 {
        let d = simulation
            .known_distance(7, anchor)
            .unwrap_or_else(|| panic!("distance to anchor {} unresolved", anchor));
        let truth = simulation.grid().true_distance(7, anchor, true).unwrap();
        assert!(
            (d - truth).abs() < 0.3,
            "anchor {}: got {}, truth {}",
            anchor,
            d,
            truth
        );
    }

    simulation.compute_positions();
    let node = simulation.network().get_node(7).unwrap();
    let position = node.position().expect("position fix after anchors reached");
    let truth = simulation.grid().true_position(7);
    // The anchors sit well to one side of the test node, so the fix
    // extrapolates and amplifies range error.
    assert!(
        position.distance_to(&truth) < 0.8,
        "fix ({}, {}) too far from truth ({}, {})",
        position.x,
        position.y,
        truth.x,
        truth.y
    );

    let report = simulation.report();
    assert!(report.n_anchored >= 4);
    assert!(report.nodes[7].anchor_reached);
}

#[test]
fn test_disconnected_component_halts_without_anchors() {
    // Two 4-cliques far apart; only the left one holds anchors. The right
    // one converges on its internal pairs and halts cleanly.
    let mut points = vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(1.0, 0.0),
        Point2D::new(0.0, 1.0),
        Point2D::new(1.0, 1.0),
    ];
    points.extend([
        Point2D::new(50.0, 50.0),
        Point2D::new(51.0, 50.0),
        Point2D::new(50.0, 51.0),
        Point2D::new(51.0, 51.0),
    ]);

    let mut config = test_config(2.0, 0.0);
    config.grid.n_anchors = 3;
    config.grid.n_required_anchors = 3;
    config.simulation.iterations = 100;
    config.simulation.node = Strategy::RandomTargetHopLevel;

    let grid = Grid::from_points(points, 2.0, 0.0, 9).unwrap();
    let mut simulation = Simulation::with_grid(config, grid).unwrap();
    simulation.run();

    for id in 4..8 {
        let node = simulation.network().get_node(id).unwrap();
        assert!(!node.anchor_reached(), "node {} cannot reach anchors", id);
        // Clique internals are all direct measurements.
        assert_eq!(node.completed_ids().len(), 3);
        for other in 4..8 {
            if other != id {
                assert!(simulation.known_distance(id, other).is_some());
            }
        }
        // Nothing from the far component ever becomes a target.
        for other in 0..4 {
            assert!(simulation.known_distance(id, other).is_none());
        }
    }

    // The left clique is fully anchored (node 3 neighbors all three
    // anchors); the right one contributes nothing.
    let report = simulation.report();
    assert_eq!(report.n_anchored, 4);
}
