use csv::Writer;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use simplex_mesh::models::Point2D;
use std::fs::File;

/// Synthesizes a recorded ranging session in the playback CSV format:
/// one ground-truth target, a handful of anchors, and a shuffled stream
/// of noisy range samples with uneven per-anchor rates.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let target = Point2D::new(3.0, 2.9);
    let anchors = [
        (Point2D::new(-1.0, 6.0), "AA:AA:38:D5:C0:ED"),
        (Point2D::new(8.0, 6.0), "BB:BB:38:D5:C0:ED"),
        (Point2D::new(9.0, -1.0), "CC:CC:38:D5:C0:ED"),
        (Point2D::new(-4.0, -1.0), "DD:DD:DD:DD:DD:DD"),
        (Point2D::new(-1.0, 11.0), "EE:EE:EE:EE:EE:EE"),
        (Point2D::new(3.0, -4.0), "FF:FF:FF:FF:FF:FF"),
    ];
    // The far anchors report much less often, as they do in the field.
    let weights = [12.0, 12.0, 12.0, 3.0, 2.0, 1.0];
    let total_weight: f64 = weights.iter().sum();

    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.2)?;

    let file = File::create("positioning.csv")?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(vec![
        "target".to_string(),
        target.x.to_string(),
        target.y.to_string(),
    ])?;
    for (position, address) in &anchors {
        wtr.write_record(vec![
            "anchor".to_string(),
            position.x.to_string(),
            position.y.to_string(),
            address.to_string(),
        ])?;
    }

    for _ in 0..300 {
        let mut pick = rng.random_range(0.0..total_weight);
        let mut chosen = 0;
        for (i, w) in weights.iter().enumerate() {
            if pick < *w {
                chosen = i;
                break;
            }
            pick -= w;
        }
        let (position, address) = &anchors[chosen];
        let measurement = position.distance_to(&target) + noise.sample(&mut rng);
        wtr.write_record(vec![
            "measurement".to_string(),
            format!("{:.2}", measurement),
            address.to_string(),
        ])?;
    }

    wtr.flush()?;
    println!("Generated positioning.csv with {} anchors.", anchors.len());
    Ok(())
}
