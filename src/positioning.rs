//! 2D position fix from anchor distances.
//!
//! Subtracting the range equation of a reference anchor from the others
//! linearizes the system; the normal equations of the resulting
//! overdetermined system are solved directly (2x2, Cramer's rule).

use crate::models::Point2D;

/// Least-squares fix from at least three anchors. Returns `None` for too
/// few anchors, mismatched inputs, or a singular geometry (anchors nearly
/// collinear).
pub fn position_from_anchors(anchors: &[Point2D], distances: &[f64]) -> Option<Point2D> {
    if anchors.len() != distances.len() || anchors.len() < 3 {
        return None;
    }
    let (a0, rest_anchors) = anchors.split_last()?;
    let (d0, rest_distances) = distances.split_last()?;

    let mut ata = [[0.0f64; 2]; 2];
    let mut atb = [0.0f64; 2];
    for (ai, di) in rest_anchors.iter().zip(rest_distances) {
        let row = [2.0 * (ai.x - a0.x), 2.0 * (ai.y - a0.y)];
        let rhs = (d0 * d0 - di * di) - (a0.x * a0.x - ai.x * ai.x)
            - (a0.y * a0.y - ai.y * ai.y);
        ata[0][0] += row[0] * row[0];
        ata[0][1] += row[0] * row[1];
        ata[1][0] += row[1] * row[0];
        ata[1][1] += row[1] * row[1];
        atb[0] += row[0] * rhs;
        atb[1] += row[1] * rhs;
    }

    let det = ata[0][0] * ata[1][1] - ata[0][1] * ata[1][0];
    if det.abs() < 1e-9 {
        return None;
    }
    let x = (ata[1][1] * atb[0] - ata[0][1] * atb[1]) / det;
    let y = (ata[0][0] * atb[1] - ata[1][0] * atb[0]) / det;
    Some(Point2D::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distances_to(target: Point2D, anchors: &[Point2D]) -> Vec<f64> {
        anchors.iter().map(|a| a.distance_to(&target)).collect()
    }

    #[test]
    fn test_exact_three_anchor_fix() {
        let anchors = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(0.0, 4.0),
        ];
        let target = Point2D::new(1.0, 1.0);
        let fix = position_from_anchors(&anchors, &distances_to(target, &anchors)).unwrap();
        assert!(fix.distance_to(&target) < 1e-9);
    }

    #[test]
    fn test_overdetermined_fix() {
        let anchors = vec![
            Point2D::new(-1.0, 6.0),
            Point2D::new(8.0, 6.0),
            Point2D::new(9.0, -1.0),
            Point2D::new(-4.0, -1.0),
            Point2D::new(-1.0, 11.0),
        ];
        let target = Point2D::new(3.0, 2.9);
        let fix = position_from_anchors(&anchors, &distances_to(target, &anchors)).unwrap();
        assert!(fix.distance_to(&target) < 1e-9);
    }

    #[test]
    fn test_too_few_anchors() {
        let anchors = vec![Point2D::new(0.0, 0.0), Point2D::new(4.0, 0.0)];
        assert!(position_from_anchors(&anchors, &[1.0, 3.0]).is_none());
    }

    #[test]
    fn test_collinear_anchors_are_singular() {
        let anchors = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(2.0, 0.0),
        ];
        assert!(position_from_anchors(&anchors, &[1.0, 1.0, 1.0]).is_none());
    }

    #[test]
    fn test_mismatched_lengths() {
        let anchors = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(0.0, 4.0),
        ];
        assert!(position_from_anchors(&anchors, &[1.0, 2.0]).is_none());
    }
}
