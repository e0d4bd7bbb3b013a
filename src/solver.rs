//! Stateless solver for the missing edge of a four-vertex complete graph.
//!
//! Five of the six pairwise distances are known; the sixth must make the
//! 5x5 bordered Cayley-Menger determinant of squared distances vanish,
//! which is the condition for the four points to embed in the plane. The
//! determinant is a quadratic polynomial in x = d03^2, so three
//! evaluations recover its coefficients and the candidates fall out of
//! the quadratic formula.

/// Determinant of a 5x5 matrix via LU elimination with partial pivoting.
fn det5(mut m: [[f64; 5]; 5]) -> f64 {
    let mut det = 1.0;
    for col in 0..5 {
        let mut pivot = col;
        for row in col + 1..5 {
            if m[row][col].abs() > m[pivot][col].abs() {
                pivot = row;
            }
        }
        if m[pivot][col] == 0.0 {
            return 0.0;
        }
        if pivot != col {
            m.swap(pivot, col);
            det = -det;
        }
        det *= m[col][col];
        for row in col + 1..5 {
            let factor = m[row][col] / m[col][col];
            for k in col..5 {
                m[row][k] -= factor * m[col][k];
            }
        }
    }
    det
}

/// The bordered determinant with `x` substituted for the unknown d03^2.
fn cayley_menger_det(sq: &[f64; 5], x: f64) -> f64 {
    let [q01, q02, q12, q13, q23] = *sq;
    det5([
        [0.0, q01, q02, x, 1.0],
        [q01, 0.0, q12, q13, 1.0],
        [q02, q12, 0.0, q23, 1.0],
        [x, q13, q23, 0.0, 1.0],
        [1.0, 1.0, 1.0, 1.0, 0.0],
    ])
}

/// Real roots of a*x^2 + b*x + c = 0 in ascending order. Degrades to the
/// linear solve when the quadratic coefficient vanishes.
fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a == 0.0 {
        if b == 0.0 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    if disc == 0.0 {
        return vec![-b / (2.0 * a)];
    }
    let rd = disc.sqrt();
    let mut roots = vec![(-b - rd) / (2.0 * a), (-b + rd) / (2.0 * a)];
    roots.sort_by(f64::total_cmp);
    roots
}

/// Candidate lengths for the edge p0-p3, given the other five edges of the
/// quadrilateral: p0-p1, p0-p2, p1-p2, p1-p3, p2-p3.
///
/// Returns 0, 1, or 2 candidates; an empty result means no planar
/// configuration matches the inputs and is a valid outcome, not an error.
pub fn simplex_diagonal(p0p1: f64, p0p2: f64, p1p2: f64, p1p3: f64, p2p3: f64) -> Vec<f64> {
    let sq = [
        p0p1 * p0p1,
        p0p2 * p0p2,
        p1p2 * p1p2,
        p1p3 * p1p3,
        p2p3 * p2p3,
    ];

    // Space the evaluation points by the input magnitude so the finite
    // differences below stay well conditioned.
    let scale = sq.iter().sum::<f64>() / 5.0;
    let s = if scale > 0.0 { scale } else { 1.0 };

    let f0 = cayley_menger_det(&sq, 0.0);
    let f1 = cayley_menger_det(&sq, s);
    let f2 = cayley_menger_det(&sq, 2.0 * s);

    let a = (f0 - 2.0 * f1 + f2) / (2.0 * s * s);
    let b = (-3.0 * f0 + 4.0 * f1 - f2) / (2.0 * s);
    let c = f0;

    quadratic_roots(a, b, c)
        .into_iter()
        .filter(|&r| r > 0.0)
        .map(f64::sqrt)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_right_quadrilateral_diagonal() {
        // p0=(0,0), p1=(3,0), p2=(0,4), p3=(3,4): the missing diagonal is 5.
        let roots = simplex_diagonal(3.0, 4.0, 5.0, 4.0, 3.0);
        assert!(
            roots.iter().any(|r| (r - 5.0).abs() < 1e-6),
            "expected a root near 5.0, got {:?}",
            roots
        );
    }

    #[test]
    fn test_random_noiseless_configurations() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let pts: Vec<(f64, f64)> = (0..4)
                .map(|_| (rng.random_range(0.0..10.0), rng.random_range(0.0..10.0)))
                .collect();
            let d = |i: usize, j: usize| -> f64 {
                let (xi, yi) = pts[i];
                let (xj, yj) = pts[j];
                ((xi - xj).powi(2) + (yi - yj).powi(2)).sqrt()
            };
            // Skip near-degenerate draws where either triangle through the
            // gate pair collapses and the roots become ill conditioned.
            let area = |a: (f64, f64), b: (f64, f64), c: (f64, f64)| -> f64 {
                ((b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)).abs() / 2.0
            };
            if area(pts[1], pts[2], pts[0]) < 0.5 || area(pts[1], pts[2], pts[3]) < 0.5 {
                continue;
            }
            let truth = d(0, 3);
            let roots = simplex_diagonal(d(0, 1), d(0, 2), d(1, 2), d(1, 3), d(2, 3));
            assert!(
                roots.iter().any(|r| (r - truth).abs() < 1e-6 * (1.0 + truth)),
                "true diagonal {} missing from {:?}",
                truth,
                roots
            );
        }
    }

    #[test]
    fn test_disjoint_circles_give_no_solution() {
        // p3 would need to be 1 away from both ends of a length-5 edge:
        // the circles around p1 and p2 never meet.
        let roots = simplex_diagonal(3.0, 4.0, 5.0, 1.0, 1.0);
        assert!(roots.is_empty(), "expected no candidates, got {:?}", roots);
    }

    #[test]
    fn test_quadratic_root_count_boundaries() {
        assert!(quadratic_roots(1.0, 0.0, 1.0).is_empty());
        assert_eq!(quadratic_roots(1.0, -2.0, 1.0), vec![1.0]);
        assert_eq!(quadratic_roots(1.0, 0.0, -1.0), vec![-1.0, 1.0]);
        // Vanishing quadratic coefficient degrades to the linear solve.
        assert_eq!(quadratic_roots(0.0, 2.0, -4.0), vec![2.0]);
        assert!(quadratic_roots(0.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_det5_known_value() {
        // Upper triangular: determinant is the diagonal product.
        let m = [
            [2.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 3.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 4.0, 1.0],
            [0.0, 0.0, 0.0, 0.0, 5.0],
        ];
        assert!((det5(m) - 120.0).abs() < 1e-9);
    }
}
