//! Ordering of unstructured boundary points into a drawable outline.

use nalgebra::Point3;

/// Order a pool of boundary points into a closed polyline by greedy
/// nearest-neighbor traversal.
///
/// The tour starts at the first input point; each step moves to the
/// closest remaining point (3D Euclidean distance), ties resolved to the
/// lowest remaining input index so the result is deterministic for a
/// given input order. Reordering the input may change the tour. The input
/// slice is not modified; the output visits every point exactly once and
/// repeats the first point at the end to close the loop (length n + 1).
///
/// Greedy traversal can self-cross on non-convex, multi-lobed outlines.
/// That is accepted: physical surface outlines this tool draws are simple
/// shapes, and the result is used only as a visual outline.
pub fn sort_perimeter(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut remaining: Vec<usize> = (1..points.len()).collect();
    let mut tour = Vec::with_capacity(points.len() + 1);
    let mut current = points[0];
    tour.push(current);

    while !remaining.is_empty() {
        let mut best_slot = 0;
        let mut best_dist = f64::INFINITY;
        for (slot, &idx) in remaining.iter().enumerate() {
            let dist = (points[idx] - current).norm_squared();
            if dist < best_dist {
                best_dist = dist;
                best_slot = slot;
            }
        }

        // Ordered removal keeps `remaining` ascending, so the strict `<`
        // above resolves ties to the lowest remaining input index.
        let next = remaining.remove(best_slot);
        current = points[next];
        tour.push(current);
    }

    tour.push(points[0]);
    tour
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_corners() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_square_tour_is_closed_and_visits_each_once() {
        let tour = sort_perimeter(&square_corners());
        // Each corner once, plus the repeated first point: n + 1.
        assert_eq!(tour.len(), 5);
        assert_eq!(tour.first(), tour.last());
        for corner in square_corners() {
            assert_eq!(tour[..4].iter().filter(|p| **p == corner).count(), 1);
        }
    }

    #[test]
    fn test_square_tour_is_adjacent_walk() {
        // From (0,0) the nearest corners are the two unit-distance ones,
        // never the diagonal; a greedy tour walks the square's edges.
        let tour = sort_perimeter(&square_corners());
        for w in tour.windows(2) {
            let step = (w[1] - w[0]).norm();
            assert!((step - 1.0).abs() < 1e-12, "diagonal step in tour: {}", step);
        }
    }

    #[test]
    fn test_tie_breaks_to_lowest_index() {
        // Both (1,0) and (0,1) are distance 1 from the start; index order
        // decides.
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let tour = sort_perimeter(&points);
        assert_eq!(tour[1], points[1]);
    }

    #[test]
    fn test_input_not_mutated() {
        let points = square_corners();
        let copy = points.clone();
        let _ = sort_perimeter(&points);
        assert_eq!(points, copy);
    }

    #[test]
    fn test_small_inputs() {
        assert!(sort_perimeter(&[]).is_empty());
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(sort_perimeter(&[p]), vec![p, p]);
    }
}
