//! Property tests for the perimeter sorter.

use nalgebra::Point3;
use proptest::prelude::*;

use windtap::sort_perimeter;

fn point_strategy() -> impl Strategy<Value = Point3<f64>> {
    (
        -100.0f64..100.0,
        -100.0f64..100.0,
        -100.0f64..100.0,
    )
        .prop_map(|(x, y, z)| Point3::new(x, y, z))
}

fn sorted_key(points: &[Point3<f64>]) -> Vec<[u64; 3]> {
    let mut keys: Vec<[u64; 3]> = points
        .iter()
        .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
        .collect();
    keys.sort_unstable();
    keys
}

proptest! {
    #[test]
    fn tour_is_a_closed_permutation_of_the_input(
        points in prop::collection::vec(point_strategy(), 1..40)
    ) {
        let tour = sort_perimeter(&points);
        // Every point once, plus the repeated first point at the end.
        prop_assert_eq!(tour.len(), points.len() + 1);
        prop_assert_eq!(tour.first(), tour.last());
        prop_assert_eq!(sorted_key(&tour[..points.len()]), sorted_key(&points));
    }

    #[test]
    fn tour_is_deterministic_for_fixed_input(
        points in prop::collection::vec(point_strategy(), 1..40)
    ) {
        let first = sort_perimeter(&points);
        let second = sort_perimeter(&points);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn tour_starts_at_first_input_point(
        points in prop::collection::vec(point_strategy(), 1..40)
    ) {
        let tour = sort_perimeter(&points);
        prop_assert_eq!(tour[0], points[0]);
    }
}
