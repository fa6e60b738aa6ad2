//! Greedy nearest-neighbour clustering.
//!
//! Used once per episode to partition resource patches into base
//! territories, and every tick to group visible enemy combat units.

use crate::math::{Fixed, Vec2Fixed};

/// Partition `points` into clusters by greedy nearest-neighbour growth.
///
/// Starting from the first unclaimed point, the cluster repeatedly absorbs
/// the unclaimed point closest to any of its members until that distance
/// exceeds `threshold`. Returns clusters as index lists into `points`, each
/// sorted ascending. The result is a partition: every index appears exactly
/// once.
#[must_use]
pub fn greedy_clusters(points: &[Vec2Fixed], threshold: Fixed) -> Vec<Vec<usize>> {
    let threshold_sq = threshold.saturating_mul(threshold);
    let mut unclaimed: Vec<usize> = (0..points.len()).collect();
    // Distance from each point to the nearest member of the growing cluster.
    let mut nearest = vec![Fixed::MAX; points.len()];
    let mut clusters = Vec::new();

    while !unclaimed.is_empty() {
        let seed = unclaimed.remove(0);
        let mut members = vec![seed];
        for &i in &unclaimed {
            nearest[i] = points[i].distance_squared(points[seed]);
        }

        loop {
            let best = unclaimed
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| nearest[**a].cmp(&nearest[**b]).then(a.cmp(b)));
            let Some((pos, &idx)) = best else {
                break;
            };
            if nearest[idx] > threshold_sq {
                break;
            }
            unclaimed.remove(pos);
            members.push(idx);
            for &i in &unclaimed {
                let d = points[i].distance_squared(points[idx]);
                if d < nearest[i] {
                    nearest[i] = d;
                }
            }
        }

        members.sort_unstable();
        clusters.push(members);
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::from_ints(x, y)
    }

    #[test]
    fn test_two_groups() {
        let points = vec![p(0, 0), p(1, 0), p(50, 50), p(2, 1), p(51, 50)];
        let clusters = greedy_clusters(&points, Fixed::from_num(3));
        assert_eq!(clusters, vec![vec![0, 1, 3], vec![2, 4]]);
    }

    #[test]
    fn test_chain_is_one_cluster() {
        // Each point is within threshold of the next but not of the first.
        let points: Vec<_> = (0..6).map(|i| p(i * 2, 0)).collect();
        let clusters = greedy_clusters(&points, Fixed::from_num(2));
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 6);
    }

    #[test]
    fn test_empty_input() {
        assert!(greedy_clusters(&[], Fixed::from_num(5)).is_empty());
    }

    proptest! {
        #[test]
        fn prop_clusters_partition_and_close(
            coords in proptest::collection::vec((0i32..120, 0i32..120), 0..40),
            threshold in 1i32..12,
        ) {
            let points: Vec<_> = coords.iter().map(|(x, y)| p(*x, *y)).collect();
            let t = Fixed::from_num(threshold);
            let clusters = greedy_clusters(&points, t);

            // Disjoint and complete.
            let mut owner = vec![None; points.len()];
            for (ci, cluster) in clusters.iter().enumerate() {
                for &i in cluster {
                    prop_assert!(owner[i].is_none(), "point {} in two clusters", i);
                    owner[i] = Some(ci);
                }
            }
            prop_assert!(owner.iter().all(Option::is_some));

            // Closed under the threshold: anything within reach of a member
            // belongs to that member's cluster.
            for (i, a) in points.iter().enumerate() {
                for (j, b) in points.iter().enumerate() {
                    if a.is_within(*b, t) {
                        prop_assert_eq!(owner[i], owner[j]);
                    }
                }
            }
        }
    }
}
