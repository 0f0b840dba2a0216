use crate::embeddings::util::euclidean_distance;
use std::collections::BTreeMap;

/// Mean silhouette coefficient over non-noise points, Euclidean.
///
/// Returns 0.0 when fewer than two clusters or fewer than two non-noise
/// points remain. Points in singleton clusters score 0.
pub fn silhouette_score(points: &[Vec<f32>], labels: &[i32]) -> f64 {
    let members: Vec<(usize, i32)> = labels
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, l)| *l >= 0)
        .collect();
    if members.len() < 2 {
        return 0.0;
    }

    let mut sizes: BTreeMap<i32, usize> = BTreeMap::new();
    for (_, l) in &members {
        *sizes.entry(*l).or_default() += 1;
    }
    if sizes.len() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    for &(i, li) in &members {
        if sizes[&li] == 1 {
            continue;
        }
        let mut sums: BTreeMap<i32, f64> = BTreeMap::new();
        for &(j, lj) in &members {
            if i != j {
                *sums.entry(lj).or_default() += euclidean_distance(&points[i], &points[j]);
            }
        }
        let a = sums.get(&li).copied().unwrap_or(0.0) / (sizes[&li] - 1) as f64;
        let b = sums
            .iter()
            .filter(|(l, _)| **l != li)
            .map(|(l, s)| s / sizes[l] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    total / members.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 0.0],
            vec![10.0, 1.0],
        ]
    }

    #[test]
    fn separated_blobs_score_high() {
        let s = silhouette_score(&blobs(), &[0, 0, 1, 1]);
        assert!(s > 0.85, "{s}");
        assert!(s <= 1.0);
    }

    #[test]
    fn bad_partition_scores_negative() {
        let s = silhouette_score(&blobs(), &[0, 1, 1, 0]);
        assert!(s < 0.0, "{s}");
    }

    #[test]
    fn degenerate_inputs_are_zero() {
        assert_eq!(silhouette_score(&blobs(), &[0, 0, 0, 0]), 0.0);
        assert_eq!(silhouette_score(&blobs(), &[-1, -1, -1, 0]), 0.0);
        assert_eq!(silhouette_score(&[], &[]), 0.0);
    }

    #[test]
    fn noise_is_excluded() {
        let mut pts = blobs();
        pts.push(vec![5.0, 50.0]);
        let with_noise = silhouette_score(&pts, &[0, 0, 1, 1, -1]);
        let without = silhouette_score(&blobs(), &[0, 0, 1, 1]);
        assert!((with_noise - without).abs() < 1e-12);
    }
}
