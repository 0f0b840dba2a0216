use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_ITER: usize = 300;

#[derive(Debug, Clone, Copy)]
pub struct KMeansParams {
    pub k: usize,
    pub n_init: usize,
    pub seed: u64,
}

fn sq_dist(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum()
}

fn nearest(point: &[f32], centroids: &[Vec<f32>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.iter().enumerate() {
        let d = sq_dist(point, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

/// k-means++ seeding: each next centroid is drawn with probability
/// proportional to its squared distance from the closest chosen one.
fn init_plus_plus(points: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let n = points.len();
    let mut centroids = vec![points[rng.random_range(0..n)].clone()];
    let mut d2: Vec<f64> = points.iter().map(|p| sq_dist(p, &centroids[0])).collect();

    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let idx = if total <= 0.0 {
            rng.random_range(0..n)
        } else {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = n - 1;
            for (i, w) in d2.iter().enumerate() {
                if target < *w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        };
        let c = points[idx].clone();
        for (i, p) in points.iter().enumerate() {
            d2[i] = d2[i].min(sq_dist(p, &c));
        }
        centroids.push(c);
    }
    centroids
}

/// One Lloyd run from the given seeds. Returns (assignments, inertia).
fn lloyd(points: &[Vec<f32>], mut centroids: Vec<Vec<f32>>) -> (Vec<usize>, f64) {
    let k = centroids.len();
    let dims = points[0].len();
    let mut assign = vec![usize::MAX; points.len()];

    for _ in 0..MAX_ITER {
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let (c, _) = nearest(p, &centroids);
            if assign[i] != c {
                assign[i] = c;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![vec![0.0f64; dims]; k];
        let mut counts = vec![0usize; k];
        for (i, p) in points.iter().enumerate() {
            counts[assign[i]] += 1;
            for (s, x) in sums[assign[i]].iter_mut().zip(p) {
                *s += *x as f64;
            }
        }
        for c in 0..k {
            if counts[c] == 0 {
                // Empty cluster: reseed at the point farthest from its centroid.
                let far = (0..points.len())
                    .max_by(|&a, &b| {
                        sq_dist(&points[a], &centroids[assign[a]])
                            .total_cmp(&sq_dist(&points[b], &centroids[assign[b]]))
                    })
                    .unwrap_or(0);
                centroids[c] = points[far].clone();
                assign[far] = c;
                continue;
            }
            centroids[c] = sums[c].iter().map(|s| (s / counts[c] as f64) as f32).collect();
        }
    }

    let inertia = points
        .iter()
        .zip(&assign)
        .map(|(p, c)| sq_dist(p, &centroids[*c]))
        .sum();
    (assign, inertia)
}

/// Renumbers clusters by first appearance so equal partitions get equal labels.
fn canonical(assign: &[usize]) -> Vec<i32> {
    let mut map: Vec<Option<i32>> = Vec::new();
    let mut next = 0;
    assign
        .iter()
        .map(|&c| {
            if map.len() <= c {
                map.resize(c + 1, None);
            }
            *map[c].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}

/// Best-of-`n_init` k-means++ / Lloyd. `k` is capped at the number of points.
pub fn kmeans(points: &[Vec<f32>], params: KMeansParams) -> Vec<i32> {
    if points.is_empty() {
        return Vec::new();
    }
    let k = params.k.clamp(1, points.len());
    let mut rng = StdRng::seed_from_u64(params.seed);

    let mut best: Option<(Vec<usize>, f64)> = None;
    for _ in 0..params.n_init.max(1) {
        let seeds = init_plus_plus(points, k, &mut rng);
        let (assign, inertia) = lloyd(points, seeds);
        let better = match &best {
            None => true,
            Some((_, b)) => inertia < *b,
        };
        if better {
            best = Some((assign, inertia));
        }
    }
    best.map(|(a, _)| canonical(&a)).unwrap_or_default()
}
