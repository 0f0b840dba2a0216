//! Density-based clustering (HDBSCAN) over Euclidean distance.
//!
//! Core distances use `min_samples = min_cluster_size`, the spanning tree is
//! built over mutual-reachability distance, and flat clusters are chosen from
//! the condensed tree by excess of mass. The root is never a candidate, so a
//! dataset with no stable split comes back as all noise (−1).

use crate::embeddings::util::pairwise_distances;
use std::collections::HashMap;

const MIN_DIST: f64 = 1e-12;

/// One merge of the single-linkage dendrogram. Node ids `< n` are points.
#[derive(Debug, Clone, Copy)]
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

/// A row of the condensed tree: `child` (a point or a cluster) leaves
/// `parent` at density `lambda`.
#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: usize,
    lambda: f64,
    child_size: usize,
    is_cluster: bool,
}

fn core_distances(dist: &[Vec<f64>], min_samples: usize) -> Vec<f64> {
    let k = min_samples.clamp(1, dist.len()) - 1;
    dist.iter()
        .map(|row| {
            let mut sorted = row.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            sorted[k]
        })
        .collect()
}

/// Prim's algorithm on the dense mutual-reachability graph.
fn mst(dist: &[Vec<f64>], core: &[f64]) -> Vec<(usize, usize, f64)> {
    let n = dist.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut from = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    in_tree[0] = true;
    for _ in 1..n {
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            let mr = dist[current][j].max(core[current]).max(core[j]);
            if mr < best[j] {
                best[j] = mr;
                from[j] = current;
            }
        }
        let mut next = usize::MAX;
        let mut next_w = f64::INFINITY;
        for j in 0..n {
            if !in_tree[j] && (next == usize::MAX || best[j] < next_w) {
                next = j;
                next_w = best[j];
            }
        }
        in_tree[next] = true;
        edges.push((from[next], next, next_w));
        current = next;
    }
    edges
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }
}

/// Builds the dendrogram; merge `i` creates node `n + i`.
fn single_linkage(n: usize, mut edges: Vec<(usize, usize, f64)>) -> Vec<Merge> {
    edges.sort_by(|a, b| a.2.total_cmp(&b.2));
    let mut uf = UnionFind::new(2 * n - 1);
    let mut size = vec![1usize; 2 * n - 1];
    let mut merges = Vec::with_capacity(n - 1);

    for (a, b, w) in edges {
        let ra = uf.find(a);
        let rb = uf.find(b);
        let node = n + merges.len();
        uf.parent[ra] = node;
        uf.parent[rb] = node;
        size[node] = size[ra] + size[rb];
        merges.push(Merge {
            left: ra,
            right: rb,
            distance: w,
            size: size[node],
        });
    }
    merges
}

fn leaves(node: usize, n: usize, merges: &[Merge], out: &mut Vec<usize>) {
    let mut stack = vec![node];
    while let Some(x) = stack.pop() {
        if x < n {
            out.push(x);
        } else {
            let m = &merges[x - n];
            stack.push(m.left);
            stack.push(m.right);
        }
    }
}

fn node_size(node: usize, n: usize, merges: &[Merge]) -> usize {
    if node < n {
        1
    } else {
        merges[node - n].size
    }
}

/// Condenses the dendrogram. Cluster ids start at `n` (the root); children
/// always get larger ids than their parent.
fn condense(n: usize, merges: &[Merge], min_cluster_size: usize) -> Vec<CondensedEdge> {
    let root = 2 * n - 2;
    let mut out = Vec::new();
    let mut next_label = n + 1;
    let mut stack = vec![(root, n)];

    while let Some((node, label)) = stack.pop() {
        if node < n {
            continue;
        }
        let m = merges[node - n];
        let lambda = 1.0 / m.distance.max(MIN_DIST);
        let left_size = node_size(m.left, n, merges);
        let right_size = node_size(m.right, n, merges);
        let left_big = left_size >= min_cluster_size;
        let right_big = right_size >= min_cluster_size;

        let fall_out = |child: usize, out: &mut Vec<CondensedEdge>| {
            let mut pts = Vec::new();
            leaves(child, n, merges, &mut pts);
            for p in pts {
                out.push(CondensedEdge {
                    parent: label,
                    child: p,
                    lambda,
                    child_size: 1,
                    is_cluster: false,
                });
            }
        };

        match (left_big, right_big) {
            (true, true) => {
                for (child, size) in [(m.left, left_size), (m.right, right_size)] {
                    let id = next_label;
                    next_label += 1;
                    out.push(CondensedEdge {
                        parent: label,
                        child: id,
                        lambda,
                        child_size: size,
                        is_cluster: true,
                    });
                    stack.push((child, id));
                }
            }
            (false, false) => {
                fall_out(m.left, &mut out);
                fall_out(m.right, &mut out);
            }
            (true, false) => {
                fall_out(m.right, &mut out);
                stack.push((m.left, label));
            }
            (false, true) => {
                fall_out(m.left, &mut out);
                stack.push((m.right, label));
            }
        }
    }
    out
}

/// Excess-of-mass selection. Returns the selected cluster ids.
fn select_clusters(tree: &[CondensedEdge], root: usize) -> Vec<usize> {
    let mut birth: HashMap<usize, f64> = HashMap::new();
    birth.insert(root, 0.0);
    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    for e in tree.iter().filter(|e| e.is_cluster) {
        birth.insert(e.child, e.lambda);
        children.entry(e.parent).or_default().push(e.child);
    }

    let mut stability: HashMap<usize, f64> = birth.keys().map(|c| (*c, 0.0)).collect();
    for e in tree {
        let b = birth.get(&e.parent).copied().unwrap_or(0.0);
        if let Some(s) = stability.get_mut(&e.parent) {
            *s += (e.lambda - b) * e.child_size as f64;
        }
    }

    let mut ids: Vec<usize> = stability.keys().copied().filter(|c| *c != root).collect();
    ids.sort_unstable_by(|a, b| b.cmp(a));

    let mut selected: HashMap<usize, bool> = ids.iter().map(|c| (*c, true)).collect();
    for c in ids.iter().copied() {
        let kids = children.get(&c).cloned().unwrap_or_default();
        let child_total: f64 = kids.iter().filter_map(|k| stability.get(k)).sum();
        let own = stability.get(&c).copied().unwrap_or(0.0);
        if child_total > own {
            selected.insert(c, false);
            stability.insert(c, child_total);
        } else {
            let mut stack = kids;
            while let Some(d) = stack.pop() {
                selected.insert(d, false);
                if let Some(grand) = children.get(&d) {
                    stack.extend(grand.iter().copied());
                }
            }
        }
    }

    let mut out: Vec<usize> = selected
        .into_iter()
        .filter_map(|(c, keep)| keep.then_some(c))
        .collect();
    out.sort_unstable();
    out
}

/// Labels each point with the selected cluster it belongs to, −1 for noise.
/// Cluster numbers are assigned by first appearance in input order.
pub fn hdbscan(points: &[Vec<f32>], min_cluster_size: usize) -> Vec<i32> {
    let n = points.len();
    let min_cluster_size = min_cluster_size.max(2);
    if n < min_cluster_size || n < 2 {
        return vec![-1; n];
    }

    let dist = pairwise_distances(points);
    let core = core_distances(&dist, min_cluster_size);
    let merges = single_linkage(n, mst(&dist, &core));
    let tree = condense(n, &merges, min_cluster_size);
    let selected = select_clusters(&tree, n);

    let mut cluster_parent: HashMap<usize, usize> = HashMap::new();
    let mut point_parent = vec![n; n];
    for e in &tree {
        if e.is_cluster {
            cluster_parent.insert(e.child, e.parent);
        } else {
            point_parent[e.child] = e.parent;
        }
    }

    let mut number: HashMap<usize, i32> = HashMap::new();
    point_parent
        .iter()
        .map(|&start| {
            let mut c = start;
            loop {
                if selected.binary_search(&c).is_ok() {
                    let next = number.len() as i32;
                    return *number.entry(c).or_insert(next);
                }
                match cluster_parent.get(&c) {
                    Some(p) => c = *p,
                    None => return -1,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(cx: f32, cy: f32, count: usize) -> Vec<Vec<f32>> {
        (0..count)
            .map(|i| {
                let t = i as f32;
                vec![cx + (t % 3.0) * 0.1, cy + (t / 3.0).floor() * 0.1]
            })
            .collect()
    }

    #[test]
    fn finds_two_dense_groups() {
        let mut pts = blob(0.0, 0.0, 8);
        pts.extend(blob(10.0, 10.0, 8));
        let labels = hdbscan(&pts, 5);
        assert_eq!(labels.len(), 16);
        assert!(labels[..8].iter().all(|l| *l == labels[0]));
        assert!(labels[8..].iter().all(|l| *l == labels[8]));
        assert_eq!(labels[0], 0);
        assert_eq!(labels[8], 1);
    }

    #[test]
    fn isolated_point_is_noise() {
        let mut pts = blob(0.0, 0.0, 6);
        pts.extend(blob(10.0, 0.0, 6));
        pts.push(vec![100.0, 100.0]);
        let labels = hdbscan(&pts, 4);
        assert_eq!(labels[12], -1);
        assert!(labels[..6].iter().all(|l| *l == 0));
        assert!(labels[6..12].iter().all(|l| *l == 1));
    }

    #[test]
    fn single_blob_is_never_one_root_cluster() {
        let labels = hdbscan(&blob(0.0, 0.0, 9), 5);
        let clusters: std::collections::BTreeSet<_> =
            labels.iter().filter(|l| **l >= 0).collect();
        assert!(clusters.len() != 1 || labels.iter().any(|l| *l == -1));
    }

    #[test]
    fn too_few_points_are_all_noise() {
        assert_eq!(hdbscan(&blob(0.0, 0.0, 3), 5), vec![-1, -1, -1]);
        assert!(hdbscan(&[], 5).is_empty());
    }

    #[test]
    fn duplicate_points_do_not_divide_by_zero() {
        let mut pts = vec![vec![1.0, 1.0]; 6];
        pts.extend(vec![vec![9.0, 9.0]; 6]);
        let labels = hdbscan(&pts, 3);
        assert!(labels[..6].iter().all(|l| *l == labels[0] && *l >= 0));
        assert!(labels[6..].iter().all(|l| *l == labels[6] && *l >= 0));
        assert_ne!(labels[0], labels[6]);
    }
}
