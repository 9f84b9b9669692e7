//! Agglomerative clustering with Ward linkage.
//!
//! Builds the full merge tree with the nearest-neighbor chain algorithm over
//! a condensed matrix of squared Euclidean distances, then cuts it so that
//! exactly `k` clusters remain.

use crate::linalg::squared_distance;

/// Upper-triangular distance matrix stored row by row without the diagonal.
struct Condensed {
    n: usize,
    values: Vec<f64>,
}

impl Condensed {
    fn new(rows: &[Vec<f64>]) -> Self {
        let n = rows.len();
        let mut values = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                values.push(squared_distance(&rows[i], &rows[j]));
            }
        }
        Self { n, values }
    }

    const fn index(&self, a: usize, b: usize) -> usize {
        let (i, j) = if a < b { (a, b) } else { (b, a) };
        self.n * i - i * (i + 1) / 2 + (j - i - 1)
    }

    fn get(&self, a: usize, b: usize) -> f64 {
        self.values[self.index(a, b)]
    }

    fn set(&mut self, a: usize, b: usize, value: f64) {
        let idx = self.index(a, b);
        self.values[idx] = value;
    }
}

#[derive(Debug, Clone, Copy)]
struct Merge {
    a: usize,
    b: usize,
    height: f64,
}

/// Partitions `rows` into `k` clusters and returns one label per row.
///
/// `k` is clamped to `[1, rows.len()]`. Labels are `0..k`, numbered by the
/// first row in which each cluster appears.
#[must_use]
pub fn ward_clusters(rows: &[Vec<f64>], k: usize) -> Vec<u32> {
    let n = rows.len();
    if n == 0 {
        return vec![];
    }
    let k = k.clamp(1, n);

    let mut merges = merge_tree(rows);
    merges.sort_by(|x, y| x.height.total_cmp(&y.height));

    let mut parent: Vec<usize> = (0..n).collect();
    for merge in merges.iter().take(n - k) {
        let ra = find(&mut parent, merge.a);
        let rb = find(&mut parent, merge.b);
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let mut roots: Vec<usize> = Vec::with_capacity(k);
    (0..n)
        .map(|point| {
            let root = find(&mut parent, point);
            let label = roots.iter().position(|&r| r == root).unwrap_or_else(|| {
                roots.push(root);
                roots.len() - 1
            });
            u32::try_from(label).unwrap_or(u32::MAX)
        })
        .collect()
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// All `n - 1` merges in the order the chain discovers them.
///
/// Slot `s` always holds the cluster containing point `s`; a merge keeps the
/// lower slot alive.
fn merge_tree(rows: &[Vec<f64>]) -> Vec<Merge> {
    let n = rows.len();
    let mut distances = Condensed::new(rows);
    let mut size = vec![1usize; n];
    let mut active = vec![true; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    while merges.len() + 1 < n {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&alive| alive) {
                chain.push(first);
            }
        }

        let (a, b) = loop {
            let Some(&a) = chain.last() else {
                return merges;
            };
            let previous = chain.len().checked_sub(2).map(|idx| chain[idx]);

            let mut nearest = previous;
            let mut best = previous.map_or(f64::INFINITY, |p| distances.get(a, p));
            for candidate in (0..n).filter(|&c| active[c] && c != a) {
                let d = distances.get(a, candidate);
                if d < best {
                    best = d;
                    nearest = Some(candidate);
                }
            }

            let Some(b) = nearest else {
                return merges;
            };
            if Some(b) == previous {
                chain.truncate(chain.len() - 2);
                break (a, b);
            }
            chain.push(b);
        };

        let height = distances.get(a, b);
        let (keep, drop) = (a.min(b), a.max(b));
        #[allow(clippy::cast_precision_loss)]
        let (na, nb) = (size[a] as f64, size[b] as f64);

        for other in (0..n).filter(|&c| active[c] && c != a && c != b) {
            #[allow(clippy::cast_precision_loss)]
            let nk = size[other] as f64;
            let updated = ((na + nk) * distances.get(a, other) + (nb + nk) * distances.get(b, other)
                - nk * height)
                / (na + nb + nk);
            distances.set(keep, other, updated);
        }

        size[keep] += size[drop];
        active[drop] = false;
        merges.push(Merge {
            a: keep,
            b: drop,
            height,
        });
    }

    merges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![5.0, 5.0],
            vec![0.1, 0.0],
            vec![9.0, 0.0],
            vec![5.1, 5.0],
            vec![0.0, 0.1],
            vec![9.0, 0.1],
            vec![5.0, 5.1],
            vec![9.1, 0.0],
        ]
    }

    #[test]
    fn recovers_separated_groups() {
        let labels = ward_clusters(&three_blobs(), 3);
        assert_eq!(labels, vec![0, 1, 0, 2, 1, 0, 2, 1, 2]);
    }

    #[test]
    fn labels_are_numbered_by_first_appearance() {
        let labels = ward_clusters(&three_blobs(), 3);
        let mut seen = Vec::new();
        for label in labels {
            if !seen.contains(&label) {
                assert_eq!(label as usize, seen.len());
                seen.push(label);
            }
        }
    }

    #[test]
    fn clamps_cluster_count() {
        let rows = three_blobs();
        assert!(ward_clusters(&rows, 0).iter().all(|&l| l == 0));

        let mut all = ward_clusters(&rows, 50);
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), rows.len());
    }

    #[test]
    fn identical_rows_share_a_cluster() {
        let rows = vec![vec![1.0], vec![1.0], vec![7.0], vec![7.0]];
        assert_eq!(ward_clusters(&rows, 2), vec![0, 0, 1, 1]);
    }

    #[test]
    fn produces_n_minus_one_merges() {
        let rows = three_blobs();
        let merges = merge_tree(&rows);
        assert_eq!(merges.len(), rows.len() - 1);
        assert!(merges.iter().all(|m| m.a < m.b && m.height >= 0.0));
    }

    #[test]
    fn empty_input_yields_no_labels() {
        assert!(ward_clusters(&[], 4).is_empty());
    }
}
