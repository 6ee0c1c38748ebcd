//! Bagged CART regression trees (random forest).
//!
//! Trees live in a flat node arena and reference children by index. Each
//! tree owns an RNG seeded from the forest seed and its tree index, so the
//! ensemble is identical no matter how rayon schedules tree construction.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::samples::FEATURE_COUNT;

/// One feature vector in model order.
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Resolved forest hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn per split, 1..=FEATURE_COUNT.
    pub max_features: usize,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: FEATURE_COUNT,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: u32,
        right: u32,
    },
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
}

/// A single regression tree minimizing squared error.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grows a tree on the given row indices (repeats allowed, as produced
    /// by bootstrap sampling).
    pub fn fit(x: &[FeatureRow], y: &[f64], rows: Vec<usize>, params: &ForestParams, rng: &mut ChaCha8Rng) -> Self {
        let mut rows = rows;
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        if rows.is_empty() {
            return Self { nodes };
        }

        // (node id, start, end, depth) over `rows`
        let mut stack: Vec<(usize, usize, usize, usize)> = vec![(0, 0, rows.len(), 0)];

        while let Some((id, start, end, depth)) = stack.pop() {
            let slice = &mut rows[start..end];
            let n = slice.len();
            let mean = slice.iter().map(|&r| y[r]).sum::<f64>() / n as f64;

            let splittable = n >= params.min_samples_split
                && params.max_depth.map_or(true, |d| depth < d)
                && !is_constant(y, slice);

            let split = if splittable {
                best_split(x, y, slice, params, rng)
            } else {
                None
            };

            match split {
                None => nodes[id] = Node::Leaf { value: mean },
                Some(s) => {
                    let n_left = partition(slice, |r| x[r][s.feature] <= s.threshold);
                    let left = nodes.len();
                    nodes.push(Node::Leaf { value: 0.0 });
                    nodes.push(Node::Leaf { value: 0.0 });
                    nodes[id] = Node::Split {
                        feature: s.feature,
                        threshold: s.threshold,
                        left: left as u32,
                        right: (left + 1) as u32,
                    };
                    stack.push((left + 1, start + n_left, end, depth + 1));
                    stack.push((left, start, start + n_left, depth + 1));
                }
            }
        }

        Self { nodes }
    }

    /// Predicted value for one row.
    pub fn predict(&self, row: &FeatureRow) -> f64 {
        let mut id = 0usize;
        loop {
            match self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // NaN compares false and falls to the right child.
                    id = if row[feature] <= threshold { left } else { right } as usize;
                }
            }
        }
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    /// Longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, d)) = stack.pop() {
            match self.nodes[id] {
                Node::Leaf { .. } => max = max.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left as usize, d + 1));
                    stack.push((right as usize, d + 1));
                }
            }
        }
        max
    }
}

fn is_constant(y: &[f64], rows: &[usize]) -> bool {
    let first = y[rows[0]];
    rows.iter().all(|&r| y[r] == first)
}

/// Moves rows satisfying `goes_left` to the front; returns how many did.
fn partition(rows: &mut [usize], goes_left: impl Fn(usize) -> bool) -> usize {
    let mut i = 0;
    for j in 0..rows.len() {
        if goes_left(rows[j]) {
            rows.swap(i, j);
            i += 1;
        }
    }
    i
}

/// Finds the split maximizing squared-error reduction.
///
/// Minimizing the children's SSE is equivalent to maximizing
/// `S_l² / n_l + S_r² / n_r` where `S` are label sums. Ties keep the first
/// candidate in (feature draw order, ascending threshold) order.
fn best_split(
    x: &[FeatureRow],
    y: &[f64],
    rows: &[usize],
    params: &ForestParams,
    rng: &mut ChaCha8Rng,
) -> Option<Split> {
    let n = rows.len();
    let min_leaf = params.min_samples_leaf.max(1);

    let mut features: [usize; FEATURE_COUNT] = std::array::from_fn(|i| i);
    let k = params.max_features.clamp(1, FEATURE_COUNT);
    if k < FEATURE_COUNT {
        for i in 0..k {
            let j = rng.random_range(i..FEATURE_COUNT);
            features.swap(i, j);
        }
    }

    let total: f64 = rows.iter().map(|&r| y[r]).sum();
    let parent = total * total / n as f64;
    let mut best_score = parent;
    let mut best: Option<Split> = None;

    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);
    for &feature in &features[..k] {
        pairs.clear();
        pairs.extend(rows.iter().map(|&r| (x[r][feature], y[r])));
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for i in 1..n {
            left_sum += pairs[i - 1].1;
            let (n_left, n_right) = (i, n - i);
            if n_right < min_leaf {
                break;
            }
            if n_left < min_leaf || !(pairs[i - 1].0 < pairs[i].0) {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
            if score > best_score + 1e-12 * best_score.abs() {
                let (lo, hi) = (pairs[i - 1].0, pairs[i].0);
                let mid = lo + (hi - lo) / 2.0;
                best_score = score;
                best = Some(Split {
                    feature,
                    threshold: if mid < hi { mid } else { lo },
                });
            }
        }
    }

    best
}

/// Ensemble of bootstrap-trained regression trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Trains `params.n_estimators` trees in parallel.
    pub fn fit(x: &[FeatureRow], y: &[f64], params: &ForestParams) -> Self {
        let n = x.len().min(y.len());

        let trees = (0..params.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(tree_seed(params.seed, t));
                let rows: Vec<usize> = if params.bootstrap && n > 0 {
                    (0..n).map(|_| rng.random_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(x, y, rows, params, &mut rng)
            })
            .collect();

        Self { trees }
    }

    /// Mean prediction across trees, clipped to [0, 1].
    pub fn predict(&self, row: &FeatureRow) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        let mean = sum / self.trees.len() as f64;
        if mean.is_finite() {
            mean.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Predicts many rows in parallel; each row's sum runs in tree order.
    pub fn predict_batch(&self, rows: &[FeatureRow]) -> Vec<f64> {
        rows.par_iter().map(|r| self.predict(r)).collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

#[inline]
fn tree_seed(seed: u64, tree: usize) -> u64 {
    seed.wrapping_add((tree as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data(n: usize) -> (Vec<FeatureRow>, Vec<f64>) {
        let x: Vec<FeatureRow> = (0..n).map(|i| [i as f64, 0.0, 0.0, 0.0, (i % 7) as f64]).collect();
        let y: Vec<f64> = (0..n).map(|i| if i < n / 2 { 0.2 } else { 0.8 }).collect();
        (x, y)
    }

    #[test]
    fn test_single_tree_learns_step() {
        let (x, y) = step_data(40);
        let params = ForestParams {
            bootstrap: false,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = RegressionTree::fit(&x, &y, (0..x.len()).collect(), &params, &mut rng);

        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.depth(), 1);
        let close = |a: f64, b: f64| (a - b).abs() < 1e-12;
        assert!(close(tree.predict(&[3.0, 0.0, 0.0, 0.0, 0.0]), 0.2));
        assert!(close(tree.predict(&[35.0, 0.0, 0.0, 0.0, 0.0]), 0.8));
        // Threshold sits halfway between 19 and 20.
        assert!(close(tree.predict(&[19.4, 0.0, 0.0, 0.0, 0.0]), 0.2));
        assert!(close(tree.predict(&[19.6, 0.0, 0.0, 0.0, 0.0]), 0.8));
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x: Vec<FeatureRow> = (0..10).map(|i| [i as f64; 5]).collect();
        let y = vec![0.5; 10];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = RegressionTree::fit(&x, &y, (0..10).collect(), &ForestParams::default(), &mut rng);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict(&[100.0; 5]), 0.5);
    }

    #[test]
    fn test_max_depth_respected() {
        let x: Vec<FeatureRow> = (0..64).map(|i| [i as f64, 0.0, 0.0, 0.0, 0.0]).collect();
        let y: Vec<f64> = (0..64).map(|i| (i as f64 / 64.0).powi(2)).collect();
        let params = ForestParams {
            max_depth: Some(3),
            bootstrap: false,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = RegressionTree::fit(&x, &y, (0..64).collect(), &params, &mut rng);
        assert!(tree.depth() <= 3);
        assert!(tree.n_leaves() <= 8);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let (x, y) = step_data(10);
        let params = ForestParams {
            min_samples_leaf: 6,
            bootstrap: false,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = RegressionTree::fit(&x, &y, (0..10).collect(), &params, &mut rng);
        // Any split of 10 rows leaves one side with fewer than 6.
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn test_forest_predictions_bounded() {
        let (x, y) = step_data(50);
        let forest = RandomForest::fit(
            &x,
            &y,
            &ForestParams {
                n_estimators: 20,
                ..Default::default()
            },
        );
        assert_eq!(forest.n_trees(), 20);

        let probes = [[-1e12, 0.0, 0.0, 0.0, 0.0], [1e12, 1e12, 1e12, 1e12, 1e12], [f64::NAN; 5]];
        for p in &probes {
            let v = forest.predict(p);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_forest_independent_of_thread_count() {
        let x: Vec<FeatureRow> = (0..120)
            .map(|i| {
                let f = i as f64;
                [f.sin() * 10.0, f.cos(), (f * 0.37) % 5.0, f / 120.0, (i % 11) as f64]
            })
            .collect();
        let y: Vec<f64> = x.iter().map(|r| ((r[0] / 10.0 + 1.0) / 2.0 * r[3]).clamp(0.0, 1.0)).collect();
        let params = ForestParams {
            n_estimators: 16,
            max_features: 3,
            seed: 7,
            ..Default::default()
        };

        let run = |threads: usize| {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
            pool.install(|| {
                let forest = RandomForest::fit(&x, &y, &params);
                forest.predict_batch(&x)
            })
        };

        let single = run(1);
        let multi = run(4);
        assert_eq!(single.len(), multi.len());
        for (a, b) in single.iter().zip(&multi) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}
