use rand::seq::SliceRandom;
use rand::Rng;

use crate::scoring::features::{FeatureVector, FEATURE_COUNT};

/// Values closer than this are treated as equal when searching thresholds.
const FEATURE_THRESHOLD: f64 = 1e-7;
const MIN_SAMPLES_SPLIT: usize = 2;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        positive_fraction: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub(crate) max_depth: usize,
    pub(crate) max_features: usize,
}

/// Binary CART classifier grown on a bootstrap sample.
#[derive(Debug, Clone)]
pub(crate) struct DecisionTree {
    nodes: Vec<Node>,
    importances: [f64; FEATURE_COUNT],
}

impl DecisionTree {
    /// `samples` indexes into `features`/`labels` and may repeat rows.
    pub(crate) fn fit<R: Rng + ?Sized>(
        features: &[FeatureVector],
        labels: &[u8],
        samples: Vec<usize>,
        params: TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut builder = TreeBuilder {
            features,
            labels,
            params,
            rng,
            nodes: Vec::new(),
            importances: [0.0; FEATURE_COUNT],
        };
        builder.grow(samples, 0);

        let TreeBuilder {
            nodes,
            mut importances,
            ..
        } = builder;
        normalize(&mut importances);

        Self { nodes, importances }
    }

    /// Fraction of closed proposals in the leaf reached by `sample`.
    pub(crate) fn predict(&self, sample: &FeatureVector) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Leaf { positive_fraction } => return positive_fraction,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if sample[feature] <= threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub(crate) fn has_splits(&self) -> bool {
        self.nodes.len() > 1
    }

    pub(crate) fn importances(&self) -> &[f64; FEATURE_COUNT] {
        &self.importances
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.depth_from(0)
    }

    #[cfg(test)]
    fn depth_from(&self, index: usize) -> usize {
        match self.nodes[index] {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => {
                1 + self.depth_from(left).max(self.depth_from(right))
            }
        }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    weighted_child_impurity: f64,
}

struct TreeBuilder<'a, R: Rng + ?Sized> {
    features: &'a [FeatureVector],
    labels: &'a [u8],
    params: TreeParams,
    rng: &'a mut R,
    nodes: Vec<Node>,
    importances: [f64; FEATURE_COUNT],
}

impl<R: Rng + ?Sized> TreeBuilder<'_, R> {
    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let index = self.nodes.len();
        let total = samples.len();
        let positives = self.count_positives(&samples);
        self.nodes.push(Node::Leaf {
            positive_fraction: fraction(positives, total),
        });

        let pure = positives == 0 || positives == total;
        if depth >= self.params.max_depth || total < MIN_SAMPLES_SPLIT || pure {
            return index;
        }

        let Some(split) = self.best_split(&samples, positives) else {
            return index;
        };

        self.importances[split.feature] +=
            total as f64 * gini(positives, total) - split.weighted_child_impurity;

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&row| self.features[row][split.feature] <= split.threshold);

        let left = self.grow(left_samples, depth + 1);
        let right = self.grow(right_samples, depth + 1);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };

        index
    }

    fn count_positives(&self, samples: &[usize]) -> usize {
        samples.iter().filter(|&&row| self.labels[row] == 1).count()
    }

    /// Exhaustive threshold search over a random subset of non-constant features.
    fn best_split(&mut self, samples: &[usize], positives: usize) -> Option<Split> {
        let mut candidates: Vec<usize> = (0..FEATURE_COUNT).collect();
        candidates.shuffle(&mut *self.rng);

        let total = samples.len();
        let mut column: Vec<(f64, u8)> = Vec::with_capacity(total);
        let mut best: Option<Split> = None;
        let mut visited = 0;

        for feature in candidates {
            if visited >= self.params.max_features {
                break;
            }

            column.clear();
            column.extend(
                samples
                    .iter()
                    .map(|&row| (self.features[row][feature], self.labels[row])),
            );
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            if column[total - 1].0 <= column[0].0 + FEATURE_THRESHOLD {
                continue;
            }
            visited += 1;

            let mut left_positives = 0;
            for split_at in 1..total {
                left_positives += usize::from(column[split_at - 1].1);
                let (low, high) = (column[split_at - 1].0, column[split_at].0);
                if high <= low + FEATURE_THRESHOLD {
                    continue;
                }

                let right_total = total - split_at;
                let impurity = split_at as f64 * gini(left_positives, split_at)
                    + right_total as f64 * gini(positives - left_positives, right_total);

                let improves = best
                    .as_ref()
                    .map_or(true, |current| impurity < current.weighted_child_impurity);
                if improves {
                    best = Some(Split {
                        feature,
                        threshold: midpoint(low, high),
                        weighted_child_impurity: impurity,
                    });
                }
            }
        }

        best
    }
}

fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid.is_finite() && mid < high {
        mid
    } else {
        low
    }
}

fn fraction(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = fraction(positives, total);
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

pub(crate) fn normalize(values: &mut [f64; FEATURE_COUNT]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter_mut().for_each(|value| *value /= sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn row(total: f64) -> FeatureVector {
        let mut row = [0.0; FEATURE_COUNT];
        row[0] = total;
        row
    }

    #[test]
    fn separable_column_yields_pure_leaves() {
        let features: Vec<FeatureVector> = [1.0, 2.0, 3.0, 10.0, 11.0, 12.0]
            .into_iter()
            .map(row)
            .collect();
        let labels = vec![0, 0, 0, 1, 1, 1];
        let params = TreeParams {
            max_depth: 10,
            max_features: FEATURE_COUNT,
        };
        let mut rng = StdRng::seed_from_u64(7);

        let tree = DecisionTree::fit(&features, &labels, (0..6).collect(), params, &mut rng);

        assert!(tree.has_splits());
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(&row(0.0)), 0.0);
        assert_eq!(tree.predict(&row(50.0)), 1.0);
        assert_eq!(tree.importances()[0], 1.0);
    }

    #[test]
    fn constant_features_produce_a_single_leaf() {
        let features = vec![row(5.0); 4];
        let labels = vec![0, 1, 0, 1];
        let params = TreeParams {
            max_depth: 10,
            max_features: 3,
        };
        let mut rng = StdRng::seed_from_u64(7);

        let tree = DecisionTree::fit(&features, &labels, (0..4).collect(), params, &mut rng);

        assert!(!tree.has_splits());
        assert_eq!(tree.predict(&row(5.0)), 0.5);
        assert!(tree.importances().iter().all(|value| *value == 0.0));
    }

    #[test]
    fn depth_limit_is_respected() {
        let features: Vec<FeatureVector> = (0..32).map(|value| row(value as f64)).collect();
        let labels: Vec<u8> = (0..32).map(|value| (value % 2) as u8).collect();
        let params = TreeParams {
            max_depth: 3,
            max_features: FEATURE_COUNT,
        };
        let mut rng = StdRng::seed_from_u64(42);

        let tree = DecisionTree::fit(&features, &labels, (0..32).collect(), params, &mut rng);

        assert!(tree.depth() <= 3);
    }

    #[test]
    fn gini_is_zero_for_pure_nodes_and_half_for_balanced() {
        assert_eq!(gini(0, 4), 0.0);
        assert_eq!(gini(4, 4), 0.0);
        assert!((gini(2, 4) - 0.5).abs() < 1e-12);
    }
}
