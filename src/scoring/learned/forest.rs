use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::tree::{normalize, DecisionTree, TreeParams};
use super::ModelError;
use crate::scoring::features::{FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT};

/// Ensemble shape. Fixed per process so identical inputs always produce identical scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub trees: usize,
    pub max_depth: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            trees: 100,
            max_depth: 10,
            seed: 42,
        }
    }
}

/// Bagged ensemble of CART classifiers predicting the probability that a proposal closes.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    importances: [f64; FEATURE_COUNT],
}

impl RandomForest {
    pub fn fit(
        features: &[FeatureVector],
        labels: &[u8],
        config: &ForestConfig,
    ) -> Result<Self, ModelError> {
        if config.trees == 0 {
            return Err(ModelError::EmptyEnsemble);
        }
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if features.len() != labels.len() {
            return Err(ModelError::LabelMismatch {
                rows: features.len(),
                labels: labels.len(),
            });
        }
        for (row, values) in features.iter().enumerate() {
            if let Some(column) = values.iter().position(|value| !value.is_finite()) {
                return Err(ModelError::NonFiniteTrainingValue {
                    row,
                    column: FEATURE_COLUMNS[column],
                });
            }
        }

        let params = TreeParams {
            max_depth: config.max_depth,
            max_features: max_features(FEATURE_COUNT),
        };
        let rows = features.len();
        let mut rng = StdRng::seed_from_u64(config.seed);

        let trees: Vec<DecisionTree> = (0..config.trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..rows).map(|_| rng.random_range(0..rows)).collect();
                DecisionTree::fit(features, labels, bootstrap, params, &mut rng)
            })
            .collect();

        let importances = aggregate_importances(&trees);
        Ok(Self { trees, importances })
    }

    /// Mean of the per-tree leaf fractions for the positive class.
    pub fn predict_proba(&self, sample: &FeatureVector) -> f64 {
        let sum: f64 = self.trees.iter().map(|tree| tree.predict(sample)).sum();
        sum / self.trees.len() as f64
    }

    /// Mean decrease in impurity per column, summing to 1 unless no tree ever split.
    pub fn feature_importances(&self) -> &[f64; FEATURE_COUNT] {
        &self.importances
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

fn max_features(columns: usize) -> usize {
    ((columns as f64).sqrt().floor() as usize).max(1)
}

fn aggregate_importances(trees: &[DecisionTree]) -> [f64; FEATURE_COUNT] {
    let mut totals = [0.0; FEATURE_COUNT];
    let split_trees: Vec<&DecisionTree> = trees.iter().filter(|tree| tree.has_splits()).collect();
    if split_trees.is_empty() {
        return totals;
    }

    for tree in &split_trees {
        for (total, value) in totals.iter_mut().zip(tree.importances()) {
            *total += value;
        }
    }
    let count = split_trees.len() as f64;
    totals.iter_mut().for_each(|total| *total /= count);
    normalize(&mut totals);
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<FeatureVector>, Vec<u8>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for index in 0..20 {
            let closed = index % 2 == 0;
            let mut row = [0.0; FEATURE_COUNT];
            row[0] = if closed { 20_000.0 } else { 500.0 } + index as f64;
            row[5] = if closed { 0.8 } else { 0.2 };
            row[7] = (index % 12 + 1) as f64;
            features.push(row);
            labels.push(u8::from(closed));
        }
        (features, labels)
    }

    #[test]
    fn max_features_uses_square_root_of_columns() {
        assert_eq!(max_features(FEATURE_COUNT), 3);
        assert_eq!(max_features(1), 1);
    }

    #[test]
    fn forest_learns_a_separable_signal() {
        let (features, labels) = separable();
        let forest = RandomForest::fit(&features, &labels, &ForestConfig::default())
            .expect("forest fits");

        let mut likely = [0.0; FEATURE_COUNT];
        likely[0] = 21_000.0;
        likely[5] = 0.8;
        let mut unlikely = [0.0; FEATURE_COUNT];
        unlikely[0] = 400.0;
        unlikely[5] = 0.2;

        assert_eq!(forest.tree_count(), 100);
        assert!(forest.predict_proba(&likely) > 0.5);
        assert!(forest.predict_proba(&unlikely) < 0.5);
    }

    #[test]
    fn importances_sum_to_one() {
        let (features, labels) = separable();
        let forest = RandomForest::fit(&features, &labels, &ForestConfig::default())
            .expect("forest fits");

        let sum: f64 = forest.feature_importances().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(forest.feature_importances()[1] == 0.0);
    }

    #[test]
    fn same_seed_gives_same_probabilities() {
        let (features, labels) = separable();
        let config = ForestConfig::default();
        let first = RandomForest::fit(&features, &labels, &config).expect("forest fits");
        let second = RandomForest::fit(&features, &labels, &config).expect("forest fits");

        let probe = features[3];
        assert_eq!(first.predict_proba(&probe), second.predict_proba(&probe));
        assert_eq!(first.feature_importances(), second.feature_importances());
    }

    #[test]
    fn rejects_non_finite_training_values() {
        let (mut features, labels) = separable();
        features[4][2] = f64::NAN;

        let err = RandomForest::fit(&features, &labels, &ForestConfig::default())
            .expect_err("nan rejected");

        assert_eq!(
            err,
            ModelError::NonFiniteTrainingValue {
                row: 4,
                column: "days_until_expiry",
            }
        );
    }

    #[test]
    fn rejects_empty_ensembles_and_mismatched_labels() {
        let (features, labels) = separable();
        let config = ForestConfig {
            trees: 0,
            ..ForestConfig::default()
        };
        assert_eq!(
            RandomForest::fit(&features, &labels, &config).expect_err("no trees"),
            ModelError::EmptyEnsemble
        );
        assert_eq!(
            RandomForest::fit(&features, &labels[..5], &ForestConfig::default())
                .expect_err("mismatch"),
            ModelError::LabelMismatch {
                rows: 20,
                labels: 5,
            }
        );
    }
}
