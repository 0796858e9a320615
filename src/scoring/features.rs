use super::domain::{HistoricalDataset, ProposalRecord};

/// Model columns in training and inference order.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "total",
    "days_since_creation",
    "days_until_expiry",
    "items_count",
    "discount_percentage",
    "seller_conversion_rate",
    "client_conversion_rate",
    "month",
    "seller_proposals_count",
    "client_proposals_count",
    "client_total_revenue",
];

pub const FEATURE_COUNT: usize = 11;

/// One row of the feature matrix, indexed like [`FEATURE_COLUMNS`].
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Feature matrix, labels and the scored proposal's row, all sharing one column order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<u8>,
    pub current: FeatureVector,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|label| **label == 1).count()
    }

    /// Number of distinct label values present (0, 1 or 2).
    pub fn distinct_classes(&self) -> usize {
        let positives = self.positives();
        usize::from(positives > 0) + usize::from(positives < self.len())
    }
}

/// Pure transformation from proposal records to model inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn vector(record: &ProposalRecord) -> FeatureVector {
        [
            record.total,
            record.days_since_creation,
            record.days_until_expiry,
            record.items_count,
            record.discount_percentage,
            record.seller_conversion_rate,
            record.client_conversion_rate,
            record.month,
            record.seller_proposals_count,
            record.client_proposals_count,
            record.client_total_revenue,
        ]
    }

    pub fn label(record: &ProposalRecord) -> u8 {
        u8::from(record.is_closed())
    }

    pub fn build(proposal: &ProposalRecord, dataset: &HistoricalDataset) -> TrainingSet {
        let records = dataset.records();
        TrainingSet {
            features: records.iter().map(Self::vector).collect(),
            labels: records.iter().map(Self::label).collect(),
            current: Self::vector(proposal),
        }
    }
}
