use super::common::*;
use crate::scoring::domain::{
    HistoricalDataset, HistoricalRow, ProposalOutcome, ProposalRecord, RawProposal,
};
use crate::scoring::features::{FeatureBuilder, FEATURE_COLUMNS, FEATURE_COUNT};

fn numbered_record() -> ProposalRecord {
    ProposalRecord {
        total: 1.0,
        days_since_creation: 2.0,
        days_until_expiry: 3.0,
        items_count: 4.0,
        discount_percentage: 5.0,
        seller_conversion_rate: 6.0,
        client_conversion_rate: 7.0,
        month: 8.0,
        seller_proposals_count: 9.0,
        client_proposals_count: 10.0,
        client_total_revenue: 11.0,
        outcome: ProposalOutcome::Closed,
    }
}

#[test]
fn vector_follows_the_column_order() {
    let vector = FeatureBuilder::vector(&numbered_record());

    assert_eq!(FEATURE_COLUMNS.len(), FEATURE_COUNT);
    assert_eq!(FEATURE_COLUMNS[0], "total");
    assert_eq!(FEATURE_COLUMNS[10], "client_total_revenue");
    let expected: Vec<f64> = (1..=11).map(f64::from).collect();
    assert_eq!(vector.to_vec(), expected);
}

#[test]
fn training_rows_and_current_row_share_the_column_order() {
    let record = numbered_record();
    let dataset = HistoricalDataset::new(vec![record.clone()]);

    let training = FeatureBuilder::build(&record, &dataset);

    assert_eq!(training.features[0], training.current);
}

#[test]
fn labels_mark_closed_records_only() {
    let dataset = mixed_history(6);

    let training = FeatureBuilder::build(&proposal(1_000.0), &dataset);

    assert_eq!(training.labels, vec![1, 0, 1, 0, 1, 0]);
    assert_eq!(training.positives(), 3);
    assert_eq!(training.distinct_classes(), 2);
    assert_eq!(training.len(), 6);
}

#[test]
fn single_outcome_history_has_one_class() {
    let training = FeatureBuilder::build(&proposal(1_000.0), &uniform_history(12, false));

    assert_eq!(training.distinct_classes(), 1);
    assert_eq!(training.positives(), 0);
}

#[test]
fn missing_proposal_fields_become_zero_and_rates_neutral() {
    let record = ProposalRecord::from(RawProposal::default());

    let vector = FeatureBuilder::vector(&record);

    for (column, value) in FEATURE_COLUMNS.iter().zip(vector) {
        let expected = if column.ends_with("conversion_rate") {
            0.5
        } else {
            0.0
        };
        assert_eq!(value, expected, "column {column}");
    }
    assert_eq!(FeatureBuilder::label(&record), 0);
}

#[test]
fn missing_historical_fields_become_zero_including_rates() {
    let dataset: HistoricalDataset =
        serde_json::from_str(r#"[{ "total": 100, "status": "closed" }]"#).expect("history parses");
    let current: ProposalRecord = serde_json::from_str(r#"{ "total": 100 }"#).expect("proposal");

    let training = FeatureBuilder::build(&current, &dataset);

    let mut expected = [0.0; FEATURE_COUNT];
    expected[0] = 100.0;
    assert_eq!(training.features[0], expected);
    assert_eq!(training.labels, vec![1]);
    assert_eq!(training.current[5], 0.5);
    assert_eq!(training.current[6], 0.5);

    let row = ProposalRecord::from(HistoricalRow::default());
    assert_eq!(FeatureBuilder::vector(&row), [0.0; FEATURE_COUNT]);
}

#[test]
fn unparseable_historical_cells_become_nan() {
    let dataset: HistoricalDataset = serde_json::from_str(
        r#"[{ "total": "lots", "month": "", "items_count": "3", "status": 7 }]"#,
    )
    .expect("history parses");

    let record = &dataset.records()[0];
    assert!(record.total.is_nan());
    assert_eq!(record.month, 0.0);
    assert_eq!(record.items_count, 3.0);
    assert!(!record.is_closed());
}
