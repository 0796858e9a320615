use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Conversion rate assumed when a seller or client has no usable history.
pub const NEUTRAL_RATE: f64 = 0.5;

/// Proposal fields exactly as they arrive from the caller.
///
/// Every field is optional and numeric fields accept JSON numbers, numeric strings or `null`.
/// Unknown fields are ignored so callers can forward their full proposal documents.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawProposal {
    #[serde(default, deserialize_with = "lenient_number")]
    pub total: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub items_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub discount_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub days_since_creation: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub days_until_expiry: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub seller_conversion_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub client_conversion_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub month: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub seller_proposals_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub client_proposals_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub client_total_revenue: Option<f64>,
    #[serde(default)]
    pub status: Option<RawStatus>,
}

/// Terminal status as supplied by the caller: a label such as `venda_fechada` or a flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawStatus {
    Flag(bool),
    Label(String),
}

/// Whether a historical proposal ended as a sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalOutcome {
    Closed,
    #[default]
    NotClosed,
}

impl ProposalOutcome {
    const CLOSED_LABELS: [&'static str; 5] = ["venda_fechada", "closed", "closed_won", "won", "sold"];

    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase();
        if Self::CLOSED_LABELS.contains(&normalized.as_str()) {
            Self::Closed
        } else {
            Self::NotClosed
        }
    }

    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<Option<RawStatus>> for ProposalOutcome {
    fn from(value: Option<RawStatus>) -> Self {
        match value {
            Some(RawStatus::Flag(true)) => Self::Closed,
            Some(RawStatus::Label(label)) => Self::from_label(&label),
            Some(RawStatus::Flag(false)) | None => Self::NotClosed,
        }
    }
}

/// A proposal with every attribute resolved to a concrete value.
///
/// As the scored proposal, absent counts, amounts and calendar fields resolve to `0` and absent
/// conversion rates to [`NEUTRAL_RATE`]; deserialization goes through [`RawProposal`]. Historical
/// records are resolved through [`HistoricalRow`] instead, where every absent field is `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProposal")]
pub struct ProposalRecord {
    pub total: f64,
    pub items_count: f64,
    pub discount_percentage: f64,
    pub days_since_creation: f64,
    pub days_until_expiry: f64,
    pub seller_conversion_rate: f64,
    pub client_conversion_rate: f64,
    pub month: f64,
    pub seller_proposals_count: f64,
    pub client_proposals_count: f64,
    pub client_total_revenue: f64,
    #[serde(rename = "status")]
    pub outcome: ProposalOutcome,
}

impl ProposalRecord {
    pub fn is_closed(&self) -> bool {
        self.outcome.is_closed()
    }
}

impl Default for ProposalRecord {
    fn default() -> Self {
        RawProposal::default().into()
    }
}

impl From<RawProposal> for ProposalRecord {
    fn from(raw: RawProposal) -> Self {
        Self {
            total: raw.total.unwrap_or(0.0),
            items_count: raw.items_count.unwrap_or(0.0),
            discount_percentage: raw.discount_percentage.unwrap_or(0.0),
            days_since_creation: raw.days_since_creation.unwrap_or(0.0),
            days_until_expiry: raw.days_until_expiry.unwrap_or(0.0),
            seller_conversion_rate: raw.seller_conversion_rate.unwrap_or(NEUTRAL_RATE),
            client_conversion_rate: raw.client_conversion_rate.unwrap_or(NEUTRAL_RATE),
            month: raw.month.unwrap_or(0.0),
            seller_proposals_count: raw.seller_proposals_count.unwrap_or(0.0),
            client_proposals_count: raw.client_proposals_count.unwrap_or(0.0),
            client_total_revenue: raw.client_total_revenue.unwrap_or(0.0),
            outcome: raw.status.into(),
        }
    }
}

/// One historical proposal as exported by the CRM.
///
/// History is decoded tolerantly: a cell that is present but not a number becomes `NaN` rather
/// than failing the request, and the learned path later reports it as a fitting fallback. A
/// status that is neither a label nor a flag counts as not closed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoricalRow {
    #[serde(default, deserialize_with = "tolerant_number")]
    pub total: Option<f64>,
    #[serde(default, deserialize_with = "tolerant_number")]
    pub items_count: Option<f64>,
    #[serde(default, deserialize_with = "tolerant_number")]
    pub discount_percentage: Option<f64>,
    #[serde(default, deserialize_with = "tolerant_number")]
    pub days_since_creation: Option<f64>,
    #[serde(default, deserialize_with = "tolerant_number")]
    pub days_until_expiry: Option<f64>,
    #[serde(default, deserialize_with = "tolerant_number")]
    pub seller_conversion_rate: Option<f64>,
    #[serde(default, deserialize_with = "tolerant_number")]
    pub client_conversion_rate: Option<f64>,
    #[serde(default, deserialize_with = "tolerant_number")]
    pub month: Option<f64>,
    #[serde(default, deserialize_with = "tolerant_number")]
    pub seller_proposals_count: Option<f64>,
    #[serde(default, deserialize_with = "tolerant_number")]
    pub client_proposals_count: Option<f64>,
    #[serde(default, deserialize_with = "tolerant_number")]
    pub client_total_revenue: Option<f64>,
    #[serde(default, deserialize_with = "tolerant_status")]
    pub status: Option<RawStatus>,
}

impl From<HistoricalRow> for ProposalRecord {
    fn from(row: HistoricalRow) -> Self {
        Self {
            total: row.total.unwrap_or(0.0),
            items_count: row.items_count.unwrap_or(0.0),
            discount_percentage: row.discount_percentage.unwrap_or(0.0),
            days_since_creation: row.days_since_creation.unwrap_or(0.0),
            days_until_expiry: row.days_until_expiry.unwrap_or(0.0),
            seller_conversion_rate: row.seller_conversion_rate.unwrap_or(0.0),
            client_conversion_rate: row.client_conversion_rate.unwrap_or(0.0),
            month: row.month.unwrap_or(0.0),
            seller_proposals_count: row.seller_proposals_count.unwrap_or(0.0),
            client_proposals_count: row.client_proposals_count.unwrap_or(0.0),
            client_total_revenue: row.client_total_revenue.unwrap_or(0.0),
            outcome: row.status.into(),
        }
    }
}

/// Ordered historical proposals with their terminal outcomes. Read-only training input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<HistoricalRow>")]
pub struct HistoricalDataset(Vec<ProposalRecord>);

impl HistoricalDataset {
    pub fn new(records: Vec<ProposalRecord>) -> Self {
        Self(records)
    }

    pub fn records(&self) -> &[ProposalRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn closed_count(&self) -> usize {
        self.0.iter().filter(|record| record.is_closed()).count()
    }
}

impl From<Vec<ProposalRecord>> for HistoricalDataset {
    fn from(records: Vec<ProposalRecord>) -> Self {
        Self(records)
    }
}

impl From<Vec<HistoricalRow>> for HistoricalDataset {
    fn from(rows: Vec<HistoricalRow>) -> Self {
        Self(rows.into_iter().map(ProposalRecord::from).collect())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawHistoricalStats {
    #[serde(default, deserialize_with = "lenient_number")]
    seller_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    client_rate: Option<f64>,
}

/// Aggregate conversion rates consumed by the heuristic path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawHistoricalStats")]
pub struct HistoricalStats {
    pub seller_rate: f64,
    pub client_rate: f64,
}

impl HistoricalStats {
    pub const fn new(seller_rate: f64, client_rate: f64) -> Self {
        Self {
            seller_rate,
            client_rate,
        }
    }

    /// Stats taken from the proposal's own conversion-rate fields.
    pub fn from_proposal(proposal: &ProposalRecord) -> Self {
        Self::new(
            proposal.seller_conversion_rate,
            proposal.client_conversion_rate,
        )
    }
}

impl Default for HistoricalStats {
    fn default() -> Self {
        Self::new(NEUTRAL_RATE, NEUTRAL_RATE)
    }
}

impl From<RawHistoricalStats> for HistoricalStats {
    fn from(raw: RawHistoricalStats) -> Self {
        Self::new(
            raw.seller_rate.unwrap_or(NEUTRAL_RATE),
            raw.client_rate.unwrap_or(NEUTRAL_RATE),
        )
    }
}

/// One scoring invocation: the proposal plus whatever history the caller could gather.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequest {
    #[serde(default)]
    pub proposal: ProposalRecord,
    #[serde(default)]
    pub historical_data: Option<HistoricalDataset>,
    #[serde(default)]
    pub historical_stats: Option<HistoricalStats>,
}

/// Estimation strategy that produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMethod {
    Statistical,
    MlRandomForest,
    ErrorFallback,
}

impl ScoreMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            ScoreMethod::Statistical => "statistical",
            ScoreMethod::MlRandomForest => "ml_random_forest",
            ScoreMethod::ErrorFallback => "error_fallback",
        }
    }
}

/// Qualitative band of a score, ordered from most to least promising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLevel {
    High,
    Medium,
    Low,
    VeryLow,
}

impl ScoreLevel {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreLevel::High => "high",
            ScoreLevel::Medium => "medium",
            ScoreLevel::Low => "low",
            ScoreLevel::VeryLow => "very_low",
        }
    }
}

/// Contribution of a conversion rate to the heuristic score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateFactor {
    pub rate: f64,
    pub score: f64,
    pub contribution: f64,
}

/// Value-band rule applied to the proposal total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueFactor {
    pub total: f64,
    pub score: f64,
}

/// Per-factor audit trail of a heuristic score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicFactors {
    pub seller: RateFactor,
    pub client: RateFactor,
    pub value: ValueFactor,
}

/// Model diagnostics attached to a learned score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedDetails {
    pub confidence: u8,
    pub features_importance: BTreeMap<String, f64>,
    pub prediction_probability: f64,
}

/// Method-specific data carried from a scorer to the final result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EstimateDetails {
    Statistical(HeuristicFactors),
    Learned(LearnedDetails),
}

/// Raw scorer output before classification and stamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEstimate {
    pub score: f64,
    pub percentual: u8,
    pub method: ScoreMethod,
    pub details: EstimateDetails,
}

/// Final payload returned to the caller for every invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub percentual: u8,
    pub level: ScoreLevel,
    pub action: String,
    pub method: ScoreMethod,
    pub calculated_at: DateTime<Utc>,
    pub algorithm_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factors: Option<HeuristicFactors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features_importance: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Clamp a score into `[0, 100]`; non-finite input collapses to `0`.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Whole-number percentage of an already clamped score.
pub fn percent_of(score: f64) -> u8 {
    clamp_score(score).round() as u8
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberLike::Number(value)) => Ok(Some(value)),
        Some(NumberLike::Text(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().map(Some).map_err(|err| {
                serde::de::Error::custom(format!("'{raw}' is not a number ({err})"))
            })
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TolerantCell {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

fn tolerant_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<TolerantCell>::deserialize(deserializer)? {
        None => None,
        Some(TolerantCell::Number(value)) => Some(value),
        Some(TolerantCell::Text(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.parse::<f64>().unwrap_or(f64::NAN))
            }
        }
        Some(TolerantCell::Other(_)) => Some(f64::NAN),
    };
    Ok(value)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TolerantStatus {
    Known(RawStatus),
    Other(IgnoredAny),
}

fn tolerant_status<'de, D>(deserializer: D) -> Result<Option<RawStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TolerantStatus>::deserialize(deserializer)? {
        Some(TolerantStatus::Known(status)) => Some(status),
        Some(TolerantStatus::Other(_)) | None => None,
    })
}
