use serde::{Deserialize, Serialize};

use super::domain::ScoreLevel;

const HIGH_FLOOR: f64 = 80.0;
const MEDIUM_FLOOR: f64 = 60.0;
const LOW_FLOOR: f64 = 35.0;

/// Follow-up strategy recommended for each level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    UrgentFollowUp,
    MaintainContact,
    RevisitStrategy,
    MitigateRisk,
}

impl ActionCategory {
    pub const fn for_level(level: ScoreLevel) -> Self {
        match level {
            ScoreLevel::High => Self::UrgentFollowUp,
            ScoreLevel::Medium => Self::MaintainContact,
            ScoreLevel::Low => Self::RevisitStrategy,
            ScoreLevel::VeryLow => Self::MitigateRisk,
        }
    }

    pub fn describe(self, score: f64) -> String {
        match self {
            Self::UrgentFollowUp => format!(
                "Excellent opportunity. Score {score:.1}%. Prioritize an immediate follow-up."
            ),
            Self::MaintainContact => {
                format!("Active negotiation. Score {score:.1}%. Keep regular contact.")
            }
            Self::RevisitStrategy => format!(
                "Attention needed. Score {score:.1}%. Revisit the strategy or offer an incentive."
            ),
            Self::MitigateRisk => {
                format!("High risk. Score {score:.1}%. Immediate action required.")
            }
        }
    }
}

/// Level and recommended action for a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub level: ScoreLevel,
    pub category: ActionCategory,
    pub action: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreClassifier;

impl ScoreClassifier {
    /// Bands are closed on their lower bound; anything non-finite lands in `VeryLow`.
    pub fn level(score: f64) -> ScoreLevel {
        if score >= HIGH_FLOOR {
            ScoreLevel::High
        } else if score >= MEDIUM_FLOOR {
            ScoreLevel::Medium
        } else if score >= LOW_FLOOR {
            ScoreLevel::Low
        } else {
            ScoreLevel::VeryLow
        }
    }

    pub fn classify(score: f64) -> Classification {
        let level = Self::level(score);
        let category = ActionCategory::for_level(level);
        Classification {
            level,
            category,
            action: category.describe(score),
        }
    }
}
