use serde::{Deserialize, Serialize};

/// Highest percentage (inclusive) still classified as low risk.
pub const LOW_RISK_CEILING: f64 = 30.0;
/// Highest percentage (inclusive) still classified as moderate risk.
pub const MODERATE_RISK_CEILING: f64 = 70.0;

/// Categorical risk derived from a score percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "RiskBadge", try_from = "RiskBadge")]
pub enum RiskLevel {
    NotApplicable,
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Classifies `total` against `max`. A zero maximum means nothing answerable carried
    /// weight, so the result is `N/A` whatever the total is.
    pub fn classify(total: f64, max: f64) -> Self {
        if max == 0.0 || !max.is_finite() {
            return RiskLevel::NotApplicable;
        }

        Self::from_percent(100.0 * total / max)
    }

    pub fn from_percent(percent: f64) -> Self {
        if percent.is_nan() {
            RiskLevel::NotApplicable
        } else if percent <= LOW_RISK_CEILING {
            RiskLevel::Low
        } else if percent <= MODERATE_RISK_CEILING {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::NotApplicable => "N/A",
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskLevel::NotApplicable => "gray",
            RiskLevel::Low => "green",
            RiskLevel::Moderate => "yellow",
            RiskLevel::High => "red",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        [
            RiskLevel::NotApplicable,
            RiskLevel::Low,
            RiskLevel::Moderate,
            RiskLevel::High,
        ]
        .into_iter()
        .find(|level| level.label() == label)
    }
}

/// Wire shape of a risk level: `{"label": "...", "color": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskBadge {
    pub label: String,
    pub color: String,
}

impl From<RiskLevel> for RiskBadge {
    fn from(level: RiskLevel) -> Self {
        Self {
            label: level.label().to_string(),
            color: level.color().to_string(),
        }
    }
}

impl TryFrom<RiskBadge> for RiskLevel {
    type Error = String;

    fn try_from(badge: RiskBadge) -> Result<Self, Self::Error> {
        let level = RiskLevel::from_label(&badge.label)
            .ok_or_else(|| format!("unknown risk label '{}'", badge.label))?;
        if level.color() != badge.color {
            return Err(format!(
                "risk label '{}' must be paired with color '{}', found '{}'",
                badge.label,
                level.color(),
                badge.color
            ));
        }
        Ok(level)
    }
}
