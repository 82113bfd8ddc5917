//! Assessment scoring and risk classification.
//!
//! The engine is a pure function of its arguments: the caller fetches the
//! referenced questions and passes a lookup, so nothing in here touches a store.

mod risk;

pub use risk::{RiskBadge, RiskLevel, LOW_RISK_CEILING, MODERATE_RISK_CEILING};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Question, QuestionId, RecordedResponse, ResponseSet};
use super::validation::ValidationError;

/// Resolved weight for one answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseScore {
    pub question_id: QuestionId,
    pub option_index: usize,
    pub score: f64,
}

impl From<&ResponseScore> for RecordedResponse {
    fn from(value: &ResponseScore) -> Self {
        RecordedResponse {
            question: value.question_id,
            option_index: value.option_index,
            score: value.score,
        }
    }
}

/// Scored payload ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringOutcome {
    pub total_score: f64,
    pub max_score: f64,
    pub risk_level: RiskLevel,
    pub responses: Vec<ResponseScore>,
}

impl ScoringOutcome {
    /// Share of the attainable score, `None` when nothing carried weight.
    pub fn percent(&self) -> Option<f64> {
        (self.max_score != 0.0).then(|| 100.0 * self.total_score / self.max_score)
    }
}

/// Scores `responses` against the questions returned by `lookup`.
///
/// Every response is resolved before any arithmetic happens, so an unknown question
/// or an out-of-range option yields an error and no partial outcome. The maximum
/// only counts questions that were answered.
pub fn score<'q, F>(responses: &ResponseSet, lookup: F) -> Result<ScoringOutcome, ValidationError>
where
    F: Fn(QuestionId) -> Option<&'q Question>,
{
    let mut resolved = Vec::with_capacity(responses.len());

    for (&question_id, &raw_index) in responses {
        let question =
            lookup(question_id).ok_or(ValidationError::UnknownQuestion { question: question_id })?;
        let option_index = usize::try_from(raw_index)
            .ok()
            .filter(|index| *index < question.weights.len())
            .ok_or(ValidationError::InvalidOptionIndex {
                question: question_id,
                index: raw_index,
                options: question.weights.len(),
            })?;
        resolved.push((question, option_index));
    }

    let mut total_score = 0.0;
    let mut max_score = 0.0;
    let mut scored = Vec::with_capacity(resolved.len());

    for (question, option_index) in resolved {
        let score = question.weights[option_index];
        total_score += score;
        max_score += question.max_weight();
        scored.push(ResponseScore {
            question_id: question.id,
            option_index,
            score,
        });
    }

    Ok(ScoringOutcome {
        total_score,
        max_score,
        risk_level: RiskLevel::classify(total_score, max_score),
        responses: scored,
    })
}

/// Borrowed id index over a fetched question slice.
pub struct QuestionIndex<'q> {
    questions: BTreeMap<QuestionId, &'q Question>,
}

impl<'q> QuestionIndex<'q> {
    pub fn new(questions: &'q [Question]) -> Self {
        Self {
            questions: questions.iter().map(|question| (question.id, question)).collect(),
        }
    }

    pub fn get(&self, id: QuestionId) -> Option<&'q Question> {
        self.questions.get(&id).copied()
    }

    /// Scores `responses` against the indexed questions.
    pub fn score(&self, responses: &ResponseSet) -> Result<ScoringOutcome, ValidationError> {
        score(responses, |id| self.get(id))
    }
}
