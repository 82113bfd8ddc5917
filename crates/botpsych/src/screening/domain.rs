use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scoring::RiskLevel;
use crate::access::UserId;

/// Stable numeric identifier of a screening question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u32);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag used to filter which questions are shown to a respondent (e.g. `"2-5"`, `"adult"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgeGroup(pub String);

impl AgeGroup {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Languages the question bank is translated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Hi,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "hi" => Some(Language::Hi),
            _ => None,
        }
    }
}

/// Who the screening answers describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[serde(rename = "self")]
    Myself,
    Child,
}

/// Text carried in every supported language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translated<T> {
    pub en: T,
    pub hi: T,
}

impl<T> Translated<T> {
    pub fn get(&self, language: Language) -> &T {
        match language {
            Language::En => &self.en,
            Language::Hi => &self.hi,
        }
    }
}

/// Screening question with per-option weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub category: String,
    pub age_groups: BTreeSet<AgeGroup>,
    pub text: Translated<String>,
    pub options: Translated<Vec<String>>,
    pub weights: Vec<f64>,
}

impl Question {
    /// Highest weight any option can contribute; zero for a question without weights.
    pub fn max_weight(&self) -> f64 {
        self.weights
            .iter()
            .copied()
            .fold(None, |best: Option<f64>, weight| {
                Some(best.map_or(weight, |current| current.max(weight)))
            })
            .unwrap_or(0.0)
    }

    pub fn applies_to(&self, age_group: &AgeGroup) -> bool {
        self.age_groups.contains(age_group)
    }

    pub fn localize(&self, language: Language) -> LocalizedQuestion {
        LocalizedQuestion {
            id: self.id,
            category: self.category.clone(),
            question: self.text.get(language).clone(),
            options: self.options.get(language).clone(),
            weights: self.weights.clone(),
        }
    }
}

/// Question rendered for one language; weights stay language independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedQuestion {
    pub id: QuestionId,
    pub category: String,
    pub question: String,
    pub options: Vec<String>,
    pub weights: Vec<f64>,
}

/// Admin payload for creating a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub category: String,
    pub age_groups: BTreeSet<AgeGroup>,
    pub text: Translated<String>,
    pub options: Translated<Vec<String>>,
    pub weights: Vec<f64>,
}

impl From<QuestionDraft> for Question {
    fn from(draft: QuestionDraft) -> Self {
        Self {
            id: draft.id,
            category: draft.category,
            age_groups: draft.age_groups,
            text: draft.text,
            options: draft.options,
            weights: draft.weights,
        }
    }
}

/// Partial admin update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPatch {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub age_groups: Option<BTreeSet<AgeGroup>>,
    #[serde(default)]
    pub text: Option<Translated<String>>,
    #[serde(default)]
    pub options: Option<Translated<Vec<String>>>,
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

impl QuestionPatch {
    pub fn apply(self, mut question: Question) -> Question {
        if let Some(category) = self.category {
            question.category = category;
        }
        if let Some(age_groups) = self.age_groups {
            question.age_groups = age_groups;
        }
        if let Some(text) = self.text {
            question.text = text;
        }
        if let Some(options) = self.options {
            question.options = options;
        }
        if let Some(weights) = self.weights {
            question.weights = weights;
        }
        question
    }
}

/// Selected option per question. Indices are signed so out-of-range input
/// reaches validation instead of failing deserialization.
pub type ResponseSet = BTreeMap<QuestionId, i64>;

/// Strongly typed screening submission accepted at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSubmission {
    pub user_type: UserType,
    pub age: u16,
    pub language: Language,
    pub responses: ResponseSet,
}

/// Identifier of a persisted assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(pub uuid::Uuid);

impl AssessmentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One scored answer captured at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedResponse {
    pub question: QuestionId,
    pub option_index: usize,
    pub score: f64,
}

/// Persisted assessment. Never updated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    pub id: AssessmentId,
    pub user: UserId,
    pub user_type: UserType,
    pub age: u16,
    pub language: Language,
    pub score: f64,
    pub max_score: f64,
    pub risk_level: RiskLevel,
    pub responses: Vec<RecordedResponse>,
    pub created_at: DateTime<Utc>,
}

/// Recorded answer enriched with the question text in the assessment's language.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDetail {
    pub question: QuestionId,
    pub option_index: usize,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<String>,
}

/// Assessment returned to clients with each response populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentDetail {
    pub id: AssessmentId,
    pub user: UserId,
    pub user_type: UserType,
    pub age: u16,
    pub language: Language,
    pub score: f64,
    pub max_score: f64,
    pub risk_level: RiskLevel,
    pub responses: Vec<ResponseDetail>,
    pub created_at: DateTime<Utc>,
}

impl AssessmentDetail {
    /// Joins a record with whatever questions are still in the catalog. Questions
    /// removed since submission leave their text unset; scores are untouched.
    pub fn populate(record: AssessmentRecord, questions: &[Question]) -> Self {
        let by_id: BTreeMap<QuestionId, &Question> =
            questions.iter().map(|question| (question.id, question)).collect();
        let language = record.language;

        let responses = record
            .responses
            .into_iter()
            .map(|response| {
                let question = by_id.get(&response.question);
                ResponseDetail {
                    prompt: question.map(|q| q.text.get(language).clone()),
                    selected_option: question.and_then(|q| {
                        q.options.get(language).get(response.option_index).cloned()
                    }),
                    question: response.question,
                    option_index: response.option_index,
                    score: response.score,
                }
            })
            .collect();

        Self {
            id: record.id,
            user: record.user,
            user_type: record.user_type,
            age: record.age,
            language,
            score: record.score,
            max_score: record.max_score,
            risk_level: record.risk_level,
            responses,
            created_at: record.created_at,
        }
    }
}
