//! Screening questionnaires: question bank, scoring, and per-user assessment history.

pub mod catalog;
pub mod domain;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, CatalogSeed, CatalogSeedError, QuestionCatalog, SeedFormat};
pub use domain::{
    AgeGroup, AssessmentDetail, AssessmentId, AssessmentRecord, AssessmentSubmission, Language,
    LocalizedQuestion, Question, QuestionDraft, QuestionId, QuestionPatch, RecordedResponse,
    ResponseDetail, ResponseSet, Translated, UserType,
};
pub use repository::{newest_first, AssessmentRepository, RepositoryError};
pub use router::screening_router;
pub use scoring::{score, QuestionIndex, ResponseScore, RiskLevel, ScoringOutcome};
pub use service::{ScreeningError, ScreeningService};
pub use validation::ValidationError;
