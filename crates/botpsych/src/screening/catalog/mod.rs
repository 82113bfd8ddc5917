mod seed;

pub use seed::{CatalogSeed, CatalogSeedError, SeedFormat};

use std::collections::BTreeSet;

use super::domain::{AgeGroup, Question, QuestionId};

/// Storage abstraction for the question bank.
pub trait QuestionCatalog: Send + Sync {
    /// Returns the questions whose ids are in `ids`; unknown ids are simply absent.
    fn find_by_ids(&self, ids: &BTreeSet<QuestionId>) -> Result<Vec<Question>, CatalogError>;
    /// Questions tagged with `age_group`, ordered by id.
    fn find_by_age_group(&self, age_group: &AgeGroup) -> Result<Vec<Question>, CatalogError>;
    fn all(&self) -> Result<Vec<Question>, CatalogError>;
    fn insert(&self, question: Question) -> Result<Question, CatalogError>;
    fn update(&self, question: Question) -> Result<(), CatalogError>;
    fn remove(&self, id: QuestionId) -> Result<(), CatalogError>;
}

/// Error enumeration for catalog failures.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("question {0} already exists")]
    Conflict(QuestionId),
    #[error("question not found")]
    NotFound,
    #[error("question catalog unavailable: {0}")]
    Unavailable(String),
}
