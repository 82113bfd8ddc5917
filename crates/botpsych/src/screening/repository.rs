use super::domain::{AssessmentId, AssessmentRecord};
use crate::access::UserId;

/// Append-only store of scored assessments.
pub trait AssessmentRepository: Send + Sync {
    /// Persists a whole record or nothing.
    fn create(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError>;
    /// Every record owned by `user`, newest first.
    fn list_by_user(&self, user: &UserId) -> Result<Vec<AssessmentRecord>, RepositoryError>;
    fn latest_by_user(&self, user: &UserId) -> Result<Option<AssessmentRecord>, RepositoryError>;
    fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Orders records newest first. The sort is stable, so for equal timestamps the
/// caller's insertion order decides; pass records oldest-inserted first.
pub fn newest_first(mut records: Vec<AssessmentRecord>) -> Vec<AssessmentRecord> {
    records.reverse();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records
}
