use std::collections::BTreeSet;

use super::domain::{AssessmentSubmission, Question, QuestionId};

/// Malformed or incomplete input. Raised before anything is persisted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown question reference: {question}")]
    UnknownQuestion { question: QuestionId },
    #[error("invalid option index {index} for question {question} ({options} options)")]
    InvalidOptionIndex {
        question: QuestionId,
        index: i64,
        options: usize,
    },
    #[error("age must be a positive number of years")]
    InvalidAge,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("question {question} must carry at least one weight")]
    EmptyWeights { question: QuestionId },
    #[error("question {question} has a non-finite weight")]
    NonFiniteWeight { question: QuestionId },
    #[error("question {question} has {options} {language} options for {weights} weights")]
    OptionCountMismatch {
        question: QuestionId,
        language: &'static str,
        options: usize,
        weights: usize,
    },
    #[error("question {question} has a blank {language} option")]
    BlankOption {
        question: QuestionId,
        language: &'static str,
    },
    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Checks the fields the type system cannot: a positive age.
pub(crate) fn validate_submission(submission: &AssessmentSubmission) -> Result<(), ValidationError> {
    if submission.age == 0 {
        return Err(ValidationError::InvalidAge);
    }
    Ok(())
}

/// Enforces the catalog invariants on a question before it is stored.
pub(crate) fn validate_question(question: &Question) -> Result<(), ValidationError> {
    if question.text.en.trim().is_empty() {
        return Err(ValidationError::MissingField("question text (en)"));
    }
    if question.text.hi.trim().is_empty() {
        return Err(ValidationError::MissingField("question text (hi)"));
    }
    if question.category.trim().is_empty() {
        return Err(ValidationError::MissingField("category"));
    }
    if question.age_groups.is_empty()
        || question
            .age_groups
            .iter()
            .any(|group| group.as_str().trim().is_empty())
    {
        return Err(ValidationError::MissingField("ageGroups"));
    }
    if question.weights.is_empty() {
        return Err(ValidationError::EmptyWeights {
            question: question.id,
        });
    }
    if question.weights.iter().any(|weight| !weight.is_finite()) {
        return Err(ValidationError::NonFiniteWeight {
            question: question.id,
        });
    }

    for (language, options) in [("en", &question.options.en), ("hi", &question.options.hi)] {
        if options.len() != question.weights.len() {
            return Err(ValidationError::OptionCountMismatch {
                question: question.id,
                language,
                options: options.len(),
                weights: question.weights.len(),
            });
        }
        if options.iter().any(|option| option.trim().is_empty()) {
            return Err(ValidationError::BlankOption {
                question: question.id,
                language,
            });
        }
    }

    Ok(())
}

/// Response keys in lookup order.
pub(crate) fn referenced_questions(submission: &AssessmentSubmission) -> BTreeSet<QuestionId> {
    submission.responses.keys().copied().collect()
}
