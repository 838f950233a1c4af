//! Validation helpers for DTOs.

use crate::state::game::{GameError, QuestionKind};

/// Validates an incoming question payload before it reaches the state machine.
///
/// Rejects blank text, fewer than two options, blank options, and a correct
/// answer that is empty. The correct answer is not required to be one of the
/// options: the admin form sends prefixed option strings for multiple choice
/// and plain labels for true/false.
pub fn validate_question(
    kind: QuestionKind,
    question: &str,
    options: &[String],
    correct_answer: &str,
) -> Result<(), GameError> {
    if question.trim().is_empty() {
        return Err(GameError::InvalidQuestion("question text is empty".into()));
    }

    if options.len() < 2 {
        return Err(GameError::InvalidQuestion(format!(
            "at least 2 options are required (got {})",
            options.len()
        )));
    }

    if options.iter().any(|option| option.trim().is_empty()) {
        return Err(GameError::InvalidQuestion("options must not be blank".into()));
    }

    if kind == QuestionKind::TrueFalse && options.len() != 2 {
        return Err(GameError::InvalidQuestion(
            "true/false questions take exactly 2 options".into(),
        ));
    }

    if correct_answer.trim().is_empty() {
        return Err(GameError::InvalidQuestion("correct answer is empty".into()));
    }

    Ok(())
}
