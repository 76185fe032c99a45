use anyhow::Result;

use crate::repositories::SheetRepository;
use crate::schemas::quiz::{Language, Quiz, QuizMetadata};
use crate::services::description::DescriptionOverlay;

/// English first, matching the order forms are published in.
pub(crate) fn languages_for(language: Option<Language>) -> Vec<Language> {
    match language {
        Some(language) => vec![language],
        None => Language::ALL.to_vec(),
    }
}

/// Builds one language edition of the weekly quiz, or `None` when the sheet
/// has no questions for that language.
pub(crate) async fn assemble_quiz(
    repository: &dyn SheetRepository,
    overlay: &DescriptionOverlay,
    metadata: &QuizMetadata,
    week: u32,
    language: Language,
) -> Result<Option<Quiz>> {
    let questions = repository.questions(week, language).await?;
    if questions.is_empty() {
        tracing::info!(week, language = %language, "No questions found; skipping language");
        return Ok(None);
    }

    let description = overlay.resolve(language, metadata)?;
    Ok(Quiz::assemble(metadata.clone(), language, questions, description))
}
