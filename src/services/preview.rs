use anyhow::Result;
use serde::Serialize;

use crate::repositories::SheetRepository;
use crate::schemas::quiz::{Language, Quiz, QuizMetadata};
use crate::services::assembly::{assemble_quiz, languages_for};
use crate::services::description::DescriptionOverlay;

#[derive(Debug, Serialize)]
pub(crate) struct PreviewResult {
    pub(crate) metadata: QuizMetadata,
    pub(crate) quizzes: Vec<Quiz>,
}

/// Dry run of the weekly build: reads the sheet and assembles every
/// requested language without touching the Forms API. `None` means there is
/// nothing to create, either because the week has no metadata row or
/// because no language has questions.
pub(crate) async fn preview_quiz(
    repository: &dyn SheetRepository,
    overlay: &DescriptionOverlay,
    week: u32,
    language: Option<Language>,
) -> Result<Option<PreviewResult>> {
    let Some(metadata) = repository.quiz_metadata(week).await? else {
        tracing::info!(week, "No quiz metadata found");
        return Ok(None);
    };

    let mut quizzes = Vec::new();
    for language in languages_for(language) {
        if let Some(quiz) = assemble_quiz(repository, overlay, &metadata, week, language).await? {
            quizzes.push(quiz);
        }
    }

    if quizzes.is_empty() {
        tracing::info!(week, "No questions found for any requested language");
        return Ok(None);
    }

    Ok(Some(PreviewResult { metadata, quizzes }))
}
