use anyhow::Result;
use serde::Serialize;

use crate::repositories::SheetRepository;
use crate::schemas::quiz::{Language, QuizMetadata};
use crate::services::assembly::{assemble_quiz, languages_for};
use crate::services::description::DescriptionOverlay;
use crate::services::FormService;

#[derive(Debug, Serialize)]
pub(crate) struct CreateQuizResult {
    pub(crate) metadata: QuizMetadata,
    pub(crate) created_forms: Vec<(Language, String)>,
}

/// Builds and provisions one form per requested language, in order. Each
/// language is assembled fresh and created before the next one is read, so
/// a failure stops the run with every earlier language already published.
/// Callers that need a clean slate after a partial run clean up by hand.
pub(crate) async fn create_quiz(
    repository: &dyn SheetRepository,
    forms: &dyn FormService,
    overlay: &DescriptionOverlay,
    week: u32,
    language: Option<Language>,
) -> Result<Option<CreateQuizResult>> {
    let Some(metadata) = repository.quiz_metadata(week).await? else {
        tracing::info!(week, "No quiz metadata found");
        return Ok(None);
    };

    let mut created_forms = Vec::new();
    for language in languages_for(language) {
        let Some(quiz) = assemble_quiz(repository, overlay, &metadata, week, language).await?
        else {
            continue;
        };
        let url = forms.create_form(&quiz).await?;
        created_forms.push((language, url));
    }

    if created_forms.is_empty() {
        tracing::info!(week, "No questions found for any requested language");
        return Ok(None);
    }

    Ok(Some(CreateQuizResult { metadata, created_forms }))
}
