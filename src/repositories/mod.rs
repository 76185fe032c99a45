use anyhow::Result;
use async_trait::async_trait;

use crate::schemas::quiz::{Language, Question, QuizMetadata};

pub(crate) mod sheets;

/// Read access to the weekly quiz rows.
///
/// Implementations return metadata and questions for a single week; callers
/// decide what an empty result means. `quiz_metadata` yields `None` when the
/// week has no metadata row at all.
#[async_trait]
pub(crate) trait SheetRepository: Send + Sync {
    async fn quiz_metadata(&self, week: u32) -> Result<Option<QuizMetadata>>;

    async fn questions(&self, week: u32, language: Language) -> Result<Vec<Question>>;
}
