use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::repositories::SheetRepository;
use crate::schemas::quiz::{Language, Question, Quiz, QuizMetadata};
use crate::services::FormService;

pub(crate) fn sample_metadata(week: u32) -> QuizMetadata {
    QuizMetadata {
        week,
        dates: "Jan 1-7".to_string(),
        portion: "Genesis 1-3".to_string(),
        year: 2026,
    }
}

pub(crate) fn sample_question(id: &str, week: u32) -> Question {
    Question {
        id: id.to_string(),
        week,
        text: format!("Question {id}"),
        answer: "East".to_string(),
        scripture: "Gen 2:8".to_string(),
        points: 2,
    }
}

/// In-memory sheet with call recording, keyed by language.
#[derive(Default)]
pub(crate) struct FakeSheetRepository {
    pub(crate) metadata: Option<QuizMetadata>,
    pub(crate) questions: HashMap<Language, Vec<Question>>,
    pub(crate) metadata_calls: AtomicUsize,
    pub(crate) question_calls: Mutex<Vec<(u32, Language)>>,
}

#[async_trait]
impl SheetRepository for FakeSheetRepository {
    async fn quiz_metadata(&self, week: u32) -> Result<Option<QuizMetadata>> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.metadata.clone().filter(|metadata| metadata.week == week))
    }

    async fn questions(&self, week: u32, language: Language) -> Result<Vec<Question>> {
        self.question_calls.lock().await.push((week, language));
        Ok(self
            .questions
            .get(&language)
            .map(|questions| {
                questions.iter().filter(|question| question.week == week).cloned().collect()
            })
            .unwrap_or_default())
    }
}

/// Form provisioner that records creations and can fail on one language.
#[derive(Default)]
pub(crate) struct FakeFormService {
    pub(crate) fail_for: Option<Language>,
    pub(crate) created: Mutex<Vec<(Language, String)>>,
    pub(crate) linked: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl FormService for FakeFormService {
    async fn create_form(&self, quiz: &Quiz) -> Result<String> {
        if self.fail_for == Some(quiz.language) {
            return Err(anyhow!("simulated form failure"));
        }
        let url = format!(
            "https://forms.example/{}/{}",
            quiz.language.display_name(),
            quiz.metadata.week
        );
        self.created.lock().await.push((quiz.language, url.clone()));
        Ok(url)
    }

    async fn link_responses(&self, form_id: &str, spreadsheet_id: &str) -> Result<()> {
        self.linked.lock().await.push((form_id.to_string(), spreadsheet_id.to_string()));
        Ok(())
    }
}

/// Fresh directory under the system temp dir, unique per test.
pub(crate) fn temp_dir(label: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "quizform-{label}-{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
