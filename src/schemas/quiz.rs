use serde::Serialize;

/// The two languages a weekly quiz is published in. Every branch on
/// language matches exhaustively; adding a language is a compile-time event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Language {
    #[serde(rename = "EN")]
    English,
    #[serde(rename = "TA")]
    Tamil,
}

impl Language {
    /// Processing order when no language filter is given.
    pub(crate) const ALL: [Language; 2] = [Language::English, Language::Tamil];

    pub(crate) fn display_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Tamil => "Tamil",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One quiz question in one language. `id` is unique within a week and
/// language, not globally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) week: u32,
    pub(crate) text: String,
    pub(crate) answer: String,
    pub(crate) scripture: String,
    pub(crate) points: u32,
}

impl Question {
    pub(crate) fn display_title(&self) -> String {
        format!("{}. {}", self.id, self.text)
    }

    /// The exact string the form grader compares submissions against.
    pub(crate) fn answer_key(&self) -> String {
        format!("{}, {}", self.scripture, self.answer)
    }
}

/// Week-level data shared by all languages of that week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct QuizMetadata {
    pub(crate) week: u32,
    pub(crate) dates: String,
    pub(crate) portion: String,
    pub(crate) year: i32,
}

impl QuizMetadata {
    pub(crate) fn header_line(&self) -> String {
        format!("Week {} | {} | {}", self.week, self.dates, self.portion)
    }
}

/// A fully assembled per-language quiz, ready for display or provisioning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Quiz {
    pub(crate) metadata: QuizMetadata,
    pub(crate) language: Language,
    pub(crate) questions: Vec<Question>,
    pub(crate) custom_description: Option<String>,
}

impl Quiz {
    /// The only constructor. A quiz without questions has no meaning, so an
    /// empty list yields `None` and the caller drops the language.
    pub(crate) fn assemble(
        metadata: QuizMetadata,
        language: Language,
        questions: Vec<Question>,
        custom_description: Option<String>,
    ) -> Option<Self> {
        if questions.is_empty() {
            return None;
        }
        Some(Self { metadata, language, questions, custom_description })
    }

    pub(crate) fn title(&self) -> String {
        format!(
            "Week {} - {} Bible Quiz | {}",
            self.metadata.week,
            self.language.display_name(),
            self.metadata.year
        )
    }

    pub(crate) fn description(&self) -> String {
        match &self.custom_description {
            Some(custom) => custom.clone(),
            None => self.metadata.header_line(),
        }
    }
}
