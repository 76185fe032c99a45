use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::core::config::Settings;
use crate::repositories::SheetRepository;
use crate::schemas::quiz::{Language, Question, QuizMetadata};
use crate::services::auth::GoogleAuth;
use crate::services::extract_error_message;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// Fixed column layout of the source sheet (range A:J).
const COL_ID: usize = 0;
const COL_WEEK: usize = 1;
const COL_DATES: usize = 2;
const COL_PORTION: usize = 3;
const COL_TAMIL_TEXT: usize = 5;
const COL_SCRIPTURE: usize = 6;
const COL_TAMIL_ANSWER: usize = 7;
const COL_ENGLISH_TEXT: usize = 8;
const COL_ENGLISH_ANSWER: usize = 9;

const MIN_QUESTION_COLUMNS: usize = 10;

#[derive(Debug)]
pub(crate) struct GoogleSheetsRepository {
    client: Client,
    auth: Arc<GoogleAuth>,
    spreadsheet_id: String,
    sheet_name: String,
    sheet_id: Option<i64>,
    default_points: u32,
    quiz_year: i32,
    /// The tab title survives renames only if looked up by gid, so it is
    /// resolved once per repository instance and reused for every range read.
    resolved_title: OnceCell<String>,
}

impl GoogleSheetsRepository {
    pub(crate) fn from_settings(settings: &Settings, auth: Arc<GoogleAuth>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build Google Sheets HTTP client")?;

        Ok(Self {
            client,
            auth,
            spreadsheet_id: settings.source().spreadsheet_id.clone(),
            sheet_name: settings.source().sheet_name.clone(),
            sheet_id: settings.source().sheet_id,
            default_points: settings.forms().default_points,
            quiz_year: settings.forms().quiz_year,
            resolved_title: OnceCell::new(),
        })
    }

    async fn sheet_title(&self) -> Result<&str> {
        let title =
            self.resolved_title.get_or_try_init(|| self.resolve_sheet_title()).await?;
        Ok(title.as_str())
    }

    async fn resolve_sheet_title(&self) -> Result<String> {
        let Some(sheet_id) = self.sheet_id else {
            return Ok(self.sheet_name.clone());
        };

        let token = self.auth.access_token().await?;
        let url = format!(
            "{SHEETS_API_BASE}/{}?fields=sheets(properties(title,sheetId))",
            self.spreadsheet_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to call Google Sheets metadata API")?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .context("Failed to parse Google Sheets metadata response")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Google Sheets metadata request failed (status {status}): {}",
                extract_error_message(&payload)
            ));
        }

        match title_for_sheet_id(&payload, sheet_id) {
            Some(title) => Ok(title),
            None => {
                tracing::warn!(
                    sheet_id,
                    fallback = %self.sheet_name,
                    "Sheet gid not found in spreadsheet; falling back to configured name"
                );
                Ok(self.sheet_name.clone())
            }
        }
    }

    async fn fetch_rows(&self) -> Result<Vec<Value>> {
        let title = self.sheet_title().await?;
        let range = format!("'{title}'!A:J");

        let mut url = Url::parse(SHEETS_API_BASE)
            .context("Failed to parse Google Sheets API base URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Sheets API base URL cannot hold path segments"))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&range);

        let token = self.auth.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to call Google Sheets values API")?;

        let status = response.status();
        let payload: Value =
            response.json().await.context("Failed to parse Google Sheets values response")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Google Sheets values request failed (status {status}): {}",
                extract_error_message(&payload)
            ));
        }

        let rows = payload
            .get("values")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(rows)
    }
}

#[async_trait]
impl SheetRepository for GoogleSheetsRepository {
    async fn quiz_metadata(&self, week: u32) -> Result<Option<QuizMetadata>> {
        let rows = self.fetch_rows().await?;
        Ok(metadata_from_rows(&rows, week, self.quiz_year))
    }

    async fn questions(&self, week: u32, language: Language) -> Result<Vec<Question>> {
        let rows = self.fetch_rows().await?;
        let scan = scan_questions(&rows, week, language, self.default_points);

        if scan.skipped_short > 0 || scan.skipped_blank > 0 {
            tracing::info!(
                week,
                language = %language,
                kept = scan.questions.len(),
                skipped_short_rows = scan.skipped_short,
                skipped_blank_rows = scan.skipped_blank,
                "Dropped rows while reading questions"
            );
        }

        Ok(scan.questions)
    }
}

/// Cell accessor tolerant of rows shorter than the column index and of
/// non-string cells the API occasionally returns.
fn cell_text(row: &[Value], index: usize) -> String {
    match row.get(index) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

fn metadata_from_rows(rows: &[Value], week: u32, year: i32) -> Option<QuizMetadata> {
    let week_text = week.to_string();

    for row in rows.iter().skip(1) {
        let cells = row.as_array().map(Vec::as_slice).unwrap_or(&[]);
        if cells.len() < 2 {
            continue;
        }
        if cell_text(cells, COL_WEEK) != week_text {
            continue;
        }
        return Some(QuizMetadata {
            week,
            dates: cell_text(cells, COL_DATES),
            portion: cell_text(cells, COL_PORTION),
            year,
        });
    }

    None
}

struct QuestionScan {
    questions: Vec<Question>,
    skipped_short: usize,
    skipped_blank: usize,
}

fn scan_questions(rows: &[Value], week: u32, language: Language, points: u32) -> QuestionScan {
    let week_text = week.to_string();
    let (text_col, answer_col) = match language {
        Language::English => (COL_ENGLISH_TEXT, COL_ENGLISH_ANSWER),
        Language::Tamil => (COL_TAMIL_TEXT, COL_TAMIL_ANSWER),
    };

    let mut scan = QuestionScan { questions: Vec::new(), skipped_short: 0, skipped_blank: 0 };

    for (index, row) in rows.iter().enumerate().skip(1) {
        let cells = row.as_array().map(Vec::as_slice).unwrap_or(&[]);
        if cell_text(cells, COL_WEEK) != week_text {
            continue;
        }
        if cells.len() < MIN_QUESTION_COLUMNS {
            scan.skipped_short += 1;
            tracing::debug!(row = index + 1, columns = cells.len(), "Skipping row with too few columns");
            continue;
        }

        let text = cell_text(cells, text_col);
        let answer = cell_text(cells, answer_col);
        if text.trim().is_empty() || answer.trim().is_empty() {
            scan.skipped_blank += 1;
            tracing::debug!(row = index + 1, language = %language, "Skipping row with blank question or answer");
            continue;
        }

        scan.questions.push(Question {
            id: cell_text(cells, COL_ID),
            week,
            text,
            answer,
            scripture: cell_text(cells, COL_SCRIPTURE),
            points,
        });
    }

    scan
}

fn title_for_sheet_id(payload: &Value, sheet_id: i64) -> Option<String> {
    payload
        .get("sheets")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|sheet| sheet.get("properties"))
        .find(|properties| {
            properties.get("sheetId").and_then(Value::as_i64) == Some(sheet_id)
        })
        .and_then(|properties| properties.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata_row(week: &str, dates: &str, portion: &str) -> Value {
        json!([null, week, dates, portion])
    }

    fn question_row(
        id: &str,
        week: &str,
        ta_text: &str,
        scripture: &str,
        ta_answer: &str,
        en_text: &str,
        en_answer: &str,
    ) -> Value {
        json!([id, week, "Jan 1-7", "Genesis 1-3", "", ta_text, scripture, ta_answer, en_text, en_answer])
    }

    fn header_row() -> Value {
        json!(["ID", "Week", "Dates", "Portion", "", "Tamil", "Scripture", "TamilAnswer", "English", "EnglishAnswer"])
    }

    #[test]
    fn metadata_matches_week_by_text() {
        let rows = vec![
            header_row(),
            metadata_row("2", "Dec 25-31", "Exodus 1-2"),
            metadata_row("3", "Jan 1-7", "Genesis 1-3"),
        ];

        let metadata = metadata_from_rows(&rows, 3, 2026).expect("metadata");
        assert_eq!(metadata.week, 3);
        assert_eq!(metadata.dates, "Jan 1-7");
        assert_eq!(metadata.portion, "Genesis 1-3");
        assert_eq!(metadata.year, 2026);
    }

    #[test]
    fn metadata_first_match_wins() {
        let rows = vec![
            header_row(),
            metadata_row("3", "First", "Genesis"),
            metadata_row("3", "Second", "Exodus"),
        ];

        let metadata = metadata_from_rows(&rows, 3, 2026).expect("metadata");
        assert_eq!(metadata.dates, "First");
    }

    #[test]
    fn metadata_skips_header_even_when_it_looks_like_data() {
        let rows = vec![metadata_row("3", "Header dates", "Header portion")];
        assert!(metadata_from_rows(&rows, 3, 2026).is_none());
    }

    #[test]
    fn metadata_week_comparison_is_textual() {
        let rows = vec![header_row(), metadata_row("03", "Padded", "x"), metadata_row("3 ", "Spaced", "x")];
        assert!(metadata_from_rows(&rows, 3, 2026).is_none());
    }

    #[test]
    fn metadata_tolerates_short_rows() {
        let rows = vec![header_row(), json!(["only one cell"]), json!([null, "3"])];
        let metadata = metadata_from_rows(&rows, 3, 2026).expect("metadata");
        assert_eq!(metadata.dates, "");
        assert_eq!(metadata.portion, "");
    }

    #[test]
    fn metadata_accepts_numeric_week_cells() {
        let rows = vec![header_row(), json!([null, 3, "Jan 1-7", "Genesis 1-3"])];
        assert!(metadata_from_rows(&rows, 3, 2026).is_some());
    }

    #[test]
    fn questions_pick_english_columns() {
        let rows = vec![
            header_row(),
            question_row("1", "3", "கிழக்கு?", "Gen 2:8", "கிழக்கு", "Where was Eden?", "East"),
        ];

        let scan = scan_questions(&rows, 3, Language::English, 2);
        assert_eq!(scan.questions.len(), 1);
        let question = &scan.questions[0];
        assert_eq!(question.text, "Where was Eden?");
        assert_eq!(question.answer, "East");
        assert_eq!(question.scripture, "Gen 2:8");
        assert_eq!(question.points, 2);
    }

    #[test]
    fn questions_pick_tamil_columns() {
        let rows = vec![
            header_row(),
            question_row("1", "3", "கிழக்கு?", "Gen 2:8", "கிழக்கு", "Where was Eden?", "East"),
        ];

        let scan = scan_questions(&rows, 3, Language::Tamil, 2);
        assert_eq!(scan.questions.len(), 1);
        assert_eq!(scan.questions[0].text, "கிழக்கு?");
        assert_eq!(scan.questions[0].answer, "கிழக்கு");
    }

    #[test]
    fn questions_preserve_sheet_order() {
        let rows = vec![
            header_row(),
            question_row("1", "3", "t", "Gen 1:1", "t", "First", "a"),
            question_row("2", "3", "t", "Gen 1:2", "t", "Second", "b"),
            question_row("3", "3", "t", "Gen 1:3", "t", "Third", "c"),
        ];

        let scan = scan_questions(&rows, 3, Language::English, 2);
        let ids: Vec<&str> = scan.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn questions_skip_short_rows_and_count_them() {
        let rows = vec![
            header_row(),
            json!(["1", "3", "Jan", "Gen", "", "t", "Gen 1:1", "t"]),
            question_row("2", "3", "t", "Gen 1:2", "t", "Kept", "a"),
        ];

        let scan = scan_questions(&rows, 3, Language::English, 2);
        assert_eq!(scan.questions.len(), 1);
        assert_eq!(scan.questions[0].text, "Kept");
        assert_eq!(scan.skipped_short, 1);
        assert_eq!(scan.skipped_blank, 0);
    }

    #[test]
    fn questions_skip_blank_text_or_answer() {
        let rows = vec![
            header_row(),
            question_row("1", "3", "t", "Gen 1:1", "t", "   ", "East"),
            question_row("2", "3", "t", "Gen 1:2", "t", "Where?", "  "),
            question_row("3", "3", "t", "Gen 1:3", "t", "Kept", "Yes"),
        ];

        let scan = scan_questions(&rows, 3, Language::English, 2);
        assert_eq!(scan.questions.len(), 1);
        assert_eq!(scan.skipped_blank, 2);
    }

    #[test]
    fn questions_keep_untrimmed_cell_text() {
        let rows = vec![header_row(), question_row("1", "3", "t", "Gen 1:1", "t", " Padded? ", " East ")];

        let scan = scan_questions(&rows, 3, Language::English, 2);
        assert_eq!(scan.questions[0].text, " Padded? ");
        assert_eq!(scan.questions[0].answer, " East ");
    }

    #[test]
    fn scanning_twice_yields_identical_questions() {
        let rows = vec![
            header_row(),
            question_row("1", "3", "t", "Gen 1:1", "t", "First", "a"),
            question_row("2", "3", "t", "Gen 1:2", "t", "Second", "b"),
        ];

        let first = scan_questions(&rows, 3, Language::English, 2);
        let second = scan_questions(&rows, 3, Language::English, 2);
        assert_eq!(first.questions, second.questions);
    }

    #[test]
    fn questions_ignore_other_weeks() {
        let rows = vec![
            header_row(),
            question_row("1", "2", "t", "Gen 1:1", "t", "Other week", "a"),
            question_row("2", "3", "t", "Gen 1:2", "t", "This week", "b"),
        ];

        let scan = scan_questions(&rows, 3, Language::English, 2);
        assert_eq!(scan.questions.len(), 1);
        assert_eq!(scan.questions[0].text, "This week");
    }

    #[test]
    fn title_lookup_finds_matching_gid() {
        let payload = json!({
            "sheets": [
                {"properties": {"title": "Old", "sheetId": 11}},
                {"properties": {"title": "QuizData 2026", "sheetId": 0}},
            ]
        });

        assert_eq!(title_for_sheet_id(&payload, 0), Some("QuizData 2026".to_string()));
    }

    #[test]
    fn title_lookup_misses_unknown_gid() {
        let payload = json!({
            "sheets": [{"properties": {"title": "Only", "sheetId": 5}}]
        });

        assert_eq!(title_for_sheet_id(&payload, 0), None);
        assert_eq!(title_for_sheet_id(&json!({}), 0), None);
    }

    #[test]
    fn cell_text_renders_numbers() {
        let row = vec![json!(12), json!("text"), json!(true)];
        assert_eq!(cell_text(&row, 0), "12");
        assert_eq!(cell_text(&row, 1), "text");
        assert_eq!(cell_text(&row, 2), "true");
        assert_eq!(cell_text(&row, 9), "");
    }
}
