use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::schemas::quiz::Quiz;
use crate::services::auth::GoogleAuth;
use crate::services::{extract_error_message, FormService};

const FORMS_API_BASE: &str = "https://forms.googleapis.com/v1/forms";
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3/files";
const FORMS_MIME_TYPE: &str = "application/vnd.google-apps.form";

#[derive(Debug)]
pub(crate) struct GoogleFormsService {
    client: Client,
    auth: Arc<GoogleAuth>,
    /// When set, new forms are Drive copies of this template instead of
    /// blank forms. The copy inherits quiz mode, grade release policy and
    /// email collection, none of which the Forms API can fully configure.
    template_form_id: Option<String>,
}

impl GoogleFormsService {
    pub(crate) fn from_settings(settings: &Settings, auth: Arc<GoogleAuth>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build Google Forms HTTP client")?;

        Ok(Self { client, auth, template_form_id: settings.forms().template_form_id.clone() })
    }

    /// First free title in the sequence base, "base (1)", "base (2)", ...
    async fn resolve_unique_title(&self, base: &str) -> Result<String> {
        let mut candidates = title_candidates(base);
        loop {
            let candidate =
                candidates.next().context("Title candidate sequence ended unexpectedly")?;
            if !self.title_taken(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(title = %candidate, "Form title already taken; trying next suffix");
        }
    }

    async fn title_taken(&self, title: &str) -> Result<bool> {
        let token = self.auth.access_token().await?;
        let query = drive_name_query(title);

        let response = self
            .client
            .get(DRIVE_API_BASE)
            .query(&[("q", query.as_str()), ("spaces", "drive"), ("fields", "files(id, name)")])
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to call Google Drive search API")?;

        let status = response.status();
        let payload: Value =
            response.json().await.context("Failed to parse Google Drive search response")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Google Drive search failed (status {status}): {}",
                extract_error_message(&payload)
            ));
        }

        let taken = payload
            .get("files")
            .and_then(Value::as_array)
            .map(|files| !files.is_empty())
            .unwrap_or(false);
        Ok(taken)
    }

    async fn copy_template(&self, template_id: &str, title: &str) -> Result<String> {
        let token = self.auth.access_token().await?;
        let url = format!("{DRIVE_API_BASE}/{template_id}/copy");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({"name": title}))
            .send()
            .await
            .context("Failed to call Google Drive copy API")?;

        let status = response.status();
        let payload: Value =
            response.json().await.context("Failed to parse Google Drive copy response")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Template copy failed (status {status}): {}",
                extract_error_message(&payload)
            ));
        }

        payload
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("Google Drive copy response missing file id")
    }

    async fn create_blank_form(&self, title: &str) -> Result<String> {
        let token = self.auth.access_token().await?;

        let response = self
            .client
            .post(FORMS_API_BASE)
            .bearer_auth(token)
            .json(&json!({"info": {"title": title, "documentTitle": title}}))
            .send()
            .await
            .context("Failed to call Google Forms create API")?;

        let status = response.status();
        let payload: Value =
            response.json().await.context("Failed to parse Google Forms create response")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Form creation failed (status {status}): {}",
                extract_error_message(&payload)
            ));
        }

        payload
            .get("formId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("Google Forms create response missing formId")
    }

    async fn batch_update(&self, form_id: &str, body: &Value) -> Result<()> {
        let token = self.auth.access_token().await?;
        let url = format!("{FORMS_API_BASE}/{form_id}:batchUpdate");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .context("Failed to call Google Forms batchUpdate API")?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .context("Failed to parse Google Forms batchUpdate response")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Form batch update failed (status {status}): {}",
                extract_error_message(&payload)
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl FormService for GoogleFormsService {
    async fn create_form(&self, quiz: &Quiz) -> Result<String> {
        let title = self.resolve_unique_title(&quiz.title()).await?;

        let form_id = match self.template_form_id.as_deref() {
            Some(template_id) => self.copy_template(template_id, &title).await?,
            None => self.create_blank_form(&title).await?,
        };

        let body = batch_update_body(quiz, &title, self.template_form_id.is_none());
        if let Err(err) = self.batch_update(&form_id, &body).await {
            tracing::error!(
                form_id = %form_id,
                title = %title,
                "Form was created but populating it failed; an orphaned form is left behind"
            );
            return Err(err);
        }

        let url = form_edit_url(&form_id);
        tracing::info!(
            title = %title,
            url = %url,
            language = %quiz.language,
            questions = quiz.questions.len(),
            "Created quiz form"
        );

        Ok(url)
    }

    async fn link_responses(&self, form_id: &str, spreadsheet_id: &str) -> Result<()> {
        // The Forms REST API has no endpoint for linking a response spreadsheet.
        tracing::debug!(
            form_id = %form_id,
            spreadsheet_id = %spreadsheet_id,
            "Response linking must be done in the Forms UI"
        );
        Ok(())
    }
}

fn title_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string()).chain((1..).map(move |n| format!("{base} ({n})")))
}

/// Drive queries wrap the name in single quotes, so embedded quotes get a
/// backslash escape.
fn drive_name_query(title: &str) -> String {
    let escaped = title.replace('\'', "\\'");
    format!("name = '{escaped}' and mimeType = '{FORMS_MIME_TYPE}' and trashed = false")
}

/// One batch populates the whole form: info update first, quiz settings for
/// blank forms only, then every question at its sheet position. Forms
/// applies a batch atomically, so a rejected request leaves the form empty
/// rather than half-filled.
fn batch_update_body(quiz: &Quiz, title: &str, apply_quiz_settings: bool) -> Value {
    let mut requests = vec![json!({
        "updateFormInfo": {
            "info": {"title": title, "description": quiz.description()},
            "updateMask": "title,description"
        }
    })];

    if apply_quiz_settings {
        requests.push(json!({
            "updateSettings": {
                "settings": {
                    "quizSettings": {"isQuiz": true},
                    "emailCollectionType": "VERIFIED"
                },
                "updateMask": "quizSettings.isQuiz,emailCollectionType"
            }
        }));
    }

    for (index, question) in quiz.questions.iter().enumerate() {
        requests.push(json!({
            "createItem": {
                "item": {
                    "title": question.display_title(),
                    "questionItem": {
                        "question": {
                            "required": true,
                            "grading": {
                                "pointValue": question.points,
                                "correctAnswers": {
                                    "answers": [{"value": question.answer_key()}]
                                }
                            },
                            "textQuestion": {}
                        }
                    }
                },
                "location": {"index": index}
            }
        }));
    }

    json!({"requests": requests})
}

fn form_edit_url(form_id: &str) -> String {
    format!("https://docs.google.com/forms/d/{form_id}/edit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    use crate::schemas::quiz::Language;
    use crate::test_support::{sample_metadata, sample_question};

    fn sample_quiz(language: Language) -> Quiz {
        Quiz::assemble(
            sample_metadata(3),
            language,
            vec![sample_question("1", 3), sample_question("2", 3)],
            None,
        )
        .expect("quiz")
    }

    #[test]
    fn title_candidates_append_numeric_suffixes() {
        let mut candidates = title_candidates("Week 3 - English Bible Quiz | 2026");
        assert_eq!(candidates.next().as_deref(), Some("Week 3 - English Bible Quiz | 2026"));
        assert_eq!(candidates.next().as_deref(), Some("Week 3 - English Bible Quiz | 2026 (1)"));
        assert_eq!(candidates.next().as_deref(), Some("Week 3 - English Bible Quiz | 2026 (2)"));
    }

    #[test]
    fn first_free_candidate_wins() {
        let taken: HashSet<&str> = ["Quiz", "Quiz (1)"].into_iter().collect();
        let chosen =
            title_candidates("Quiz").find(|candidate| !taken.contains(candidate.as_str()));
        assert_eq!(chosen.as_deref(), Some("Quiz (2)"));
    }

    #[test]
    fn drive_query_escapes_single_quotes() {
        assert_eq!(
            drive_name_query("God's Word"),
            "name = 'God\\'s Word' and mimeType = 'application/vnd.google-apps.form' and trashed = false"
        );
    }

    #[test]
    fn batch_updates_info_first() {
        let quiz = sample_quiz(Language::English);
        let body = batch_update_body(&quiz, "Resolved Title", true);

        let requests = body["requests"].as_array().expect("requests");
        assert_eq!(requests[0]["updateFormInfo"]["info"]["title"], "Resolved Title");
        assert_eq!(
            requests[0]["updateFormInfo"]["info"]["description"],
            "Week 3 | Jan 1-7 | Genesis 1-3"
        );
        assert_eq!(requests[0]["updateFormInfo"]["updateMask"], "title,description");
    }

    #[test]
    fn blank_forms_get_quiz_settings() {
        let quiz = sample_quiz(Language::English);
        let body = batch_update_body(&quiz, "T", true);

        let requests = body["requests"].as_array().expect("requests");
        let settings = &requests[1]["updateSettings"];
        assert_eq!(settings["settings"]["quizSettings"]["isQuiz"], true);
        assert_eq!(settings["settings"]["emailCollectionType"], "VERIFIED");
        assert_eq!(settings["updateMask"], "quizSettings.isQuiz,emailCollectionType");
    }

    #[test]
    fn template_clones_skip_quiz_settings() {
        let quiz = sample_quiz(Language::English);
        let body = batch_update_body(&quiz, "T", false);

        let requests = body["requests"].as_array().expect("requests");
        assert!(requests.iter().all(|request| request.get("updateSettings").is_none()));
        assert!(requests[1].get("createItem").is_some());
    }

    #[test]
    fn questions_are_placed_in_sheet_order() {
        let quiz = sample_quiz(Language::English);
        let body = batch_update_body(&quiz, "T", true);

        let requests = body["requests"].as_array().expect("requests");
        let items: Vec<&Value> =
            requests.iter().filter(|request| request.get("createItem").is_some()).collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["createItem"]["location"]["index"], 0);
        assert_eq!(items[1]["createItem"]["location"]["index"], 1);
        assert_eq!(items[0]["createItem"]["item"]["title"], "1. Question 1");
        assert_eq!(items[1]["createItem"]["item"]["title"], "2. Question 2");
    }

    #[test]
    fn graded_answers_carry_scripture_and_points() {
        let quiz = sample_quiz(Language::English);
        let body = batch_update_body(&quiz, "T", true);

        let question =
            &body["requests"][2]["createItem"]["item"]["questionItem"]["question"];
        assert_eq!(question["required"], true);
        assert_eq!(question["grading"]["pointValue"], 2);
        assert_eq!(question["grading"]["correctAnswers"]["answers"][0]["value"], "Gen 2:8, East");
        assert!(question["textQuestion"].is_object());
    }

    #[test]
    fn edit_url_points_at_the_editor() {
        assert_eq!(form_edit_url("abc123"), "https://docs.google.com/forms/d/abc123/edit");
    }

    #[tokio::test]
    async fn link_responses_is_a_noop() {
        let service = GoogleFormsService {
            client: Client::new(),
            auth: Arc::new(
                GoogleAuth::new(PathBuf::from("credentials.json"), PathBuf::from("token.json"))
                    .expect("auth"),
            ),
            template_form_id: None,
        };

        service.link_responses("form-1", "sheet-1").await.expect("noop");
    }
}
