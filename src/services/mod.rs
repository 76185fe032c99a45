use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::schemas::quiz::Quiz;

pub(crate) mod assembly;
pub(crate) mod auth;
pub(crate) mod create;
pub(crate) mod description;
pub(crate) mod forms;
pub(crate) mod preview;

/// Provisioning surface for quiz forms.
///
/// `create_form` returns the edit URL of the finished form. `link_responses`
/// exists so callers can express the full publishing flow; the Google
/// implementation cannot link a response spreadsheet over the API and
/// returns `Ok` without doing anything.
#[async_trait]
pub(crate) trait FormService: Send + Sync {
    async fn create_form(&self, quiz: &Quiz) -> Result<String>;

    async fn link_responses(&self, form_id: &str, spreadsheet_id: &str) -> Result<()>;
}

/// Pulls a human-readable message out of a Google error payload.
pub(crate) fn extract_error_message(payload: &Value) -> String {
    if let Some(message) = payload
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
    {
        return message.to_string();
    }

    if let Some(description) = payload.get("error_description").and_then(Value::as_str) {
        return description.to_string();
    }

    if let Some(error) = payload.get("error").and_then(Value::as_str) {
        return error.to_string();
    }

    if let Some(message) = payload.get("message").and_then(Value::as_str) {
        return message.to_string();
    }

    "unknown_error".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_nested_error_message() {
        let payload = json!({"error": {"message": "Requested entity was not found.", "code": 404}});
        assert_eq!(extract_error_message(&payload), "Requested entity was not found.");
    }

    #[test]
    fn extracts_oauth_error_description() {
        let payload = json!({"error": "invalid_grant", "error_description": "Token has been revoked."});
        assert_eq!(extract_error_message(&payload), "Token has been revoked.");
    }

    #[test]
    fn extracts_plain_error_string() {
        let payload = json!({"error": "invalid_grant"});
        assert_eq!(extract_error_message(&payload), "invalid_grant");
    }

    #[test]
    fn extracts_top_level_message() {
        let payload = json!({"message": "Backend unavailable"});
        assert_eq!(extract_error_message(&payload), "Backend unavailable");
    }

    #[test]
    fn falls_back_on_unrecognized_payloads() {
        assert_eq!(extract_error_message(&json!({"detail": "nope"})), "unknown_error");
        assert_eq!(extract_error_message(&json!(null)), "unknown_error");
    }
}
