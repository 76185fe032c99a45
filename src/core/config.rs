use std::path::PathBuf;

use thiserror::Error;

mod parsing;

use parsing::{
    env_optional, env_or_default, env_raw, env_required, parse_bool, parse_i32, parse_sheet_id,
    parse_u32,
};

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    source: SourceSettings,
    forms: FormSettings,
    responses: ResponseSettings,
    google: GoogleSettings,
    descriptions: DescriptionSettings,
    telemetry: TelemetrySettings,
}

/// Where the quiz rows come from.
#[derive(Debug, Clone)]
pub(crate) struct SourceSettings {
    pub(crate) spreadsheet_id: String,
    pub(crate) sheet_name: String,
    /// Sheet gid used to resolve the current tab title. `None` disables the
    /// lookup and the configured name is used directly.
    pub(crate) sheet_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub(crate) struct FormSettings {
    /// Form to clone instead of creating a blank one. A clone inherits quiz
    /// mode, release policy and email collection from the template.
    pub(crate) template_form_id: Option<String>,
    pub(crate) default_points: u32,
    pub(crate) quiz_year: i32,
}

/// Spreadsheets the operator links form responses to by hand; the Forms API
/// cannot do the linking.
#[derive(Debug, Clone)]
pub(crate) struct ResponseSettings {
    pub(crate) english_spreadsheet_id: String,
    pub(crate) tamil_spreadsheet_id: String,
}

#[derive(Debug, Clone)]
pub(crate) struct GoogleSettings {
    pub(crate) credentials_path: PathBuf,
    pub(crate) token_path: PathBuf,
}

#[derive(Debug, Clone)]
pub(crate) struct DescriptionSettings {
    /// Directory holding the optional `English.md` / `Tamil.md` overrides.
    pub(crate) dir: PathBuf,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let spreadsheet_id = env_required("SOURCE_SPREADSHEET_ID")?;
        let sheet_name = env_or_default("SOURCE_SHEET_NAME", "QuizData");
        let sheet_id = parse_sheet_id("SOURCE_SHEET_ID", env_raw("SOURCE_SHEET_ID"))?;

        let template_form_id = env_optional("TEMPLATE_FORM_ID");
        let default_points = parse_u32("DEFAULT_POINTS", env_or_default("DEFAULT_POINTS", "2"))?;
        let quiz_year = parse_i32("QUIZ_YEAR", env_or_default("QUIZ_YEAR", "2026"))?;

        let english_spreadsheet_id = env_required("ENGLISH_RESPONSE_SPREADSHEET_ID")?;
        let tamil_spreadsheet_id = env_required("TAMIL_RESPONSE_SPREADSHEET_ID")?;

        let credentials_path =
            PathBuf::from(env_or_default("GOOGLE_CREDENTIALS_PATH", "credentials.json"));
        let token_path = PathBuf::from(env_or_default("GOOGLE_TOKEN_PATH", "token.json"));

        let description_dir = PathBuf::from(env_or_default("DESCRIPTION_DIR", "."));

        let log_level = env_or_default("QUIZFORM_LOG_LEVEL", "info");
        let json =
            env_optional("QUIZFORM_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            source: SourceSettings { spreadsheet_id, sheet_name, sheet_id },
            forms: FormSettings { template_form_id, default_points, quiz_year },
            responses: ResponseSettings { english_spreadsheet_id, tamil_spreadsheet_id },
            google: GoogleSettings { credentials_path, token_path },
            descriptions: DescriptionSettings { dir: description_dir },
            telemetry: TelemetrySettings { log_level, json },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn source(&self) -> &SourceSettings {
        &self.source
    }

    pub(crate) fn forms(&self) -> &FormSettings {
        &self.forms
    }

    pub(crate) fn responses(&self) -> &ResponseSettings {
        &self.responses
    }

    pub(crate) fn google(&self) -> &GoogleSettings {
        &self.google
    }

    pub(crate) fn descriptions(&self) -> &DescriptionSettings {
        &self.descriptions
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.forms.default_points == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DEFAULT_POINTS",
                value: String::from("0"),
            });
        }
        Ok(())
    }
}
