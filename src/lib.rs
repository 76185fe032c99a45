pub(crate) mod core;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, Context};

use crate::core::config::Settings;
use crate::core::telemetry;
use crate::repositories::sheets::GoogleSheetsRepository;
use crate::services::auth::GoogleAuth;
use crate::services::create::create_quiz;
use crate::services::description::DescriptionOverlay;
use crate::services::forms::GoogleFormsService;
use crate::services::preview::{preview_quiz, PreviewResult};

pub use crate::schemas::quiz::Language;

pub async fn run_preview(
    week: u32,
    language: Option<Language>,
    json: bool,
) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;

    let auth = Arc::new(GoogleAuth::from_settings(&settings)?);
    let repository = GoogleSheetsRepository::from_settings(&settings, auth)?;
    let overlay = DescriptionOverlay::from_settings(&settings);

    let Some(result) = preview_quiz(&repository, &overlay, week, language).await? else {
        return Err(anyhow!("No quiz data found for week {week}"));
    };

    if json {
        let serialized =
            serde_json::to_string_pretty(&result).context("Failed to serialize preview")?;
        println!("{serialized}");
    } else {
        print_preview(&result);
        println!();
        println!("Preview complete. Run the create command when ready.");
    }

    Ok(())
}

pub async fn run_create(
    week: u32,
    language: Option<Language>,
    assume_yes: bool,
) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;

    let auth = Arc::new(GoogleAuth::from_settings(&settings)?);
    let repository = GoogleSheetsRepository::from_settings(&settings, auth.clone())?;
    let overlay = DescriptionOverlay::from_settings(&settings);

    let Some(preview) = preview_quiz(&repository, &overlay, week, language).await? else {
        return Err(anyhow!("No quiz data found for week {week}"));
    };
    print_preview(&preview);
    println!();

    if !assume_yes && !confirm("Proceed with creating these forms?")? {
        println!("Aborted.");
        return Ok(());
    }

    let forms = GoogleFormsService::from_settings(&settings, auth)?;
    let Some(result) = create_quiz(&repository, &forms, &overlay, week, language).await? else {
        return Err(anyhow!("Failed to create forms for week {week}"));
    };

    println!("Forms created:");
    for (language, url) in &result.created_forms {
        println!("  {}: {url}", language.display_name());
    }

    println!();
    println!("Final steps (manual):");
    println!("  1. Open each form and check the questions against the sheet.");
    println!("  2. In Settings, set grade release to 'Later, after manual review'.");
    println!(
        "  3. In Responses, use 'Link to Sheets' to connect the English form to {} and the Tamil form to {}.",
        settings.responses().english_spreadsheet_id,
        settings.responses().tamil_spreadsheet_id
    );

    Ok(())
}

fn print_preview(result: &PreviewResult) {
    println!("{}", result.metadata.header_line());

    for quiz in &result.quizzes {
        println!();
        println!("[{}] {}", quiz.language.display_name(), quiz.title());
        println!("{}", quiz.description());
        for question in &quiz.questions {
            println!("  {}", question.display_title());
            println!("    Answer: {} ({} pts)", question.answer_key(), question.points);
        }
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input).context("Failed to read confirmation")?;

    Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
