use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::core::config::Settings;
use crate::schemas::quiz::{Language, QuizMetadata};

/// Replaces the first line of a per-language description file with the
/// current week's header. Authors keep a static `English.md` / `Tamil.md`
/// whose opening line is a placeholder; everything after it is carried over
/// verbatim.
#[derive(Debug, Clone)]
pub(crate) struct DescriptionOverlay {
    dir: PathBuf,
}

impl DescriptionOverlay {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.descriptions().dir.clone())
    }

    /// `None` when no usable description file exists; the quiz then falls
    /// back to the bare header line.
    pub(crate) fn resolve(
        &self,
        language: Language,
        metadata: &QuizMetadata,
    ) -> Result<Option<String>> {
        let path = self.dir.join(format!("{}.md", language.display_name()));

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(anyhow!(err)
                    .context(format!("Failed to read description file {}", path.display())))
            }
        };

        Ok(merge_description(&contents, metadata))
    }
}

fn merge_description(contents: &str, metadata: &QuizMetadata) -> Option<String> {
    if contents.is_empty() {
        return None;
    }

    let normalized = contents.replace("\r\n", "\n");
    let body = match normalized.split_once('\n') {
        Some((_, rest)) => rest.trim(),
        None => "",
    };

    Some(format!("{}\n\n{}", metadata.header_line(), body))
}
