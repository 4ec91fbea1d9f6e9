//! Persona profile: the static knowledge base the model speaks from.
//!
//! A persona is loaded once at startup from a data directory:
//!
//! | file | required | content |
//! |------|----------|---------|
//! | `facts.json` | yes | `{ "full_name": ..., "name": ... }` |
//! | `summary.txt` | yes | free-text biography |
//! | `style.txt` | yes | free-text notes on tone and voice |
//! | `resume.txt` | no | text extracted from the resume |
//!
//! Any missing required file or field is fatal: the process should not
//! start answering as someone it knows nothing about.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PersonaError;

/// Well-known persona file names.
pub const FACTS_FILE: &str = "facts.json";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const STYLE_FILE: &str = "style.txt";
pub const RESUME_FILE: &str = "resume.txt";

/// The static record describing who the model is speaking as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaProfile {
    pub full_name: String,
    pub display_name: String,
    pub summary: String,
    pub style_guide: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_extract: Option<String>,
}

#[derive(Deserialize)]
struct Facts {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl PersonaProfile {
    /// Load a persona from the files in `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, PersonaError> {
        let facts_path = dir.join(FACTS_FILE);
        let facts_raw = read_required(&facts_path)?;
        let facts: Facts =
            serde_json::from_str(&facts_raw).map_err(|e| PersonaError::ParseFailed {
                path: facts_path.clone(),
                reason: e.to_string(),
            })?;

        let full_name = non_empty(facts.full_name, "full_name", &facts_path)?;
        let display_name = non_empty(facts.name, "name", &facts_path)?;

        let summary_path = dir.join(SUMMARY_FILE);
        let summary = non_empty(Some(read_required(&summary_path)?), "summary", &summary_path)?;

        let style_path = dir.join(STYLE_FILE);
        let style_guide = non_empty(Some(read_required(&style_path)?), "style", &style_path)?;

        let resume_extract = read_optional(&dir.join(RESUME_FILE))?;

        debug!(
            persona = %display_name,
            has_resume = resume_extract.is_some(),
            "Persona loaded"
        );

        Ok(Self {
            full_name,
            display_name,
            summary,
            style_guide,
            resume_extract,
        })
    }
}

fn read_required(path: &Path) -> Result<String, PersonaError> {
    read_optional(path)?.ok_or_else(|| PersonaError::MissingFile {
        path: path.to_path_buf(),
    })
}

fn read_optional(path: &Path) -> Result<Option<String>, PersonaError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PersonaError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn non_empty(
    value: Option<String>,
    field: &'static str,
    path: &Path,
) -> Result<String, PersonaError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(PersonaError::MissingField {
            field,
            path: PathBuf::from(path),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_persona(dir: &Path, with_resume: bool) {
        std::fs::write(
            dir.join(FACTS_FILE),
            r#"{"full_name": "Ada Lovelace", "name": "Ada", "born": 1815}"#,
        )
        .unwrap();
        std::fs::write(dir.join(SUMMARY_FILE), "Mathematician and writer.\n").unwrap();
        std::fs::write(dir.join(STYLE_FILE), "Precise, warm, a little poetic.").unwrap();
        if with_resume {
            std::fs::write(dir.join(RESUME_FILE), "Notes on the Analytical Engine").unwrap();
        }
    }

    #[test]
    fn loads_complete_persona() {
        let tmp = TempDir::new().unwrap();
        write_persona(tmp.path(), true);

        let persona = PersonaProfile::load_dir(tmp.path()).unwrap();
        assert_eq!(persona.full_name, "Ada Lovelace");
        assert_eq!(persona.display_name, "Ada");
        assert_eq!(persona.summary, "Mathematician and writer.");
        assert_eq!(
            persona.resume_extract.as_deref(),
            Some("Notes on the Analytical Engine")
        );
    }

    #[test]
    fn resume_is_optional() {
        let tmp = TempDir::new().unwrap();
        write_persona(tmp.path(), false);

        let persona = PersonaProfile::load_dir(tmp.path()).unwrap();
        assert!(persona.resume_extract.is_none());
    }

    #[test]
    fn missing_summary_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_persona(tmp.path(), false);
        std::fs::remove_file(tmp.path().join(SUMMARY_FILE)).unwrap();

        let err = PersonaProfile::load_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, PersonaError::MissingFile { .. }));
    }

    #[test]
    fn missing_name_field_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_persona(tmp.path(), false);
        std::fs::write(tmp.path().join(FACTS_FILE), r#"{"full_name": "Ada Lovelace"}"#).unwrap();

        let err = PersonaProfile::load_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, PersonaError::MissingField { field: "name", .. }));
    }

    #[test]
    fn malformed_facts_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_persona(tmp.path(), false);
        std::fs::write(tmp.path().join(FACTS_FILE), "not json").unwrap();

        let err = PersonaProfile::load_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, PersonaError::ParseFailed { .. }));
    }
}
