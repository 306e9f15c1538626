use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

pub const DEFAULT_LOCALE: &str = "en";
pub const DEFAULT_DOCUMENT_ID: &str = "local";

/// Settings read from `formfield.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Catalogue used to render validation messages.
    pub locale: String,
    /// Id given to documents whose payload has none.
    pub document_id: String,
    /// Message templates replacing catalogue entries, keyed like
    /// `form.validation.tooLong`.
    pub messages: BTreeMap<String, String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            document_id: DEFAULT_DOCUMENT_ID.to_string(),
            messages: BTreeMap::new(),
        }
    }
}

impl CliConfig {
    /// Loads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let config: CliConfig = toml::from_str(
            r#"
            locale = "de"

            [messages]
            "form.validation.blank" = "required!"
            "#,
        )
        .unwrap();
        assert_eq!(config.locale, "de");
        assert_eq!(config.document_id, DEFAULT_DOCUMENT_ID);
        assert_eq!(
            config.messages.get("form.validation.blank").map(String::as_str),
            Some("required!")
        );
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("formfield.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }
}
