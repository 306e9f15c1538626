use std::collections::BTreeMap;

use field_engine::{MessageFormatter, ValidationError};
use handlebars::{Handlebars, no_escape};
use serde_json::{Map, Value};
use tracing::warn;

const EN: &str = include_str!("../i18n/en.json");
const DE: &str = include_str!("../i18n/de.json");

/// Validation messages rendered from a handlebars catalogue.
///
/// Templates are keyed by the error's message key and see the error context
/// (`max`, `gte`, `lte`, `in`) plus the rejected `value`.
pub struct CatalogFormatter {
    handlebars: Handlebars<'static>,
    locale: String,
}

impl CatalogFormatter {
    /// Catalogue for `locale` (English when unknown) with `overrides` applied
    /// on top.
    pub fn new(
        locale: &str,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let (locale, source) = match locale {
            "de" => ("de", DE),
            "en" => ("en", EN),
            other => {
                warn!(locale = other, "no message catalogue for locale; using en");
                ("en", EN)
            }
        };
        let mut templates: BTreeMap<String, String> = serde_json::from_str(source)?;
        templates.extend(overrides.clone());

        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(no_escape);
        for (key, template) in &templates {
            handlebars.register_template_string(key, template)?;
        }
        Ok(Self {
            handlebars,
            locale: locale.to_string(),
        })
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

impl MessageFormatter for CatalogFormatter {
    fn format(&self, error: &ValidationError) -> String {
        let key = error.kind.message_key();
        if !self.handlebars.has_template(&key) {
            return key;
        }
        let mut data: Map<String, Value> = error.context.clone();
        data.insert("value".into(), error.value.clone());
        match self.handlebars.render(&key, &data) {
            Ok(message) => message,
            Err(err) => {
                warn!(key = %key, error = %err, "failed to render validation message");
                key
            }
        }
    }
}
