use serde_yaml::Value;
use std::collections::HashMap;

use crate::domain::ports::secondary::{TranslationError as Error, Translator};

/// Default English catalog shipped with the service.
const DEFAULT_CATALOG: &str = include_str!("../../locales/en.yml");

/// A translation catalog loaded from a nested YAML document.
///
/// Nested mappings flatten into dot-separated keys, so
/// `core.email.activate_account.subject` addresses the `subject` entry
/// under `core: email: activate_account:`. Placeholder substitution is
/// literal: every `{name}` occurrence is replaced by the supplied value.
pub struct CatalogTranslator {
    catalog: HashMap<String, String>,
}

impl CatalogTranslator {
    pub fn from_yaml(source: &str) -> Result<CatalogTranslator, Error> {
        let value: Value = serde_yaml::from_str(source).map_err(|err| Error::Catalog {
            context: format!("Could not parse translation catalog: {err}"),
        })?;

        let mut catalog = HashMap::new();
        flatten(&value, None, &mut catalog);

        Ok(CatalogTranslator { catalog })
    }

    /// The catalog bundled into the binary, used when no locale file is
    /// configured.
    pub fn bundled() -> CatalogTranslator {
        CatalogTranslator::from_yaml(DEFAULT_CATALOG).expect("bundled translation catalog")
    }

    /// Load the catalog for a locale from the `locales` directory.
    pub fn for_locale(locale: &str) -> Result<CatalogTranslator, Error> {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("locales")
            .join(format!("{locale}.yml"));
        let source = std::fs::read_to_string(&path).map_err(|err| Error::Catalog {
            context: format!("Could not read {}: {err}", path.display()),
        })?;
        CatalogTranslator::from_yaml(&source)
    }
}

impl Translator for CatalogTranslator {
    fn translate(&self, key: &str) -> Result<String, Error> {
        self.catalog
            .get(key)
            .cloned()
            .ok_or_else(|| Error::MissingKey {
                context: key.to_string(),
            })
    }

    fn translate_with(
        &self,
        key: &str,
        placeholders: &HashMap<String, String>,
    ) -> Result<String, Error> {
        let template = self.translate(key)?;
        Ok(substitute(&template, placeholders))
    }
}

/// Replace each literal `{name}` token by its value.
fn substitute(template: &str, placeholders: &HashMap<String, String>) -> String {
    placeholders.iter().fold(template.to_string(), |acc, (k, v)| {
        acc.replace(&format!("{{{k}}}"), v)
    })
}

fn flatten(value: &Value, prefix: Option<&str>, out: &mut HashMap<String, String>) {
    match value {
        Value::Mapping(mapping) => {
            for (k, v) in mapping {
                if let Some(k) = k.as_str() {
                    let key = match prefix {
                        Some(prefix) => format!("{prefix}.{k}"),
                        None => k.to_string(),
                    };
                    flatten(v, Some(&key), out);
                }
            }
        }
        Value::String(s) => {
            if let Some(prefix) = prefix {
                out.insert(prefix.to_string(), s.clone());
            }
        }
        _ => {}
    }
}
