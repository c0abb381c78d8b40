use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result};

// ---------------------------------------------------------------------------
// Contribution records
// ---------------------------------------------------------------------------

/// A `contributes.languages` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageContribution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filenames: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetypes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_line: Option<String>,
    /// Path of a `language-configuration.json`, relative to the extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
    /// Carried for inspection only; never used during resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Value>,
}

/// A `contributes.grammars` entry. Without `language` it is an orphan and is
/// indexed by `scope_name` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarContribution {
    pub scope_name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Sub-scope name -> embedded language id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_languages: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inject_to: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balanced_bracket_scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unbalanced_bracket_scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_types: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiTheme {
    #[serde(rename = "hc-black")]
    HcBlack,
    #[serde(rename = "hc-light")]
    HcLight,
    #[serde(rename = "vs-dark")]
    VsDark,
    #[serde(rename = "vs")]
    Vs,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A `contributes.themes` entry. Usable only when it has an `id` or a `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeContribution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub path: String,
    #[serde(default)]
    pub ui_theme: UiTheme,
}

impl ThemeContribution {
    /// The key a theme is registered under: `id`, falling back to `label`.
    pub fn key(&self) -> Option<&str> {
        self.id.as_deref().or(self.label.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Contributes {
    pub languages: Vec<LanguageContribution>,
    pub grammars: Vec<GrammarContribution>,
    pub themes: Vec<ThemeContribution>,
}

/// The parts of an extension `package.json` this crate reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Manifest {
    pub name: Option<String>,
    pub contributes: Contributes,
}

impl Manifest {
    /// Parse a manifest from raw `package.json` bytes.
    pub fn from_slice(bytes: &[u8], path: &Path) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| BridgeError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_value(&value, path)
    }

    /// Validate a decoded manifest once, up front.
    ///
    /// Contribution entries that do not match the schema are skipped with a
    /// diagnostic; the rest of the manifest is kept.
    pub fn from_value(value: &Value, path: &Path) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| BridgeError::Manifest {
            path: path.to_path_buf(),
            message: "manifest is not a JSON object".to_string(),
        })?;

        let name = object.get("name").and_then(Value::as_str).map(str::to_string);
        let contributes = match object.get("contributes") {
            Some(Value::Object(contributes)) => Contributes {
                languages: entries(contributes.get("languages"), "languages", path),
                grammars: entries(contributes.get("grammars"), "grammars", path),
                themes: entries(contributes.get("themes"), "themes", path),
            },
            _ => Contributes::default(),
        };

        Ok(Self { name, contributes })
    }
}

fn entries<T: DeserializeOwned>(value: Option<&Value>, field: &str, path: &Path) -> Vec<T> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    field,
                    error = %e,
                    "skipping malformed contribution"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_entries_are_skipped() {
        let value = json!({
            "name": "demo",
            "contributes": {
                "grammars": [
                    { "scopeName": "source.demo", "path": "./demo.json", "language": "demo" },
                    { "path": "./missing-scope.json" }
                ],
                "themes": [{ "label": "Demo", "path": "./t.json", "uiTheme": "vs-dark" }]
            }
        });
        let manifest = Manifest::from_value(&value, Path::new("package.json")).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("demo"));
        assert_eq!(manifest.contributes.grammars.len(), 1);
        assert_eq!(manifest.contributes.themes[0].ui_theme, UiTheme::VsDark);
        assert!(manifest.contributes.languages.is_empty());
    }

    #[test]
    fn unknown_ui_theme_deserializes() {
        let theme: ThemeContribution =
            serde_json::from_value(json!({ "id": "x", "path": "x.json", "uiTheme": "sepia" })).unwrap();
        assert_eq!(theme.ui_theme, UiTheme::Unknown);
        assert_eq!(theme.key(), Some("x"));
    }
}
