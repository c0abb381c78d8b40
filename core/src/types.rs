use serde::ser::{Serialize, Serializer};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Language id every highlighter can handle. Used when nothing claims a file
/// extension.
pub const PLAIN_TEXT_LANGUAGE_ID: &str = "text";

/// Id reported when no theme could be resolved.
pub const NO_THEME_ID: &str = "none";

// ---------------------------------------------------------------------------
// Language registration
// ---------------------------------------------------------------------------

/// A merged, ready-to-load language entry for a TextMate highlighter. One is
/// produced per (language id, scope name) pair.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageRegistration {
    pub name: String,
    pub display_name: String,
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_line_match: Option<String>,
    pub scope_name: String,

    // pattern tree
    pub patterns: Vec<Value>,
    pub repository: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injections: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injection_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_types: Option<Value>,

    pub embedded_langs: Vec<String>,
    pub embedded_langs_lazy: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inject_to: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balanced_bracket_selectors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unbalanced_bracket_selectors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folding_start_marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folding_stop_marker: Option<String>,

    // file matching metadata, kept for extension -> language lookups
    pub extensions: Vec<String>,
    pub filenames: Vec<String>,
    pub filename_patterns: Vec<String>,
    pub mimetypes: Vec<String>,
}

/// The parts of a grammar file that end up in a registration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGrammar {
    #[serde(default)]
    pub scope_name: Option<String>,
    #[serde(default)]
    pub patterns: Vec<Value>,
    #[serde(default)]
    pub repository: Map<String, Value>,
    #[serde(default)]
    pub injections: Option<Map<String, Value>>,
    #[serde(default)]
    pub injection_selector: Option<String>,
    #[serde(default)]
    pub file_types: Option<Value>,
}

/// Output of a language resolution: the registrations plus the requested or
/// embedded ids that had no contributions at all.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LanguageResolution {
    pub registrations: Vec<LanguageRegistration>,
    pub unresolved: Vec<String>,
}

impl LanguageResolution {
    /// Map an id or alias to a registration name within this set. Unknown
    /// input is returned unchanged.
    pub fn resolve_alias<'a>(&'a self, id: &'a str) -> &'a str {
        if self.registrations.iter().any(|r| r.name == id) {
            return id;
        }
        self.registrations
            .iter()
            .find(|r| r.aliases.iter().any(|a| a == id))
            .map(|r| r.name.as_str())
            .unwrap_or(id)
    }

    /// First registration for `id` (alias-resolved).
    pub fn lookup(&self, id: &str) -> Option<&LanguageRegistration> {
        let name = self.resolve_alias(id);
        self.registrations.iter().find(|r| r.name == name)
    }

    /// Language id of the first registration claiming `extension`, with or
    /// without its leading dot. Falls back to [`PLAIN_TEXT_LANGUAGE_ID`].
    pub fn resolve_extension(&self, extension: &str) -> &str {
        self.resolve_extension_or(extension, PLAIN_TEXT_LANGUAGE_ID)
    }

    pub fn resolve_extension_or<'a>(&'a self, extension: &str, fallback: &'a str) -> &'a str {
        let wanted = extension.trim_start_matches('.');
        if wanted.is_empty() {
            return fallback;
        }
        self.registrations
            .iter()
            .find(|r| {
                r.extensions
                    .iter()
                    .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(wanted))
            })
            .map(|r| r.name.as_str())
            .unwrap_or(fallback)
    }
}

// ---------------------------------------------------------------------------
// Theme registration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeType {
    Light,
    Dark,
}

/// A theme with its include chain merged into one record.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeRegistration {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub colors: Map<String, Value>,
    /// Token color rules, `tokenColors` in theme files.
    pub settings: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_highlighting: Option<bool>,
    pub semantic_token_colors: Map<String, Value>,
    #[serde(rename = "type")]
    pub theme_type: ThemeType,
}

/// Result of resolving the active theme. Serializes as `[id, registration]`,
/// or `["none", "none"]` when nothing was found.
#[derive(Debug, Clone, PartialEq)]
pub enum ThemeResolution {
    Found {
        id: String,
        theme: ThemeRegistration,
    },
    NotFound,
}

impl ThemeResolution {
    pub fn id(&self) -> &str {
        match self {
            ThemeResolution::Found { id, .. } => id,
            ThemeResolution::NotFound => NO_THEME_ID,
        }
    }

    pub fn theme(&self) -> Option<&ThemeRegistration> {
        match self {
            ThemeResolution::Found { theme, .. } => Some(theme),
            ThemeResolution::NotFound => None,
        }
    }
}

impl Serialize for ThemeResolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ThemeResolution::Found { id, theme } => (id, theme).serialize(serializer),
            ThemeResolution::NotFound => (NO_THEME_ID, NO_THEME_ID).serialize(serializer),
        }
    }
}
