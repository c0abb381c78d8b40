use serde_json::{Map, Value};

use crate::manifest::LanguageContribution;

// ---------------------------------------------------------------------------
// Language contributions
// ---------------------------------------------------------------------------

/// All language contributions for one id folded into a single record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedLanguage {
    pub id: String,
    pub aliases: Vec<String>,
    pub extensions: Vec<String>,
    pub filenames: Vec<String>,
    pub filename_patterns: Vec<String>,
    pub mimetypes: Vec<String>,
    pub first_line: Option<String>,
}

impl MergedLanguage {
    /// A record carrying only an id, used for orphan scopes.
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// First alias, else the id.
    pub fn display_name(&self) -> &str {
        self.aliases.first().map(String::as_str).unwrap_or(&self.id)
    }

    /// Aliases with the id itself removed.
    pub fn aliases_without_self(&self) -> Vec<String> {
        self.aliases
            .iter()
            .filter(|alias| **alias != self.id)
            .cloned()
            .collect()
    }
}

/// List fields concatenate in registration order, duplicates included.
/// `first_line` is last-wins; a differing overwrite is logged.
pub fn merge_language_contributions<'a>(
    id: &str,
    languages: impl IntoIterator<Item = &'a LanguageContribution>,
) -> MergedLanguage {
    let mut merged = MergedLanguage::bare(id);

    for language in languages {
        merged.aliases.extend(language.aliases.iter().flatten().cloned());
        merged.extensions.extend(language.extensions.iter().flatten().cloned());
        merged.filenames.extend(language.filenames.iter().flatten().cloned());
        merged
            .filename_patterns
            .extend(language.filename_patterns.iter().flatten().cloned());
        merged.mimetypes.extend(language.mimetypes.iter().flatten().cloned());

        if let Some(first_line) = &language.first_line {
            if let Some(previous) = &merged.first_line {
                if previous != first_line {
                    tracing::warn!(
                        language_id = %id,
                        field = "firstLine",
                        previous = %previous,
                        next = %first_line,
                        "conflicting value overwritten"
                    );
                }
            }
            merged.first_line = Some(first_line.clone());
        }
    }

    merged
}

// ---------------------------------------------------------------------------
// Language configuration files
// ---------------------------------------------------------------------------

/// Merged `language-configuration.json` content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageConfiguration {
    pub auto_closing_pairs: Vec<Value>,
    pub brackets: Vec<Value>,
    pub on_enter_rules: Vec<Value>,
    /// `lineComment`, `blockComment`.
    pub comments: Map<String, Value>,
    pub indentation_rules: Map<String, Value>,
    pub word_pattern: Option<Value>,
    /// `folding.markers`: `start`, `end`.
    pub folding_markers: Map<String, Value>,
}

impl LanguageConfiguration {
    pub fn folding_start_marker(&self) -> Option<String> {
        marker_pattern(self.folding_markers.get("start"))
    }

    pub fn folding_stop_marker(&self) -> Option<String> {
        marker_pattern(self.folding_markers.get("end"))
    }
}

/// Markers are usually strings; the `{ "pattern": ... }` form is accepted too.
fn marker_pattern(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get("pattern").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Fold configuration files in order. Arrays concatenate, nested maps merge
/// key by key, scalars are last-wins. Every differing overwrite is logged.
pub fn merge_language_configurations<'a>(
    id: &str,
    configurations: impl IntoIterator<Item = &'a Value>,
) -> LanguageConfiguration {
    let mut merged = LanguageConfiguration::default();

    for configuration in configurations {
        let Some(object) = configuration.as_object() else {
            tracing::debug!(language_id = %id, "language configuration is not an object");
            continue;
        };

        extend_array(&mut merged.auto_closing_pairs, object.get("autoClosingPairs"));
        extend_array(&mut merged.brackets, object.get("brackets"));
        extend_array(&mut merged.on_enter_rules, object.get("onEnterRules"));

        merge_map(id, "comments", &mut merged.comments, object.get("comments"));
        merge_map(
            id,
            "indentationRules",
            &mut merged.indentation_rules,
            object.get("indentationRules"),
        );
        merge_map(
            id,
            "folding.markers",
            &mut merged.folding_markers,
            object.get("folding").and_then(|f| f.get("markers")),
        );

        if let Some(word_pattern) = object.get("wordPattern").filter(|v| !v.is_null()) {
            if let Some(previous) = &merged.word_pattern {
                warn_overwrite(id, "wordPattern", previous, word_pattern);
            }
            merged.word_pattern = Some(word_pattern.clone());
        }
    }

    merged
}

fn extend_array(target: &mut Vec<Value>, source: Option<&Value>) {
    if let Some(Value::Array(items)) = source {
        target.extend(items.iter().cloned());
    }
}

fn merge_map(id: &str, field: &str, target: &mut Map<String, Value>, source: Option<&Value>) {
    let Some(Value::Object(source)) = source else {
        return;
    };
    for (key, value) in source {
        if value.is_null() {
            continue;
        }
        if let Some(previous) = target.get(key) {
            warn_overwrite(id, &format!("{field}.{key}"), previous, value);
        }
        target.insert(key.clone(), value.clone());
    }
}

fn warn_overwrite(id: &str, field: &str, previous: &Value, next: &Value) {
    if previous != next {
        tracing::warn!(
            language_id = %id,
            field,
            previous = %previous,
            next = %next,
            "conflicting value overwritten"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn configurations_concatenate_lists_and_merge_maps() {
        let a = json!({
            "brackets": [["{", "}"]],
            "comments": { "lineComment": "//" },
            "folding": { "markers": { "start": "^\\s*#region" } }
        });
        let b = json!({
            "brackets": [["[", "]"]],
            "comments": { "lineComment": "#", "blockComment": ["/*", "*/"] },
            "folding": { "markers": { "end": "^\\s*#endregion" } },
            "wordPattern": "\\w+"
        });
        let merged = merge_language_configurations("demo", [&a, &b]);
        assert_eq!(merged.brackets.len(), 2);
        assert_eq!(merged.comments["lineComment"], "#");
        assert_eq!(merged.comments["blockComment"], json!(["/*", "*/"]));
        assert_eq!(merged.folding_start_marker().as_deref(), Some("^\\s*#region"));
        assert_eq!(merged.folding_stop_marker().as_deref(), Some("^\\s*#endregion"));
        assert_eq!(merged.word_pattern, Some(json!("\\w+")));
    }

    #[test]
    fn display_name_falls_back_to_id() {
        assert_eq!(MergedLanguage::bare("rust").display_name(), "rust");
    }
}
