use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};
use crate::manifest::{ThemeContribution, UiTheme};
use crate::reader::{join_normalized, FileReader};
use crate::registry::{Registered, ThemeRegistry};
use crate::types::{ThemeRegistration, ThemeResolution, ThemeType};

// ---------------------------------------------------------------------------
// Raw theme files
// ---------------------------------------------------------------------------

/// One theme file, with `tokenColors` already expanded to a rule list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTheme {
    /// The file's own `type`. Only inherited along the include chain; the
    /// registration's light/dark kind comes from the contribution's `uiTheme`.
    pub theme_type: Option<String>,
    pub include: Option<String>,
    pub colors: Map<String, Value>,
    pub token_colors: Vec<Value>,
    pub semantic_highlighting: Option<bool>,
    pub semantic_token_colors: Map<String, Value>,
}

/// Merge an included theme under `base`: base wins on every key collision,
/// and base rules come after include rules.
pub fn merge_raw_theme(include: RawTheme, base: RawTheme) -> RawTheme {
    let mut colors = include.colors;
    colors.extend(base.colors);
    let mut semantic_token_colors = include.semantic_token_colors;
    semantic_token_colors.extend(base.semantic_token_colors);
    let mut token_colors = include.token_colors;
    token_colors.extend(base.token_colors);

    RawTheme {
        theme_type: base.theme_type.or(include.theme_type),
        include: include.include,
        colors,
        token_colors,
        semantic_highlighting: base.semantic_highlighting.or(include.semantic_highlighting),
        semantic_token_colors,
    }
}

/// `hc-black`/`vs-dark` are dark, `hc-light`/`vs` light; anything else is dark.
pub fn classify_ui_theme(ui_theme: UiTheme) -> ThemeType {
    match ui_theme {
        UiTheme::HcLight | UiTheme::Vs => ThemeType::Light,
        UiTheme::HcBlack | UiTheme::VsDark | UiTheme::Unknown => ThemeType::Dark,
    }
}

fn object_field(object: &Map<String, Value>, key: &str) -> Map<String, Value> {
    match object.get(key) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

// ---------------------------------------------------------------------------
// ThemeResolver
// ---------------------------------------------------------------------------

pub struct ThemeResolver<'a> {
    registry: &'a ThemeRegistry,
    reader: &'a dyn FileReader,
}

impl<'a> ThemeResolver<'a> {
    pub fn new(registry: &'a ThemeRegistry, reader: &'a dyn FileReader) -> Self {
        Self { registry, reader }
    }

    /// Resolve a theme id or label. Any failure degrades to
    /// [`ThemeResolution::NotFound`].
    pub async fn resolve(&self, name_or_id: Option<&str>) -> ThemeResolution {
        let Some(name) = name_or_id.filter(|n| !n.is_empty()) else {
            tracing::debug!("no theme name configured");
            return ThemeResolution::NotFound;
        };

        let id = self.registry.resolve_label_to_id(name);
        let Some(contribution) = self.registry.get(&id) else {
            tracing::debug!(theme = %name, theme_id = %id, "no theme contribution found");
            return ThemeResolution::NotFound;
        };

        match self.resolve_chain(&id, contribution).await {
            Ok(raw) => ThemeResolution::Found {
                theme: ThemeRegistration {
                    name: id.clone(),
                    display_name: contribution.contribution.label.clone(),
                    colors: raw.colors,
                    settings: raw.token_colors,
                    semantic_highlighting: raw.semantic_highlighting,
                    semantic_token_colors: raw.semantic_token_colors,
                    theme_type: classify_ui_theme(contribution.contribution.ui_theme),
                },
                id,
            },
            Err(e) => {
                tracing::warn!(theme_id = %id, error = %e, "failed to resolve theme");
                ThemeResolution::NotFound
            }
        }
    }

    /// Load the contribution's theme file and fold its `include` chain into
    /// it. Each include path is relative to the file that names it.
    ///
    /// An unreadable include ends the chain with what was merged so far. A
    /// path seen twice is an [`BridgeError::IncludeCycle`].
    pub async fn resolve_chain(
        &self,
        id: &str,
        contribution: &Registered<ThemeContribution>,
    ) -> Result<RawTheme> {
        let path = join_normalized(contribution.base(), &contribution.contribution.path);
        let mut visited: HashSet<PathBuf> = HashSet::from([path.clone()]);
        let mut directory = parent_dir(&path);

        let value = self.reader.read(&path, None).await?;
        let mut theme = self.load_raw_theme(id, &value, &directory).await;

        while let Some(include) = theme.include.take() {
            let include_path = join_normalized(&directory, &include);
            if !visited.insert(include_path.clone()) {
                return Err(BridgeError::IncludeCycle { path: include_path });
            }
            directory = parent_dir(&include_path);

            let included = match self.reader.read(&include_path, None).await {
                Ok(value) => self.load_raw_theme(id, &value, &directory).await,
                Err(e) => {
                    tracing::warn!(
                        theme_id = %id,
                        include = %include_path.display(),
                        error = %e,
                        "skipping unreadable theme include"
                    );
                    break;
                }
            };
            theme = merge_raw_theme(included, theme);
        }

        Ok(theme)
    }

    /// Decode one theme file. A string `tokenColors` names an external rule
    /// file whose `settings` are spliced in; failure there yields no rules.
    async fn load_raw_theme(&self, id: &str, value: &Value, directory: &Path) -> RawTheme {
        let empty = Map::new();
        let object = value.as_object().unwrap_or(&empty);

        let token_colors = match object.get("tokenColors") {
            Some(Value::Array(rules)) => rules.clone(),
            Some(Value::String(rule_file)) => {
                tracing::debug!(theme_id = %id, path = %rule_file, "tokenColors points to a rule file");
                self.load_rule_file(id, directory, rule_file).await
            }
            _ => Vec::new(),
        };

        RawTheme {
            theme_type: object.get("type").and_then(Value::as_str).map(str::to_string),
            include: object.get("include").and_then(Value::as_str).map(str::to_string),
            colors: object_field(object, "colors"),
            token_colors,
            semantic_highlighting: object.get("semanticHighlighting").and_then(Value::as_bool),
            semantic_token_colors: object_field(object, "semanticTokenColors"),
        }
    }

    async fn load_rule_file(&self, id: &str, directory: &Path, rule_file: &str) -> Vec<Value> {
        match self.reader.read(directory, Some(rule_file)).await {
            Ok(value) => match value.get("settings") {
                Some(Value::Array(rules)) => rules.clone(),
                _ => {
                    tracing::warn!(theme_id = %id, path = %rule_file, "rule file has no settings list");
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!(theme_id = %id, path = %rule_file, error = %e, "skipping unreadable rule file");
                Vec::new()
            }
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(colors: Value, rules: Vec<Value>) -> RawTheme {
        RawTheme {
            colors: colors.as_object().cloned().unwrap_or_default(),
            token_colors: rules,
            ..RawTheme::default()
        }
    }

    #[test]
    fn base_wins_and_rules_append() {
        let include = RawTheme {
            semantic_highlighting: Some(true),
            theme_type: Some("dark".into()),
            ..raw(json!({ "a": "1", "b": "1" }), vec![json!("inc")])
        };
        let base = raw(json!({ "a": "2" }), vec![json!("base")]);
        let merged = merge_raw_theme(include, base);
        assert_eq!(Value::Object(merged.colors), json!({ "a": "2", "b": "1" }));
        assert_eq!(merged.token_colors, vec![json!("inc"), json!("base")]);
        assert_eq!(merged.semantic_highlighting, Some(true));
        assert_eq!(merged.theme_type.as_deref(), Some("dark"));
    }

    #[test]
    fn explicit_false_semantic_highlighting_is_kept() {
        let include = RawTheme {
            semantic_highlighting: Some(true),
            ..RawTheme::default()
        };
        let base = RawTheme {
            semantic_highlighting: Some(false),
            ..RawTheme::default()
        };
        assert_eq!(merge_raw_theme(include, base).semantic_highlighting, Some(false));
    }

    #[test]
    fn ui_theme_classification() {
        assert_eq!(classify_ui_theme(UiTheme::HcBlack), ThemeType::Dark);
        assert_eq!(classify_ui_theme(UiTheme::VsDark), ThemeType::Dark);
        assert_eq!(classify_ui_theme(UiTheme::HcLight), ThemeType::Light);
        assert_eq!(classify_ui_theme(UiTheme::Vs), ThemeType::Light);
        assert_eq!(classify_ui_theme(UiTheme::Unknown), ThemeType::Dark);
    }
}
