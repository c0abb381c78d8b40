use std::collections::HashMap;

use crate::manifest::ThemeContribution;

use super::Registered;

/// Theme contributions keyed by id (or label when no id is declared), with a
/// reverse label lookup. The first contribution for a key wins.
#[derive(Debug, Default)]
pub struct ThemeRegistry {
    theme_ids: Vec<String>,
    themes: HashMap<String, Registered<ThemeContribution>>,
    labels: HashMap<String, Vec<String>>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the contribution has neither id nor label, or
    /// when its key is already taken.
    pub fn register_theme(&mut self, theme: Registered<ThemeContribution>) -> bool {
        let Some(id) = theme.contribution.key().map(str::to_string) else {
            tracing::debug!(
                extension = %theme.source_key,
                path = %theme.contribution.path,
                "theme contribution without id or label"
            );
            return false;
        };

        if self.themes.contains_key(&id) {
            tracing::debug!(
                extension = %theme.source_key,
                theme_id = %id,
                "duplicate theme contribution"
            );
            return false;
        }

        let labels = self.labels.entry(id.clone()).or_default();
        if let Some(label) = &theme.contribution.label {
            if *label != id && !labels.contains(label) {
                labels.push(label.clone());
            }
        }

        self.theme_ids.push(id.clone());
        self.themes.insert(id, theme);
        true
    }

    /// Exact id match first, then label membership, else the input itself.
    pub fn resolve_label_to_id(&self, name_or_label: &str) -> String {
        if self.labels.contains_key(name_or_label) {
            return name_or_label.to_string();
        }
        self.theme_ids
            .iter()
            .find(|id| {
                self.labels
                    .get(id.as_str())
                    .is_some_and(|labels| labels.iter().any(|l| l == name_or_label))
            })
            .cloned()
            .unwrap_or_else(|| name_or_label.to_string())
    }

    pub fn get(&self, id: &str) -> Option<&Registered<ThemeContribution>> {
        self.themes.get(id)
    }

    pub fn labels(&self, id: &str) -> &[String] {
        self.labels.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn theme_ids(&self) -> &[String] {
        &self.theme_ids
    }
}
