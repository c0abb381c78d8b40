use std::path::Path;
use std::sync::Arc;

use crate::host::ExtensionSource;

use super::{ContributionId, LanguageRegistry, Registered, ThemeRegistry};

/// Scan every manifest once and populate both registries.
///
/// Only manifest data is touched here; grammar, theme and configuration
/// bodies are read lazily during resolution.
pub fn collect(sources: &[ExtensionSource]) -> (LanguageRegistry, ThemeRegistry) {
    let mut languages = LanguageRegistry::new();
    let mut themes = ThemeRegistry::new();
    let mut next_id = 0usize;
    let mut assign = || {
        let id = ContributionId(next_id);
        next_id += 1;
        id
    };

    for source in sources {
        let key: Arc<str> = Arc::from(source.key.as_str());
        let base: Arc<Path> = Arc::from(source.base.as_path());
        let contributes = &source.manifest.contributes;

        for language in &contributes.languages {
            languages.register_language(Registered {
                id: assign(),
                source_key: Arc::clone(&key),
                base: Arc::clone(&base),
                contribution: language.clone(),
            });
        }

        for grammar in &contributes.grammars {
            languages.register_grammar(Registered {
                id: assign(),
                source_key: Arc::clone(&key),
                base: Arc::clone(&base),
                contribution: grammar.clone(),
            });
        }

        for theme in &contributes.themes {
            themes.register_theme(Registered {
                id: assign(),
                source_key: Arc::clone(&key),
                base: Arc::clone(&base),
                contribution: theme.clone(),
            });
        }
    }

    (languages, themes)
}
