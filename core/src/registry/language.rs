use std::collections::HashMap;

use crate::manifest::{GrammarContribution, LanguageContribution};

use super::Registered;

/// Language and grammar contributions indexed by language id, plus orphan
/// grammars (no language id) indexed by scope name.
///
/// Several extensions may contribute to the same id or scope, so every index
/// holds a list in registration order.
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    /// Language ids in first-registration order.
    language_ids: Vec<String>,
    /// Alias set per language id, never containing the id itself.
    aliases: HashMap<String, Vec<String>>,
    languages: HashMap<String, Vec<Registered<LanguageContribution>>>,
    grammars: HashMap<String, Vec<Registered<GrammarContribution>>>,
    orphan_scopes: HashMap<String, Vec<Registered<GrammarContribution>>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -- registration -------------------------------------------------------

    /// Register a language contribution. Contributions without an id are
    /// ignored and `false` is returned.
    pub fn register_language(&mut self, language: Registered<LanguageContribution>) -> bool {
        let Some(id) = language.contribution.id.clone() else {
            tracing::debug!(
                extension = %language.source_key,
                "language contribution without id"
            );
            return false;
        };

        let aliases = self.aliases.entry(id.clone()).or_default();
        for alias in language.contribution.aliases.iter().flatten() {
            if *alias != id && !aliases.contains(alias) {
                aliases.push(alias.clone());
            }
        }

        if !self.languages.contains_key(&id) {
            self.language_ids.push(id.clone());
        }
        self.languages.entry(id).or_default().push(language);
        true
    }

    /// Register a grammar under its language id, or as an orphan scope when it
    /// has none.
    pub fn register_grammar(&mut self, grammar: Registered<GrammarContribution>) {
        match grammar.contribution.language.clone() {
            Some(language_id) => {
                self.grammars.entry(language_id).or_default().push(grammar);
            }
            None => {
                tracing::debug!(
                    extension = %grammar.source_key,
                    scope_name = %grammar.contribution.scope_name,
                    "grammar has no language, registering as orphan scope"
                );
                self.register_orphan_scope(grammar);
            }
        }
    }

    fn register_orphan_scope(&mut self, grammar: Registered<GrammarContribution>) {
        let scope_name = grammar.contribution.scope_name.clone();
        let scopes = self.orphan_scopes.entry(scope_name.clone()).or_default();
        scopes.push(grammar);
        if scopes.len() > 1 {
            tracing::debug!(
                scope_name = %scope_name,
                count = scopes.len(),
                "orphan scope has multiple grammars"
            );
        }
    }

    // -- queries ------------------------------------------------------------

    /// Map an id or alias to its language id. Known ids win, then alias
    /// membership; anything else passes through unchanged.
    pub fn resolve_alias(&self, input: &str) -> String {
        if self.aliases.contains_key(input) {
            return input.to_string();
        }
        self.language_ids
            .iter()
            .find(|id| {
                self.aliases
                    .get(id.as_str())
                    .is_some_and(|aliases| aliases.iter().any(|a| a == input))
            })
            .cloned()
            .unwrap_or_else(|| input.to_string())
    }

    pub fn language_contributions(&self, id: &str) -> &[Registered<LanguageContribution>] {
        self.languages.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn grammar_contributions(&self, id: &str) -> &[Registered<GrammarContribution>] {
        self.grammars.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn scope_contributions(&self, scope_name: &str) -> &[Registered<GrammarContribution>] {
        self.orphan_scopes
            .get(scope_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every id with at least one language contribution.
    pub fn language_ids(&self) -> &[String] {
        &self.language_ids
    }

    pub fn aliases(&self, id: &str) -> &[String] {
        self.aliases.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn orphan_scope_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.orphan_scopes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
