use std::collections::{BTreeMap, HashSet, VecDeque};

use futures::future::join_all;
use serde_json::Value;

use crate::error::BridgeError;
use crate::manifest::{GrammarContribution, LanguageContribution};
use crate::reader::{join_normalized, FileReader};
use crate::registry::{LanguageRegistry, Registered};
use crate::types::{LanguageRegistration, LanguageResolution, RawGrammar};

use super::merge::{
    merge_language_configurations, merge_language_contributions, LanguageConfiguration,
    MergedLanguage,
};
use super::scopes::scope_references;

// ---------------------------------------------------------------------------
// LanguageResolver: worklist closure over embedded languages and scope includes
// ---------------------------------------------------------------------------

/// Builds [`LanguageRegistration`]s from a registry snapshot.
///
/// Each call is independent and read-only. File reads for one id are issued
/// concurrently; a read that fails drops that fragment only.
pub struct LanguageResolver<'a> {
    registry: &'a LanguageRegistry,
    reader: &'a dyn FileReader,
}

impl<'a> LanguageResolver<'a> {
    pub fn new(registry: &'a LanguageRegistry, reader: &'a dyn FileReader) -> Self {
        Self { registry, reader }
    }

    /// Resolve `ids` (or every known language id when `None`) together with
    /// all transitively embedded languages and included orphan scopes.
    pub async fn resolve(&self, ids: Option<&[String]>) -> LanguageResolution {
        let requested: Vec<String> = match ids {
            Some(ids) => ids.to_vec(),
            None => self.registry.language_ids().to_vec(),
        };

        let mut queue: VecDeque<String> = VecDeque::new();
        let mut enqueued: HashSet<String> = HashSet::new();
        for id in &requested {
            let id = self.registry.resolve_alias(id);
            if enqueued.insert(id.clone()) {
                queue.push_back(id);
            }
        }

        let mut registrations = Vec::new();
        let mut unresolved = Vec::new();

        // Phase 1: languages, growing the queue with embedded ids
        while let Some(id) = queue.pop_front() {
            let languages = self.registry.language_contributions(&id);
            let grammars = self.registry.grammar_contributions(&id);

            if languages.is_empty() && grammars.is_empty() {
                tracing::debug!(language_id = %id, "no language or grammar contributions");
                unresolved.push(id);
                continue;
            }
            log_contribution_shape(&id, languages, grammars);

            registrations.extend(self.resolve_language(&id, languages, grammars).await);

            for grammar in grammars {
                let owner = grammar.contribution.language.as_deref();
                for target in embedded_languages(owner, grammar.contribution.embedded_languages.as_ref()) {
                    let target = self.registry.resolve_alias(&target);
                    if enqueued.insert(target.clone()) {
                        tracing::debug!(language_id = %id, embedded = %target, "queued embedded language");
                        queue.push_back(target);
                    }
                }
            }
        }

        // Phase 2: orphan scopes pulled in by cross-grammar includes. Newly
        // added registrations are scanned too, until nothing new turns up.
        let mut covered: HashSet<String> =
            registrations.iter().map(|r: &LanguageRegistration| r.scope_name.clone()).collect();
        let mut cursor = 0;
        while cursor < registrations.len() {
            let references = scope_references(&registrations[cursor]);
            cursor += 1;
            for scope_name in references {
                if !covered.insert(scope_name.clone()) {
                    continue;
                }
                let orphans = self.registry.scope_contributions(&scope_name);
                if orphans.is_empty() {
                    continue;
                }
                registrations.extend(self.resolve_orphan_scope(&scope_name, orphans).await);
            }
        }

        self.log_unresolved(&unresolved, &registrations);

        LanguageResolution {
            registrations,
            unresolved,
        }
    }

    async fn resolve_language(
        &self,
        id: &str,
        languages: &[Registered<LanguageContribution>],
        grammars: &[Registered<GrammarContribution>],
    ) -> Vec<LanguageRegistration> {
        let language = merge_language_contributions(id, languages.iter().map(|l| &l.contribution));

        let (configurations, raw_grammars) = futures::join!(
            self.load_configurations(id, languages),
            self.load_grammars(id, grammars),
        );

        if configurations.len() > 1 {
            tracing::debug!(
                language_id = %id,
                count = configurations.len(),
                "multiple language configuration files"
            );
        }
        let configuration = merge_language_configurations(id, configurations.iter());

        raw_grammars
            .into_iter()
            .map(|(grammar, raw)| build_registration(&language, &grammar.contribution, raw, &configuration))
            .collect()
    }

    /// Orphans have no language of their own: the scope name stands in as the
    /// id and the language/configuration context is empty.
    async fn resolve_orphan_scope(
        &self,
        scope_name: &str,
        orphans: &[Registered<GrammarContribution>],
    ) -> Vec<LanguageRegistration> {
        tracing::debug!(scope_name = %scope_name, count = orphans.len(), "registering orphan scope");
        let language = MergedLanguage::bare(scope_name);
        let configuration = LanguageConfiguration::default();
        self.load_grammars(scope_name, orphans)
            .await
            .into_iter()
            .map(|(grammar, raw)| build_registration(&language, &grammar.contribution, raw, &configuration))
            .collect()
    }

    async fn load_configurations(
        &self,
        id: &str,
        languages: &[Registered<LanguageContribution>],
    ) -> Vec<Value> {
        let reads = languages.iter().filter_map(|language| {
            let path = language.contribution.configuration.as_deref()?;
            Some(async move {
                match self.reader.read(language.base(), Some(path)).await {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(
                            language_id = %id,
                            extension = %language.source_key,
                            path,
                            error = %e,
                            "skipping unreadable language configuration"
                        );
                        None
                    }
                }
            })
        });
        join_all(reads).await.into_iter().flatten().collect()
    }

    async fn load_grammars<'g>(
        &self,
        id: &str,
        grammars: &'g [Registered<GrammarContribution>],
    ) -> Vec<(&'g Registered<GrammarContribution>, RawGrammar)> {
        let reads = grammars.iter().map(|grammar| async move {
            let path = grammar.contribution.path.as_str();
            let raw = self
                .reader
                .read(grammar.base(), Some(path))
                .await
                .and_then(|value| {
                    serde_json::from_value::<RawGrammar>(value).map_err(|e| {
                        BridgeError::Decode {
                            path: join_normalized(grammar.base(), path),
                            format: "grammar",
                            message: e.to_string(),
                        }
                    })
                });
            match raw {
                Ok(raw) => {
                    if let Some(file_scope) = raw.scope_name.as_deref() {
                        if file_scope != grammar.contribution.scope_name {
                            tracing::debug!(
                                language_id = %id,
                                contributed = %grammar.contribution.scope_name,
                                in_file = %file_scope,
                                "scope name mismatch between contribution and grammar file"
                            );
                        }
                    }
                    Some((grammar, raw))
                }
                Err(e) => {
                    tracing::warn!(
                        language_id = %id,
                        scope_name = %grammar.contribution.scope_name,
                        extension = %grammar.source_key,
                        error = %e,
                        "skipping unreadable grammar"
                    );
                    None
                }
            }
        });
        join_all(reads).await.into_iter().flatten().collect()
    }

    fn log_unresolved(&self, unresolved: &[String], registrations: &[LanguageRegistration]) {
        for id in unresolved {
            let resolved = self.registry.resolve_alias(id);
            let embedded_in: Vec<&str> = registrations
                .iter()
                .filter(|r| r.embedded_langs.contains(id) || r.embedded_langs_lazy.contains(id))
                .map(|r| r.name.as_str())
                .collect();
            tracing::debug!(
                language_id = %id,
                alias_of = (resolved != *id).then_some(resolved.as_str()),
                embedded_in = ?embedded_in,
                "language id without contributions"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn log_contribution_shape(
    id: &str,
    languages: &[Registered<LanguageContribution>],
    grammars: &[Registered<GrammarContribution>],
) {
    if languages.is_empty() {
        tracing::debug!(language_id = %id, grammars = grammars.len(), "grammars without language contribution");
    }
    if grammars.is_empty() {
        tracing::debug!(language_id = %id, languages = languages.len(), "language without grammar contribution");
    }
    if languages.len() > 1 {
        tracing::debug!(language_id = %id, count = languages.len(), "multiple language contributions");
    }
    if grammars.len() > 1 {
        tracing::debug!(language_id = %id, count = grammars.len(), "multiple grammar contributions");
    }
}

/// Distinct embedded language ids with the owning id removed.
pub fn embedded_languages(owner: Option<&str>, embedded: Option<&BTreeMap<String, String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for target in embedded.into_iter().flat_map(|m| m.values()) {
        if Some(target.as_str()) != owner && !out.contains(target) {
            out.push(target.clone());
        }
    }
    out
}

/// Combine merged language fields, grammar contribution fields, the grammar
/// file's pattern tree and the folding markers.
pub fn build_registration(
    language: &MergedLanguage,
    grammar: &GrammarContribution,
    raw: RawGrammar,
    configuration: &LanguageConfiguration,
) -> LanguageRegistration {
    LanguageRegistration {
        name: language.id.clone(),
        display_name: language.display_name().to_string(),
        aliases: language.aliases_without_self(),
        first_line_match: language.first_line.clone(),
        scope_name: grammar.scope_name.clone(),
        patterns: raw.patterns,
        repository: raw.repository,
        injections: raw.injections,
        injection_selector: raw.injection_selector,
        file_types: raw.file_types,
        embedded_langs: Vec::new(),
        embedded_langs_lazy: embedded_languages(
            grammar.language.as_deref(),
            grammar.embedded_languages.as_ref(),
        ),
        inject_to: grammar.inject_to.clone(),
        balanced_bracket_selectors: grammar.balanced_bracket_scopes.clone(),
        unbalanced_bracket_selectors: grammar.unbalanced_bracket_scopes.clone(),
        folding_start_marker: configuration.folding_start_marker(),
        folding_stop_marker: configuration.folding_stop_marker(),
        extensions: language.extensions.clone(),
        filenames: language.filenames.clone(),
        filename_patterns: language.filename_patterns.clone(),
        mimetypes: language.mimetypes.clone(),
    }
}
