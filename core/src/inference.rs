use std::collections::{BTreeSet, HashSet};

use crate::resolve::scope_references;
use crate::types::LanguageRegistration;

/// Scope names of grammars that ship with common highlighters, mapped to the
/// builtin language id that provides them.
const BUILTIN_SCOPES: &[(&str, &str)] = &[
    ("source.ts", "typescript"),
    ("source.tsx", "tsx"),
    ("source.js", "javascript"),
    ("source.jsx", "jsx"),
    ("source.json", "json"),
    ("text.html.basic", "html"),
    ("source.css", "css"),
    ("source.scss", "scss"),
    ("source.sass", "sass"),
    ("source.less", "less"),
    ("source.graphql", "graphql"),
    ("source.yaml", "yaml"),
    ("source.toml", "toml"),
    ("source.rust", "rust"),
    ("source.python", "python"),
    ("source.java", "java"),
    ("source.go", "go"),
    ("source.cpp", "cpp"),
    ("source.c", "c"),
    ("source.swift", "swift"),
    ("source.kotlin", "kotlin"),
    ("source.shell", "bash"),
    ("source.bash", "bash"),
    ("source.diff", "diff"),
    ("text.xml", "xml"),
    ("text.markdown", "markdown"),
];

pub fn builtin_language_for_scope(scope_name: &str) -> Option<&'static str> {
    BUILTIN_SCOPES
        .iter()
        .find(|(scope, _)| *scope == scope_name)
        .map(|(_, id)| *id)
}

/// Builtin language ids the given registrations depend on but do not provide
/// themselves: embedded languages plus the builtin owners of included
/// scopes. Lower-cased, deduplicated, sorted.
pub fn infer_builtin_language_ids(registrations: &[LanguageRegistration]) -> Vec<String> {
    let present: HashSet<String> = registrations
        .iter()
        .flat_map(|r| std::iter::once(&r.name).chain(r.aliases.iter()))
        .filter(|name| !name.is_empty())
        .map(|name| name.to_lowercase())
        .collect();

    let mut inferred: BTreeSet<String> = BTreeSet::new();
    for registration in registrations {
        inferred.extend(
            registration
                .embedded_langs
                .iter()
                .chain(registration.embedded_langs_lazy.iter())
                .map(|id| id.to_lowercase()),
        );
        for scope in scope_references(registration) {
            if let Some(id) = builtin_language_for_scope(&scope) {
                inferred.insert(id.to_string());
            }
        }
    }

    inferred.into_iter().filter(|id| !present.contains(id)).collect()
}
