use std::collections::BTreeSet;

use serde_json::Value;

use crate::types::LanguageRegistration;

/// Rule keys that hold nested rules.
const NESTED_RULE_KEYS: &[&str] = &[
    "patterns",
    "repository",
    "captures",
    "beginCaptures",
    "endCaptures",
    "whileCaptures",
];

/// Scope names referenced by cross-grammar `include` directives anywhere in
/// the registration's patterns, repository or injections.
pub fn scope_references(registration: &LanguageRegistration) -> BTreeSet<String> {
    let mut stack: Vec<&Value> = registration.patterns.iter().collect();
    stack.extend(registration.repository.values());
    if let Some(injections) = &registration.injections {
        stack.extend(injections.values());
    }
    scan(stack)
}

fn scan(mut stack: Vec<&Value>) -> BTreeSet<String> {
    let mut scopes = BTreeSet::new();

    while let Some(node) = stack.pop() {
        match node {
            Value::Array(items) => stack.extend(items.iter()),
            Value::Object(rule) => {
                if let Some(scope) = rule.get("include").and_then(Value::as_str).and_then(external_scope) {
                    scopes.insert(scope.to_string());
                }
                for key in NESTED_RULE_KEYS {
                    match rule.get(*key) {
                        Some(Value::Array(items)) => stack.extend(items.iter()),
                        Some(Value::Object(entries)) => stack.extend(entries.values()),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    scopes
}

/// `source.js#expression` -> `source.js`. Local references (`#rule`) and
/// `$self` / `$base` yield `None`.
pub fn external_scope(include: &str) -> Option<&str> {
    if include.starts_with('#') || include.starts_with('$') {
        return None;
    }
    let scope = include.split('#').next()?;
    (!scope.is_empty()).then_some(scope)
}
