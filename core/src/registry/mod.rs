//! Indexed storage of language, grammar and theme contributions.
//!
//! Registries are built in one pass from a snapshot of the installed
//! extensions and are read-only afterwards. When the extension set changes
//! the whole snapshot is rebuilt.

mod collector;
mod language;
mod theme;

use std::path::Path;
use std::sync::{Arc, Mutex};

pub use collector::collect;
pub use language::LanguageRegistry;
pub use theme::ThemeRegistry;

use crate::host::{fingerprint, ExtensionSource};

// ---------------------------------------------------------------------------
// Registered contributions
// ---------------------------------------------------------------------------

/// Synthetic identity assigned to every contribution at ingestion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContributionId(pub usize);

/// A contribution together with the location its relative paths resolve
/// against.
#[derive(Debug, Clone)]
pub struct Registered<T> {
    pub id: ContributionId,
    pub source_key: Arc<str>,
    pub base: Arc<Path>,
    pub contribution: T,
}

impl<T> Registered<T> {
    pub fn base(&self) -> &Path {
        &self.base
    }
}

// ---------------------------------------------------------------------------
// Snapshot + cache
// ---------------------------------------------------------------------------

/// Both registries built from one extension set.
#[derive(Debug)]
pub struct RegistrySnapshot {
    pub languages: LanguageRegistry,
    pub themes: ThemeRegistry,
    pub fingerprint: String,
}

impl RegistrySnapshot {
    pub fn build(sources: &[ExtensionSource]) -> Self {
        let (languages, themes) = collect(sources);
        Self {
            languages,
            themes,
            fingerprint: fingerprint(sources),
        }
    }
}

/// Single-slot cache: the snapshot is kept until invalidated, then rebuilt in
/// full on the next access. Callers hold their own `Arc`, so an in-flight
/// resolution keeps using the snapshot it started with.
#[derive(Debug, Default)]
pub struct RegistryCache {
    slot: Mutex<Option<Arc<RegistrySnapshot>>>,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached snapshot, building it from `load` when empty.
    pub fn get_or_build<E>(
        &self,
        load: impl FnOnce() -> Result<Vec<ExtensionSource>, E>,
    ) -> Result<Arc<RegistrySnapshot>, E> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(snapshot) = slot.as_ref() {
            return Ok(Arc::clone(snapshot));
        }
        let sources = load()?;
        let snapshot = Arc::new(RegistrySnapshot::build(&sources));
        tracing::debug!(
            extensions = sources.len(),
            languages = snapshot.languages.language_ids().len(),
            themes = snapshot.themes.theme_ids().len(),
            "built registry snapshot"
        );
        *slot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Replace the snapshot if `sources` differ from the cached set.
    /// Returns `true` when a rebuild happened.
    pub fn refresh(&self, sources: &[ExtensionSource]) -> bool {
        let next = fingerprint(sources);
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|s| s.fingerprint == next) {
            return false;
        }
        *slot = Some(Arc::new(RegistrySnapshot::build(sources)));
        true
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn is_built(&self) -> bool {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}
