use std::sync::Arc;

use crate::error::Result;
use crate::host::ExtensionHost;
use crate::reader::{FileReader, FsFileReader};
use crate::registry::{RegistryCache, RegistrySnapshot};
use crate::resolve::{LanguageResolver, ThemeResolver};
use crate::types::{
    LanguageRegistration, LanguageResolution, ThemeResolution, PLAIN_TEXT_LANGUAGE_ID,
};

/// Entry point for downstream consumers: owns the host, the reader and the
/// registry cache, and runs resolutions against the current snapshot.
pub struct Bridge {
    host: Arc<dyn ExtensionHost>,
    reader: Arc<dyn FileReader>,
    cache: RegistryCache,
    plain_text_language: String,
}

impl Bridge {
    pub fn new(host: Arc<dyn ExtensionHost>) -> Self {
        Self::with_reader(host, Arc::new(FsFileReader::new()))
    }

    pub fn with_reader(host: Arc<dyn ExtensionHost>, reader: Arc<dyn FileReader>) -> Self {
        Self {
            host,
            reader,
            cache: RegistryCache::new(),
            plain_text_language: PLAIN_TEXT_LANGUAGE_ID.to_string(),
        }
    }

    pub fn with_plain_text_language(mut self, id: impl Into<String>) -> Self {
        self.plain_text_language = id.into();
        self
    }

    pub fn plain_text_language(&self) -> &str {
        &self.plain_text_language
    }

    // -----------------------------------------------------------------------
    // Registry lifecycle
    // -----------------------------------------------------------------------

    /// The current registry snapshot, collected from the host on first use.
    pub fn snapshot(&self) -> Result<Arc<RegistrySnapshot>> {
        self.cache.get_or_build(|| self.host.extensions())
    }

    /// Re-enumerate the host's extensions and rebuild if they changed.
    pub fn refresh(&self) -> Result<bool> {
        let sources = self.host.extensions()?;
        let rebuilt = self.cache.refresh(&sources);
        if rebuilt {
            tracing::info!(extensions = sources.len(), "extension set changed, registries rebuilt");
        }
        Ok(rebuilt)
    }

    /// Drop the snapshot; the next access rebuilds it.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolve `ids` (every known language when `None`). Only a failing host
    /// is an error; missing files and unknown ids degrade the result.
    pub async fn resolve_languages(&self, ids: Option<&[String]>) -> Result<LanguageResolution> {
        let snapshot = self.snapshot()?;
        let resolution = LanguageResolver::new(&snapshot.languages, self.reader.as_ref())
            .resolve(ids)
            .await;
        tracing::debug!(
            registrations = resolution.registrations.len(),
            unresolved = resolution.unresolved.len(),
            "resolved languages"
        );
        Ok(resolution)
    }

    /// Resolve `name_or_id`, or the host's active theme when `None`.
    pub async fn resolve_theme(&self, name_or_id: Option<&str>) -> Result<ThemeResolution> {
        let snapshot = self.snapshot()?;
        let configured = match name_or_id {
            Some(name) => Some(name.to_string()),
            None => self.host.color_theme(),
        };
        Ok(ThemeResolver::new(&snapshot.themes, self.reader.as_ref())
            .resolve(configured.as_deref())
            .await)
    }

    // -----------------------------------------------------------------------
    // Helpers over a resolved set
    // -----------------------------------------------------------------------

    pub fn lookup_language_registration<'r>(
        &self,
        resolution: &'r LanguageResolution,
        id: &str,
    ) -> Option<&'r LanguageRegistration> {
        resolution.lookup(id)
    }

    pub fn resolve_language_alias<'r>(&self, resolution: &'r LanguageResolution, id: &'r str) -> &'r str {
        resolution.resolve_alias(id)
    }

    /// Language id claiming `extension`, else the plain-text id.
    pub fn resolve_extension_to_language(&self, resolution: &LanguageResolution, extension: &str) -> String {
        resolution
            .resolve_extension_or(extension, &self.plain_text_language)
            .to_string()
    }
}
