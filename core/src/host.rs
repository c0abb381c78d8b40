use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::Result;
use crate::manifest::Manifest;

/// Name of the manifest file inside every extension directory.
pub const MANIFEST_FILENAME: &str = "package.json";

// ---------------------------------------------------------------------------
// Extension sources
// ---------------------------------------------------------------------------

/// One installed extension: a stable key, the directory its relative paths
/// resolve against, and its validated manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionSource {
    pub key: String,
    pub base: PathBuf,
    pub manifest: Manifest,
}

impl ExtensionSource {
    pub fn new(key: impl Into<String>, base: impl Into<PathBuf>, manifest: Manifest) -> Self {
        Self {
            key: key.into(),
            base: base.into(),
            manifest,
        }
    }
}

// ---------------------------------------------------------------------------
// Host trait
// ---------------------------------------------------------------------------

/// The environment that knows which extensions are installed and which
/// color theme is active.
pub trait ExtensionHost: Send + Sync {
    fn extensions(&self) -> Result<Vec<ExtensionSource>>;
    fn color_theme(&self) -> Option<String>;
}

/// Host backed by extension directories on disk.
pub struct FsExtensionHost {
    roots: Vec<PathBuf>,
    color_theme: Option<String>,
}

impl FsExtensionHost {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            color_theme: None,
        }
    }

    pub fn with_color_theme(mut self, theme: Option<String>) -> Self {
        self.color_theme = theme;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl ExtensionHost for FsExtensionHost {
    fn extensions(&self) -> Result<Vec<ExtensionSource>> {
        Ok(discover_extensions(&self.roots))
    }

    fn color_theme(&self) -> Option<String> {
        self.color_theme.clone()
    }
}

/// Host over a fixed list of sources, for embedding and tests.
pub struct StaticExtensionHost {
    sources: Vec<ExtensionSource>,
    color_theme: Option<String>,
}

impl StaticExtensionHost {
    pub fn new(sources: Vec<ExtensionSource>, color_theme: Option<String>) -> Self {
        Self {
            sources,
            color_theme,
        }
    }
}

impl ExtensionHost for StaticExtensionHost {
    fn extensions(&self) -> Result<Vec<ExtensionSource>> {
        Ok(self.sources.clone())
    }

    fn color_theme(&self) -> Option<String> {
        self.color_theme.clone()
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Scan each root for `<root>/<extension>/package.json`.
///
/// Missing roots and unreadable or malformed manifests are skipped with a
/// warning. The result is sorted by key so registration order is stable.
pub fn discover_extensions(roots: &[PathBuf]) -> Vec<ExtensionSource> {
    let mut sources = Vec::new();

    for root in roots {
        if !root.is_dir() {
            tracing::debug!(root = %root.display(), "extension root does not exist");
            continue;
        }

        for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(root = %root.display(), error = %err, "walk error");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let manifest_path = entry.path().join(MANIFEST_FILENAME);
            if !manifest_path.is_file() {
                continue;
            }

            match read_manifest(&manifest_path) {
                Ok(manifest) => {
                    let key = entry.file_name().to_string_lossy().to_string();
                    sources.push(ExtensionSource::new(key, entry.path(), manifest));
                }
                Err(err) => {
                    tracing::warn!(path = %manifest_path.display(), error = %err, "skipping extension");
                }
            }
        }
    }

    sources.sort_by(|a, b| a.key.cmp(&b.key));
    sources
}

fn read_manifest(path: &Path) -> Result<Manifest> {
    let bytes = std::fs::read(path).map_err(|source| crate::error::BridgeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Manifest::from_slice(&bytes, path)
}

/// SHA-256 over every source's key, base and manifest. Two snapshots with the
/// same fingerprint were built from the same extension set.
pub fn fingerprint(sources: &[ExtensionSource]) -> String {
    let mut hasher = Sha256::new();
    for source in sources {
        hasher.update(source.key.as_bytes());
        hasher.update([0]);
        hasher.update(source.base.to_string_lossy().as_bytes());
        hasher.update([0]);
        if let Ok(bytes) = serde_json::to_vec(&source.manifest) {
            hasher.update(&bytes);
        }
        hasher.update([0xff]);
    }
    format!("{:x}", hasher.finalize())
}
