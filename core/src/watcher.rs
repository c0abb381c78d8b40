use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::host::MANIFEST_FILENAME;

/// Watches extension roots for installs, removals and manifest edits.
///
/// Raw notify events are coalesced into debounced batches. Only paths that
/// can change the extension set are reported: manifests anywhere below a
/// root, and entries directly inside a root (extension directories coming
/// and going).
pub struct ExtensionWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Vec<PathBuf>>,
}

impl ExtensionWatcher {
    /// Roots that do not exist are skipped. `debounce_ms` is the window after
    /// the first event during which further events join the same batch.
    pub fn new(roots: &[PathBuf], debounce_ms: u64) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::channel::<Event>();
        let (batch_tx, batch_rx) = mpsc::channel::<Vec<PathBuf>>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = raw_tx.send(event);
                }
            },
            Config::default(),
        )
        .context("failed to create filesystem watcher")?;

        let mut watched = Vec::new();
        for root in roots {
            if !root.is_dir() {
                tracing::warn!(root = %root.display(), "not watching missing extension root");
                continue;
            }
            watcher
                .watch(root, RecursiveMode::Recursive)
                .with_context(|| format!("failed to watch {}", root.display()))?;
            // Backends may report canonical paths.
            watched.push(root.clone());
            if let Ok(canonical) = root.canonicalize() {
                if canonical != *root {
                    watched.push(canonical);
                }
            }
        }

        let debounce = Duration::from_millis(debounce_ms);

        std::thread::Builder::new()
            .name("extension-watcher-debounce".into())
            .spawn(move || loop {
                let first = match raw_rx.recv() {
                    Ok(ev) => ev,
                    Err(_) => return,
                };

                let mut paths = HashSet::new();
                collect_relevant_paths(&watched, &first, &mut paths);

                let deadline = Instant::now() + debounce;
                loop {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    match raw_rx.recv_timeout(remaining) {
                        Ok(ev) => collect_relevant_paths(&watched, &ev, &mut paths),
                        Err(mpsc::RecvTimeoutError::Timeout) => break,
                        Err(mpsc::RecvTimeoutError::Disconnected) => {
                            if !paths.is_empty() {
                                let _ = batch_tx.send(paths.into_iter().collect());
                            }
                            return;
                        }
                    }
                }

                if !paths.is_empty() && batch_tx.send(paths.into_iter().collect()).is_err() {
                    return;
                }
            })
            .context("failed to spawn debounce thread")?;

        Ok(Self {
            _watcher: watcher,
            rx: batch_rx,
        })
    }

    /// Block until a batch of relevant paths arrives, or return an empty vec
    /// after `timeout`.
    pub fn wait_for_changes(&self, timeout: Duration) -> Vec<PathBuf> {
        self.rx.recv_timeout(timeout).unwrap_or_default()
    }
}

/// Whether a change at `path` can alter the set of installed extensions.
pub fn is_relevant_change(roots: &[PathBuf], path: &Path) -> bool {
    if path.file_name().is_some_and(|name| name == MANIFEST_FILENAME) {
        return roots.iter().any(|root| path.starts_with(root));
    }
    path.parent()
        .is_some_and(|parent| roots.iter().any(|root| parent == root.as_path()))
}

fn collect_relevant_paths(roots: &[PathBuf], event: &Event, out: &mut HashSet<PathBuf>) {
    for path in &event.paths {
        if is_relevant_change(roots, path) {
            out.insert(path.clone());
        }
    }
}
