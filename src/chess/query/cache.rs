use crate::chess::parser;
use crate::chess::reader;
use crate::chess::types::Game;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Parsed corpora keyed by path.
///
/// Filled on first use and emptied only through [`CorpusCache::invalidate`]
/// or [`CorpusCache::invalidate_all`]; file changes on disk go unnoticed.
#[derive(Debug, Default)]
pub struct CorpusCache {
    entries: HashMap<PathBuf, Arc<Vec<Game>>>,
}

impl CorpusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached games for `path`, parsing the file on a miss. An unreadable file
    /// yields no games and is not cached, so a later call retries.
    pub fn get_or_load(&mut self, path: &Path) -> Arc<Vec<Game>> {
        if let Some(games) = self.entries.get(path) {
            return Arc::clone(games);
        }

        match reader::read_corpus_text(path) {
            Ok(text) => {
                let games = Arc::new(parser::parse(&text));
                debug!("Cached {} games for '{}'", games.len(), path.display());
                self.entries.insert(path.to_path_buf(), Arc::clone(&games));
                games
            }
            Err(e) => {
                warn!("Failed to read corpus '{}': {}", path.display(), e);
                Arc::new(Vec::new())
            }
        }
    }

    /// Returns whether anything was cached for `path`.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
