//! Catalog of named corpora backed by PGN files in a managed directory.
//!
//! Layout under the store root:
//!
//! ```text
//! catalog.json   ordered list of entries, rewritten after every mutation
//! corpora/       managed PGN files
//! staging/       scratch files for create/merge before import
//! trash/         deleted corpora, prefixed with a UTC timestamp
//! ```
//!
//! Nothing here locks: callers serialize mutations of the same corpus, and
//! must invalidate any query cache entry for a path they mutate.

use super::config::StoreConfig;
use super::error::{CorpusError, CorpusResult};
use super::parser;
use super::reader;
use super::types::Game;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const CATALOG_FILE: &str = "catalog.json";
const CORPORA_DIR: &str = "corpora";
const STAGING_DIR: &str = "staging";
const TRASH_DIR: &str = "trash";
const GAME_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusEntry {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    /// Cached; may run ahead of the file after `append_game` until reconciled.
    pub game_count: usize,
    pub last_modified: DateTime<Utc>,
}

pub struct CorpusStore {
    catalog_path: PathBuf,
    corpora_dir: PathBuf,
    staging_dir: PathBuf,
    trash_dir: PathBuf,
    entries: Vec<CorpusEntry>,
}

impl CorpusStore {
    /// Open (or initialize) the store at `config.root`.
    pub fn open(config: &StoreConfig) -> CorpusResult<Self> {
        let root = &config.root;
        let store = Self {
            catalog_path: root.join(CATALOG_FILE),
            corpora_dir: root.join(CORPORA_DIR),
            staging_dir: root.join(STAGING_DIR),
            trash_dir: root.join(TRASH_DIR),
            entries: Vec::new(),
        };

        for dir in [&store.corpora_dir, &store.staging_dir, &store.trash_dir] {
            fs::create_dir_all(dir).map_err(|e| CorpusError::io("store", dir, e))?;
        }

        let entries = store.read_catalog()?;
        debug!("Opened corpus store at '{}' with {} entries", root.display(), entries.len());
        Ok(Self { entries, ..store })
    }

    fn read_catalog(&self) -> CorpusResult<Vec<CorpusEntry>> {
        let text = match fs::read_to_string(&self.catalog_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CorpusError::io("catalog", &self.catalog_path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| CorpusError::Catalog {
            path: self.catalog_path.clone(),
            message: e.to_string(),
        })
    }

    /// Rewrite the whole catalog through a temp file.
    fn save(&self) -> CorpusResult<()> {
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| CorpusError::Catalog {
            path: self.catalog_path.clone(),
            message: e.to_string(),
        })?;
        let tmp = self.catalog_path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| CorpusError::io("catalog", &tmp, e))?;
        fs::rename(&tmp, &self.catalog_path)
            .map_err(|e| CorpusError::io("catalog", &self.catalog_path, e))
    }

    pub fn list(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> CorpusResult<&CorpusEntry> {
        self.position(id).map(|idx| &self.entries[idx])
    }

    fn position(&self, id: &str) -> CorpusResult<usize> {
        self.entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| CorpusError::NotFound { id: id.to_string() })
    }

    /// Import a PGN file (plain or `.zst`) into the managed directory.
    ///
    /// If the destination file is already catalogued, that entry is returned
    /// and nothing is copied.
    pub fn add_from_file(&mut self, source: &Path, name: Option<&str>) -> CorpusResult<CorpusEntry> {
        let file_name = managed_file_name(source);
        let dest = self.corpora_dir.join(&file_name);

        if let Some(existing) = self.entries.iter().find(|entry| entry.path == dest) {
            debug!("'{}' is already catalogued as '{}'", dest.display(), existing.name);
            return Ok(existing.clone());
        }

        let name = name.map(str::to_string).unwrap_or_else(|| {
            Path::new(&file_name)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.clone())
        });

        if is_same_file(source, &dest) {
            debug!("'{}' is already in the managed directory; cataloguing in place", dest.display());
        } else {
            let mut input = reader::open_input_stream(source).map_err(|e| CorpusError::io(&name, source, e))?;
            let mut output = File::create(&dest).map_err(|e| CorpusError::io(&name, &dest, e))?;
            io::copy(&mut input, &mut output).map_err(|e| CorpusError::io(&name, &dest, e))?;
        }

        let game_count = count_games(&name, &dest)?;
        let entry = CorpusEntry {
            id: Uuid::new_v4().to_string(),
            name,
            path: dest,
            game_count,
            last_modified: Utc::now(),
        };
        info!("Imported corpus '{}' ({} games)", entry.name, entry.game_count);

        self.entries.push(entry.clone());
        self.save()?;
        Ok(entry)
    }

    pub fn create_empty(&mut self, name: &str) -> CorpusResult<CorpusEntry> {
        let staged = self.staging_dir.join(format!("{}.pgn", file_stem_for(name)));
        fs::write(&staged, "").map_err(|e| CorpusError::io(name, &staged, e))?;

        let entry = self.add_from_file(&staged, Some(name));
        remove_staged(&staged);
        entry
    }

    pub fn rename(&mut self, id: &str, name: &str) -> CorpusResult<CorpusEntry> {
        let idx = self.position(id)?;
        self.entries[idx].name = name.to_string();
        self.save()?;
        Ok(self.entries[idx].clone())
    }

    /// Move the file to the trash and drop the entry. A file that is already
    /// gone is not an error.
    pub fn delete(&mut self, id: &str) -> CorpusResult<CorpusEntry> {
        let idx = self.position(id)?;
        let entry = &self.entries[idx];

        let file_name = entry
            .path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.pgn", entry.id));
        let trash_path = self
            .trash_dir
            .join(format!("{}_{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"), file_name));

        match move_file(&entry.path, &trash_path) {
            Ok(()) => debug!("Moved '{}' to '{}'", entry.path.display(), trash_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Corpus file '{}' was already missing", entry.path.display());
            }
            Err(e) => return Err(CorpusError::io(&entry.name, &entry.path, e)),
        }

        let removed = self.entries.remove(idx);
        self.save()?;
        Ok(removed)
    }

    /// Concatenate the sources into a new corpus named `name`.
    pub fn merge<S: AsRef<str>>(&mut self, source_ids: &[S], name: &str) -> CorpusResult<CorpusEntry> {
        let mut parts = Vec::with_capacity(source_ids.len());
        for id in source_ids {
            let entry = self.get(id.as_ref())?;
            let text = reader::read_corpus_text(&entry.path)
                .map_err(|e| CorpusError::io(&entry.name, &entry.path, e))?;
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
        let mut merged = parts.join(GAME_SEPARATOR);
        if !merged.is_empty() {
            merged.push('\n');
        }

        let staged = self.staging_dir.join(self.unused_file_name(name));
        fs::write(&staged, &merged).map_err(|e| CorpusError::io(name, &staged, e))?;
        let entry = self.add_from_file(&staged, Some(name));
        remove_staged(&staged);
        let entry = entry?;

        // Full reparse of what was written is the authoritative count.
        let idx = self.position(&entry.id)?;
        self.entries[idx].game_count = parser::parse(&merged).len();
        self.save()?;
        Ok(self.entries[idx].clone())
    }

    /// Drop games by 0-based index and rewrite the file from the remaining
    /// games' raw text. Duplicate or out-of-range indices have no effect.
    pub fn remove_games(&mut self, id: &str, indices: &[usize]) -> CorpusResult<CorpusEntry> {
        let idx = self.position(id)?;
        let entry = &self.entries[idx];
        let text = reader::read_corpus_text(&entry.path)
            .map_err(|e| CorpusError::io(&entry.name, &entry.path, e))?;

        let drop: HashSet<usize> = indices.iter().copied().collect();
        let kept: Vec<String> = parser::parse(&text)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !drop.contains(i))
            .map(|(_, game)| game.raw)
            .collect();

        let mut rewritten = kept.join(GAME_SEPARATOR);
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        fs::write(&entry.path, rewritten).map_err(|e| CorpusError::io(&entry.name, &entry.path, e))?;

        let entry = &mut self.entries[idx];
        entry.game_count = kept.len();
        entry.last_modified = Utc::now();
        self.save()?;
        Ok(self.entries[idx].clone())
    }

    /// Append one game's text. The count is bumped by one without reparsing;
    /// [`CorpusStore::reconcile`] brings it back in line with the file.
    pub fn append_game(&mut self, id: &str, pgn: &str) -> CorpusResult<CorpusEntry> {
        let idx = self.position(id)?;
        let entry = &self.entries[idx];

        let padding = separator_padding(&entry.path).map_err(|e| CorpusError::io(&entry.name, &entry.path, e))?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&entry.path)
            .map_err(|e| CorpusError::io(&entry.name, &entry.path, e))?;
        writeln!(file, "{}{}", padding, pgn.trim()).map_err(|e| CorpusError::io(&entry.name, &entry.path, e))?;

        let entry = &mut self.entries[idx];
        entry.game_count += 1;
        entry.last_modified = Utc::now();
        self.save()?;
        Ok(self.entries[idx].clone())
    }

    /// Every game of the corpus, freshly parsed. An unreadable file reads as
    /// no games; only an unknown id is an error.
    pub fn load_games(&self, id: &str) -> CorpusResult<Vec<Game>> {
        let entry = self.get(id)?;
        match reader::read_corpus_text(&entry.path) {
            Ok(text) => Ok(parser::parse(&text)),
            Err(e) => {
                warn!("Failed to read corpus '{}' ({}): {}", entry.name, entry.path.display(), e);
                Ok(Vec::new())
            }
        }
    }

    /// Reparse the file and persist the true game count. Fails if the file
    /// can't be read, leaving the catalog untouched.
    pub fn reconcile(&mut self, id: &str) -> CorpusResult<CorpusEntry> {
        let idx = self.position(id)?;
        let count = count_games(&self.entries[idx].name, &self.entries[idx].path)?;
        if self.entries[idx].game_count != count {
            debug!(
                "Reconciled '{}': {} -> {} games",
                self.entries[idx].name, self.entries[idx].game_count, count
            );
            self.entries[idx].game_count = count;
            self.save()?;
        }
        Ok(self.entries[idx].clone())
    }

    /// `<stem>.pgn`, suffixed `-2`, `-3`, ... until no catalogued corpus uses it.
    fn unused_file_name(&self, name: &str) -> String {
        let stem = file_stem_for(name);
        let taken = |candidate: &str| {
            self.entries
                .iter()
                .any(|entry| entry.path == self.corpora_dir.join(candidate))
        };

        let mut candidate = format!("{stem}.pgn");
        let mut n = 2;
        while taken(&candidate) {
            candidate = format!("{stem}-{n}.pgn");
            n += 1;
        }
        candidate
    }
}

/// Destination name inside `corpora/`; compressed sources lose their `.zst`.
fn managed_file_name(source: &Path) -> String {
    let file_name = source
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "corpus.pgn".to_string());

    match reader::CompressionMode::for_path(source) {
        reader::CompressionMode::Plain => file_name,
        reader::CompressionMode::Zstd => source
            .file_stem()
            .and_then(OsStr::to_str)
            .map(|stem| {
                if Path::new(stem).extension().is_some() {
                    stem.to_string()
                } else {
                    format!("{stem}.pgn")
                }
            })
            .unwrap_or(file_name),
    }
}

fn file_stem_for(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "corpus".to_string()
    } else {
        stem.to_string()
    }
}

fn count_games(name: &str, path: &Path) -> CorpusResult<usize> {
    let text = reader::read_corpus_text(path).map_err(|e| CorpusError::io(name, path, e))?;
    Ok(parser::parse(&text).len())
}

/// Both paths resolve to one existing file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn remove_staged(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Failed to remove staged file '{}': {}", path.display(), e);
    }
}

/// Rename, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

/// What to write before appended text so games stay blank-line separated.
fn separator_padding(path: &Path) -> io::Result<&'static str> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok("");
    }

    let tail_len = len.min(2);
    file.seek(SeekFrom::Start(len - tail_len))?;
    let mut tail = Vec::with_capacity(2);
    file.read_to_end(&mut tail)?;

    Ok(match tail.as_slice() {
        [.., b'\n', b'\n'] => "",
        [.., b'\n'] => "\n",
        _ => GAME_SEPARATOR,
    })
}
