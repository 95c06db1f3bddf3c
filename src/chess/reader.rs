use super::error::QueryError;
use super::parser;
use super::types::Game;

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zstd::stream::read::Decoder as ZstdDecoder;

pub type PgnInput = Box<dyn Read>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMode {
    Plain,
    Zstd,
}

impl CompressionMode {
    /// Chosen by file extension: `.zst` / `.zstd` are zstd frames.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) if ext.eq_ignore_ascii_case("zst") || ext.eq_ignore_ascii_case("zstd") => {
                Self::Zstd
            }
            _ => Self::Plain,
        }
    }
}

pub fn open_input_stream(path: &Path) -> io::Result<PgnInput> {
    let file = File::open(path)?;

    match CompressionMode::for_path(path) {
        CompressionMode::Plain => Ok(Box::new(file)),
        CompressionMode::Zstd => ZstdDecoder::new(file).map(|decoder| Box::new(decoder) as PgnInput),
    }
}

/// Whole corpus text, decompressed when needed. Invalid UTF-8 is replaced.
pub fn read_corpus_text(path: &Path) -> io::Result<String> {
    let mut input = open_input_stream(path)?;
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!("Corpus '{}' is not valid UTF-8; replacing invalid bytes", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Parse one corpus file. A missing or unreadable file reads as no games.
pub fn load_games(path: &Path) -> Vec<Game> {
    match read_corpus_text(path) {
        Ok(text) => {
            let games = parser::parse(&text);
            debug!("Parsed {} games from '{}'", games.len(), path.display());
            games
        }
        Err(e) => {
            warn!("Failed to read corpus '{}': {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Expand glob patterns. Existing files and paths without glob characters
/// pass through untouched, so `Carlsen [2024].pgn` stays a file name.
pub fn expand_paths<P: AsRef<Path>>(patterns: &[P]) -> Result<Vec<PathBuf>, QueryError> {
    let mut paths = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        let text = pattern.to_string_lossy();
        let has_wildcards = text.contains('*') || text.contains('?') || text.contains('[');
        if !has_wildcards || pattern.exists() {
            paths.push(pattern.to_path_buf());
            continue;
        }

        let entries = glob::glob(&text).map_err(|e| QueryError::Pattern {
            pattern: text.to_string(),
            message: e.to_string(),
        })?;
        let mut matched: Vec<PathBuf> = entries.filter_map(|entry| entry.ok()).collect();
        matched.sort();
        paths.extend(matched);
    }

    Ok(paths)
}

/// Games of every path, concatenated in the given order.
pub fn load_corpora<P: AsRef<Path>>(patterns: &[P]) -> Result<Vec<Game>, QueryError> {
    let mut games = Vec::new();
    for path in expand_paths(patterns)? {
        games.extend(load_games(&path));
    }
    Ok(games)
}
