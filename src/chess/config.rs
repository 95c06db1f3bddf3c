use std::env;
use std::path::PathBuf;

use serde::Deserialize;

const CORPUS_DIR_ENV: &str = "CHESS_CORPUS_DIR";
const DEFAULT_CORPUS_DIR: &str = "corpora";

/// Where the corpus store keeps its catalog and managed files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `CHESS_CORPUS_DIR`, falling back to `./corpora`.
    pub fn from_env() -> Self {
        let root = env::var_os(CORPUS_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CORPUS_DIR));
        Self { root }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CORPUS_DIR)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Games returned per search, in corpus order.
    pub max_games: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { max_games: 100 }
    }
}

/// Tunables of the scenario search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Frontier keeps `2 * beam_width` nodes per layer.
    pub beam_width: usize,
    pub opponent_min_frequency: f64,
    pub hero_min_frequency: f64,
    pub max_scenarios: usize,
}

impl PrepConfig {
    pub fn frontier_limit(&self) -> usize {
        self.beam_width * 2
    }
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            beam_width: 5,
            opponent_min_frequency: 0.05,
            hero_min_frequency: 0.01,
            max_scenarios: 50,
        }
    }
}
