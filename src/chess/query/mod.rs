mod cache;
mod worker;

pub use cache::CorpusCache;
pub use worker::{Command, QueryWorker};

use super::config::QueryConfig;
use super::error::QueryError;
use super::filter::{self, FilterPredicate};
use super::moves::{self, NextMove};
use super::reader;
use super::types::{Game, MoveStat};

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub request_id: RequestId,
    /// Files or glob patterns; games are unioned in this order.
    pub corpus_paths: Vec<PathBuf>,
    #[serde(default)]
    pub move_prefix: Vec<String>,
    #[serde(default)]
    pub filter: Option<FilterPredicate>,
}

/// A returned game with enough location info to edit it in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub corpus_path: PathBuf,
    pub index: usize,
    pub game: Game,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// First `max_games` matches in corpus order.
    pub games: Vec<SearchHit>,
    pub next_moves: Vec<NextMove>,
    pub total_games: usize,
    pub white_win_percent: f64,
    pub draw_percent: f64,
    pub black_win_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum QueryResponse {
    Done {
        request_id: RequestId,
        #[serde(flatten)]
        result: SearchResult,
    },
    Failed {
        request_id: RequestId,
        error: String,
    },
}

impl QueryResponse {
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Done { request_id, .. } | Self::Failed { request_id, .. } => *request_id,
        }
    }
}

struct Located<'a> {
    path: &'a Path,
    index: usize,
    game: &'a Game,
}

/// Runs searches against cached corpora. Owns its cache; see [`QueryWorker`]
/// for the threaded front end.
#[derive(Debug, Default)]
pub struct QueryExecutor {
    cache: CorpusCache,
    config: QueryConfig,
}

impl QueryExecutor {
    pub fn new(config: QueryConfig) -> Self {
        Self {
            cache: CorpusCache::new(),
            config,
        }
    }

    pub fn cache(&self) -> &CorpusCache {
        &self.cache
    }

    pub fn invalidate(&mut self, path: &Path) {
        if self.cache.invalidate(path) {
            debug!("Invalidated cached corpus '{}'", path.display());
        }
    }

    pub fn invalidate_all(&mut self) {
        self.cache.invalidate_all();
    }

    /// Union corpora, apply the header filter, match the prefix, then the
    /// board-replay filter. Aggregates always describe the final candidate set.
    pub fn search(&mut self, request: &SearchRequest) -> Result<SearchResult, QueryError> {
        let paths = reader::expand_paths(&request.corpus_paths)?;
        let corpora: Vec<(PathBuf, Arc<Vec<Game>>)> = paths
            .into_iter()
            .map(|path| {
                let games = self.cache.get_or_load(&path);
                (path, games)
            })
            .collect();

        let prefix = &request.move_prefix;
        let basic = request.filter.as_ref();
        let mut candidates: Vec<Located<'_>> = corpora
            .iter()
            .flat_map(|(path, games)| {
                games.iter().enumerate().map(move |(index, game)| Located {
                    path: path.as_path(),
                    index,
                    game,
                })
            })
            .filter(|hit| basic.is_none_or(|f| filter::matches_basic(hit.game, f)))
            .filter(|hit| moves::is_prefix_of(prefix, &hit.game.moves))
            .collect();

        if let Some(predicate) = request.filter.as_ref().filter(|f| f.has_deep_criteria()) {
            let before = candidates.len();
            candidates.retain(|hit| filter::matches_deep(hit.game, predicate));
            debug!("Deep filter kept {} of {} candidates", candidates.len(), before);
        }

        let next_moves = moves::next_move_stats(candidates.iter().map(|hit| hit.game), prefix.len());

        let mut outcomes = MoveStat::default();
        for hit in &candidates {
            outcomes.record(hit.game.outcome());
        }
        let total = candidates.len();
        let percent = |count: u32| {
            if total == 0 {
                0.0
            } else {
                f64::from(count) * 100.0 / total as f64
            }
        };

        Ok(SearchResult {
            games: candidates
                .iter()
                .take(self.config.max_games)
                .map(|hit| SearchHit {
                    corpus_path: hit.path.to_path_buf(),
                    index: hit.index,
                    game: hit.game.clone(),
                })
                .collect(),
            next_moves: next_moves.sorted_by_total(),
            total_games: total,
            white_win_percent: percent(outcomes.w),
            draw_percent: percent(outcomes.d),
            black_win_percent: percent(outcomes.b),
        })
    }

    /// Always produces exactly one response for the request, even if the
    /// search panics.
    pub fn execute(&mut self, request: SearchRequest) -> QueryResponse {
        let request_id = request.request_id;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.search(&request)))
            .unwrap_or_else(|payload| Err(QueryError::Panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(result) => QueryResponse::Done { request_id, result },
            Err(e) => QueryResponse::Failed {
                request_id,
                error: e.to_string(),
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
