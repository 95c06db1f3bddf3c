use super::config::PrepConfig;
use super::error::QueryError;
use super::moves::{self, NextMoveStats};
use super::reader;
use super::types::{Game, Line, MoveStat, PieceColor};

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Who the hero plays. Without it, the hero is whoever moves right after the
/// root line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepContext {
    pub hero_color: PieceColor,
}

/// Result split of a candidate pool with one game to show for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub w: u32,
    pub d: u32,
    pub b: u32,
    pub total: u32,
    pub example_game: Option<Game>,
}

impl PoolStats {
    fn of(pool: &[&Game]) -> Self {
        let mut stat = MoveStat::default();
        for game in pool {
            stat.record(game.outcome());
        }
        Self {
            w: stat.w,
            d: stat.d,
            b: stat.b,
            total: stat.total(),
            example_game: pool.first().map(|game| (*game).clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Moves played after the root line.
    pub line: Line,
    /// Product of the observed frequencies of every move in `line`.
    pub probability: f64,
    /// Same product over the opponent's moves only.
    pub opportunity_probability: f64,
    pub hero_stats: PoolStats,
    pub opponent_stats: PoolStats,
    /// Set when either corpus has no game reaching the root line.
    pub no_data: bool,
}

/// Reported after every finished layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepProgress {
    pub layer: usize,
    pub max_depth: usize,
    pub frontier: usize,
    pub emitted: usize,
}

/// One row of [`PrepEngine::compare`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveComparison {
    pub san: String,
    pub hero: MoveStat,
    pub opponent: MoveStat,
    pub hero_score_percent: f64,
    pub opponent_score_percent: f64,
}

struct ScenarioNode<'a> {
    line: Line,
    historical: f64,
    opportunity: f64,
    hero_pool: Vec<&'a Game>,
    opponent_pool: Vec<&'a Game>,
}

impl ScenarioNode<'_> {
    fn into_scenario(self, no_data: bool) -> Scenario {
        Scenario {
            hero_stats: PoolStats::of(&self.hero_pool),
            opponent_stats: PoolStats::of(&self.opponent_pool),
            line: self.line,
            probability: self.historical,
            opportunity_probability: self.opportunity,
            no_data,
        }
    }
}

/// Beam search over likely continuations of a root line, for opening
/// preparation against one opponent.
#[derive(Debug, Clone, Default)]
pub struct PrepEngine {
    config: PrepConfig,
}

impl PrepEngine {
    pub fn new(config: PrepConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// Rank alternating-turn continuations of `root` up to `max_depth` plies.
    ///
    /// Each layer expands every open node from the side to move's pool,
    /// keeping moves at or above that side's frequency floor. Children are
    /// ranked by historical probability and cut to the frontier limit before
    /// the next layer. Nodes that cannot be expanded, and those still open at
    /// the end, become scenarios.
    pub fn scenarios<S, F>(
        &self,
        hero: &[Game],
        opponent: &[Game],
        root: &[S],
        max_depth: usize,
        context: Option<PrepContext>,
        mut progress: F,
    ) -> Vec<Scenario>
    where
        S: AsRef<str>,
        F: FnMut(PrepProgress),
    {
        let hero_root = moves::match_prefix(hero, root).matches;
        let opponent_root = moves::match_prefix(opponent, root).matches;

        let root_node = ScenarioNode {
            line: Line::new(),
            historical: 1.0,
            opportunity: 1.0,
            hero_pool: hero_root,
            opponent_pool: opponent_root,
        };

        if root_node.hero_pool.is_empty() || root_node.opponent_pool.is_empty() {
            info!(
                "No games reach the root line (hero: {}, opponent: {})",
                root_node.hero_pool.len(),
                root_node.opponent_pool.len()
            );
            return vec![root_node.into_scenario(true)];
        }

        let mut emitted: Vec<Scenario> = Vec::new();
        let mut frontier = vec![root_node];

        for layer in 0..max_depth {
            if frontier.is_empty() {
                break;
            }

            let mut children = Vec::new();
            for node in frontier {
                let expanded = self.expand(&node, root.len(), context);
                if expanded.is_empty() {
                    emitted.push(node.into_scenario(false));
                } else {
                    children.extend(expanded);
                }
            }

            children.sort_by(|a, b| b.historical.total_cmp(&a.historical));
            children.truncate(self.config.frontier_limit());
            frontier = children;

            debug!(
                "Prep layer {}: {} open, {} emitted",
                layer + 1,
                frontier.len(),
                emitted.len()
            );
            progress(PrepProgress {
                layer: layer + 1,
                max_depth,
                frontier: frontier.len(),
                emitted: emitted.len(),
            });
        }

        emitted.extend(frontier.into_iter().map(|node| node.into_scenario(false)));
        emitted.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        emitted.truncate(self.config.max_scenarios);
        emitted
    }

    fn expand<'a>(
        &self,
        node: &ScenarioNode<'a>,
        root_len: usize,
        context: Option<PrepContext>,
    ) -> Vec<ScenarioNode<'a>> {
        let ply = root_len + node.line.len();
        let hero_turn = match context {
            Some(ctx) => PieceColor::to_move_at(ply) == ctx.hero_color,
            None => node.line.len().is_multiple_of(2),
        };

        let (pool, min_frequency) = if hero_turn {
            (&node.hero_pool, self.config.hero_min_frequency)
        } else {
            (&node.opponent_pool, self.config.opponent_min_frequency)
        };
        if pool.is_empty() {
            return Vec::new();
        }

        let stats: NextMoveStats = moves::next_move_stats(pool.iter().copied(), ply);
        let pool_size = pool.len() as f64;

        stats
            .iter()
            .filter_map(|(san, stat)| {
                let freq = f64::from(stat.total()) / pool_size;
                if freq < min_frequency {
                    return None;
                }

                let mut line = node.line.clone();
                line.push(san.to_string());
                Some(ScenarioNode {
                    line,
                    historical: node.historical * freq,
                    opportunity: if hero_turn {
                        node.opportunity
                    } else {
                        node.opportunity * freq
                    },
                    hero_pool: moves::narrow(&node.hero_pool, ply, san),
                    opponent_pool: moves::narrow(&node.opponent_pool, ply, san),
                })
            })
            .collect()
    }

    /// Next moves after `prefix` as played by each side, in first-seen order
    /// (hero's moves first). Scores are from each side's point of view.
    pub fn compare<S: AsRef<str>>(
        &self,
        hero: &[Game],
        opponent: &[Game],
        prefix: &[S],
        context: Option<PrepContext>,
    ) -> Vec<MoveComparison> {
        let hero_stats = moves::match_prefix(hero, prefix).next_moves;
        let opponent_stats = moves::match_prefix(opponent, prefix).next_moves;

        let hero_color = context
            .map(|ctx| ctx.hero_color)
            .unwrap_or_else(|| PieceColor::to_move_at(prefix.len()));
        let opponent_color = match hero_color {
            PieceColor::White => PieceColor::Black,
            PieceColor::Black => PieceColor::White,
        };

        let mut sans: Vec<&str> = hero_stats.moves().collect();
        for san in opponent_stats.moves() {
            if hero_stats.get(san).is_none() {
                sans.push(san);
            }
        }

        sans.into_iter()
            .map(|san| {
                let hero = hero_stats.get(san).copied().unwrap_or_default();
                let opponent = opponent_stats.get(san).copied().unwrap_or_default();
                MoveComparison {
                    san: san.to_string(),
                    hero,
                    opponent,
                    hero_score_percent: hero.score_percent(hero_color),
                    opponent_score_percent: opponent.score_percent(opponent_color),
                }
            })
            .collect()
    }

    /// [`PrepEngine::scenarios`] over corpus files or glob patterns.
    pub fn scenarios_for_paths<P, S, F>(
        &self,
        hero_paths: &[P],
        opponent_paths: &[P],
        root: &[S],
        max_depth: usize,
        context: Option<PrepContext>,
        progress: F,
    ) -> Result<Vec<Scenario>, QueryError>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
        F: FnMut(PrepProgress),
    {
        let hero = reader::load_corpora(hero_paths)?;
        let opponent = reader::load_corpora(opponent_paths)?;
        Ok(self.scenarios(&hero, &opponent, root, max_depth, context, progress))
    }

    /// [`PrepEngine::compare`] over corpus files or glob patterns.
    pub fn compare_paths<P, S>(
        &self,
        hero_paths: &[P],
        opponent_paths: &[P],
        prefix: &[S],
        context: Option<PrepContext>,
    ) -> Result<Vec<MoveComparison>, QueryError>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let hero = reader::load_corpora(hero_paths)?;
        let opponent = reader::load_corpora(opponent_paths)?;
        Ok(self.compare(&hero, &opponent, prefix, context))
    }
}
