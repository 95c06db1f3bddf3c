use super::types::{Game, MoveStat};

use serde::Serialize;
use std::collections::HashMap;

/// Next-move tallies in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NextMoveStats {
    entries: Vec<(String, MoveStat)>,
    index: HashMap<String, usize>,
}

/// One row of [`NextMoveStats::sorted_by_total`], shaped for the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextMove {
    pub san: String,
    #[serde(flatten)]
    pub stat: MoveStat,
    pub total: u32,
}

impl NextMoveStats {
    pub fn record(&mut self, san: &str, game: &Game) {
        let slot = match self.index.get(san) {
            Some(&slot) => slot,
            None => {
                self.index.insert(san.to_string(), self.entries.len());
                self.entries.push((san.to_string(), MoveStat::default()));
                self.entries.len() - 1
            }
        };
        self.entries[slot].1.record(game.outcome());
    }

    pub fn get(&self, san: &str) -> Option<&MoveStat> {
        self.index.get(san).map(|&slot| &self.entries[slot].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MoveStat)> {
        self.entries.iter().map(|(san, stat)| (san.as_str(), stat))
    }

    pub fn moves(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(san, _)| san.as_str())
    }

    /// Games that had a next move at all.
    pub fn total(&self) -> u32 {
        self.entries.iter().map(|(_, stat)| stat.total()).sum()
    }

    /// Descending by total; ties keep first-seen order.
    pub fn sorted_by_total(&self) -> Vec<NextMove> {
        let mut rows: Vec<NextMove> = self
            .entries
            .iter()
            .map(|(san, stat)| NextMove {
                san: san.clone(),
                stat: *stat,
                total: stat.total(),
            })
            .collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total));
        rows
    }
}

#[derive(Debug, Clone)]
pub struct PrefixMatch<'a> {
    pub matches: Vec<&'a Game>,
    pub next_moves: NextMoveStats,
}

pub fn is_prefix_of<S: AsRef<str>>(prefix: &[S], moves: &[String]) -> bool {
    prefix.len() <= moves.len()
        && prefix
            .iter()
            .zip(moves.iter())
            .all(|(p, m)| p.as_ref() == m)
}

/// Games starting with `prefix`, plus the result split of the move after it.
///
/// Case-sensitive token equality. Games ending exactly at the prefix match
/// but contribute no next move.
pub fn match_prefix<'a, I, S>(games: I, prefix: &[S]) -> PrefixMatch<'a>
where
    I: IntoIterator<Item = &'a Game>,
    S: AsRef<str>,
{
    let matches: Vec<&'a Game> = games
        .into_iter()
        .filter(|game| is_prefix_of(prefix, &game.moves))
        .collect();
    let next_moves = next_move_stats(matches.iter().copied(), prefix.len());

    PrefixMatch {
        matches,
        next_moves,
    }
}

/// Tally the token at `ply` for games already known to share a prefix of that
/// length.
pub fn next_move_stats<'a, I>(games: I, ply: usize) -> NextMoveStats
where
    I: IntoIterator<Item = &'a Game>,
{
    let mut stats = NextMoveStats::default();
    for game in games {
        if let Some(san) = game.moves.get(ply) {
            stats.record(san, game);
        }
    }
    stats
}

/// Keep only games playing `san` at `ply`.
pub fn narrow<'a>(games: &[&'a Game], ply: usize, san: &str) -> Vec<&'a Game> {
    games
        .iter()
        .copied()
        .filter(|game| game.moves.get(ply).is_some_and(|m| m == san))
        .collect()
}
