use super::types::{Game, PieceColor, PieceRole};

use serde::{Deserialize, Serialize};
use shakmaty::{Board, Chess, Color, Piece, Position, Role, Square, san::SanPlus};
use std::collections::BTreeMap;
use tracing::warn;

/// Search filter. Every field is optional; unset fields don't constrain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterPredicate {
    pub white: Option<String>,
    pub black: Option<String>,
    pub event: Option<String>,
    pub eco: Option<String>,
    pub result: Option<String>,
    /// Inclusive, compared as `YYYY.MM.DD` text.
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub elo_min: Option<f64>,
    pub elo_max: Option<f64>,
    pub material: Option<MaterialCriteria>,
    /// Square name (`"e4"`) to requirement.
    pub position: Option<BTreeMap<String, SquareRequirement>>,
}

/// Exact live piece counts per color.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialCriteria {
    pub white: BTreeMap<PieceRole, u32>,
    pub black: BTreeMap<PieceRole, u32>,
}

impl MaterialCriteria {
    fn is_empty(&self) -> bool {
        self.white.is_empty() && self.black.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum SquareRequirement {
    Empty,
    Piece { color: PieceColor, role: PieceRole },
}

impl FilterPredicate {
    pub fn has_deep_criteria(&self) -> bool {
        self.material.as_ref().is_some_and(|m| !m.is_empty())
            || self.position.as_ref().is_some_and(|p| !p.is_empty())
    }
}

pub fn matches(game: &Game, predicate: &FilterPredicate) -> bool {
    matches_basic(game, predicate) && matches_deep(game, predicate)
}

/// Header-only checks: names, event, ECO, result, date and Elo ranges.
pub fn matches_basic(game: &Game, predicate: &FilterPredicate) -> bool {
    let tags = &game.tags;

    contains_ci(tags.white.as_deref(), predicate.white.as_deref())
        && contains_ci(tags.black.as_deref(), predicate.black.as_deref())
        && contains_ci(tags.event.as_deref(), predicate.event.as_deref())
        && contains_ci(game.eco.as_deref(), predicate.eco.as_deref())
        && predicate
            .result
            .as_deref()
            .is_none_or(|wanted| tags.result.as_deref().unwrap_or("") == wanted)
        && date_in_range(tags.date.as_deref(), predicate)
        && elo_in_range(game, predicate)
}

fn contains_ci(haystack: Option<&str>, needle: Option<&str>) -> bool {
    let Some(needle) = needle else {
        return true;
    };
    haystack
        .unwrap_or("")
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

fn date_in_range(date: Option<&str>, predicate: &FilterPredicate) -> bool {
    let date = date.unwrap_or("");
    predicate.date_from.as_deref().is_none_or(|from| date >= from)
        && predicate.date_to.as_deref().is_none_or(|to| date <= to)
}

fn elo_in_range(game: &Game, predicate: &FilterPredicate) -> bool {
    if predicate.elo_min.is_none() && predicate.elo_max.is_none() {
        return true;
    }
    // No rating on either side: the range doesn't apply.
    let Some(elo) = game.derived_elo() else {
        return true;
    };
    predicate.elo_min.is_none_or(|min| elo >= min) && predicate.elo_max.is_none_or(|max| elo <= max)
}

/// Board-replay checks. True when no deep criteria are set, otherwise when any
/// position reached after a move satisfies all of them at once.
pub fn matches_deep(game: &Game, predicate: &FilterPredicate) -> bool {
    if !predicate.has_deep_criteria() {
        return true;
    }
    let Some(criteria) = DeepCriteria::compile(predicate) else {
        return false;
    };

    let mut pos = Chess::default();
    for token in &game.moves {
        match apply_move(&pos, token) {
            Some(next) => pos = next,
            // Illegal or unreadable move: nothing after it is trusted.
            None => return false,
        }
        if criteria.satisfied_by(pos.board()) {
            return true;
        }
    }
    false
}

/// Play one SAN token. `None` when it doesn't parse or isn't legal here.
pub fn apply_move(pos: &Chess, san: &str) -> Option<Chess> {
    let san: SanPlus = san.parse().ok()?;
    let m = san.san.to_move(pos).ok()?;
    let mut next = pos.clone();
    next.play_unchecked(m);
    Some(next)
}

pub fn piece_at(pos: &Chess, square: Square) -> Option<Piece> {
    pos.board().piece_at(square)
}

struct DeepCriteria {
    squares: Vec<(Square, Option<Piece>)>,
    counts: Vec<(Color, Role, u32)>,
}

impl DeepCriteria {
    fn compile(predicate: &FilterPredicate) -> Option<Self> {
        let mut squares = Vec::new();
        for (name, requirement) in predicate.position.iter().flatten() {
            let square = match name.trim().to_lowercase().parse::<Square>() {
                Ok(square) => square,
                Err(_) => {
                    warn!("Position filter names unknown square '{name}'; nothing can match");
                    return None;
                }
            };
            let piece = match *requirement {
                SquareRequirement::Empty => None,
                SquareRequirement::Piece { color, role } => Some(Piece {
                    color: color.into(),
                    role: role.into(),
                }),
            };
            squares.push((square, piece));
        }

        let mut counts = Vec::new();
        if let Some(material) = &predicate.material {
            for (color, by_role) in [(Color::White, &material.white), (Color::Black, &material.black)] {
                counts.extend(by_role.iter().map(|(&role, &count)| (color, role.into(), count)));
            }
        }

        Some(Self { squares, counts })
    }

    fn satisfied_by(&self, board: &Board) -> bool {
        self.squares
            .iter()
            .all(|&(square, piece)| board.piece_at(square) == piece)
            && self.counts.iter().all(|&(color, role, count)| {
                (board.by_color(color) & board.by_role(role)).count() == count as usize
            })
    }
}
