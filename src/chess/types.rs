use serde::{Deserialize, Serialize};
use shakmaty::{Color, Role};
use smallvec::SmallVec;

/// Moves beyond a root prefix; short enough to stay inline in search nodes.
pub type Line = SmallVec<[String; 16]>;

/// Parsed game from PGN.
///
/// The seven roster tags get their own fields; every other tag is kept in
/// `extra` in file order so the header block can be reproduced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub tags: Tags,
    pub extra: Vec<(String, String)>,

    /// SAN tokens only: no move numbers, comments, variations, NAGs or result.
    pub moves: Vec<String>,

    // Opening info
    pub eco: Option<String>,
    pub opening: Option<String>,

    /// Original text of the game, trimmed. Rewrites are built from this.
    pub raw: String,

    /// NULL for clean games, otherwise the dropped header lines.
    pub parse_warning: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tags {
    pub event: Option<String>,
    pub site: Option<String>,
    pub date: Option<String>,
    pub round: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,
}

impl Tags {
    /// Slot for a roster tag, `None` for anything else.
    pub fn slot_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        let slot = match key {
            "Event" => &mut self.event,
            "Site" => &mut self.site,
            "Date" => &mut self.date,
            "Round" => &mut self.round,
            "White" => &mut self.white,
            "Black" => &mut self.black,
            "Result" => &mut self.result,
            _ => return None,
        };
        Some(slot)
    }
}

impl Game {
    pub fn tag(&self, key: &str) -> Option<&str> {
        let known = match key {
            "Event" => &self.tags.event,
            "Site" => &self.tags.site,
            "Date" => &self.tags.date,
            "Round" => &self.tags.round,
            "White" => &self.tags.white,
            "Black" => &self.tags.black,
            "Result" => &self.tags.result,
            _ => {
                return self
                    .extra
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.as_str());
            }
        };
        known.as_deref()
    }

    pub fn white_elo(&self) -> Option<u32> {
        self.tag("WhiteElo").and_then(parse_elo)
    }

    pub fn black_elo(&self) -> Option<u32> {
        self.tag("BlackElo").and_then(parse_elo)
    }

    /// Average of both ratings when both are known, else whichever is.
    pub fn derived_elo(&self) -> Option<f64> {
        match (self.white_elo(), self.black_elo()) {
            (Some(w), Some(b)) => Some((f64::from(w) + f64::from(b)) / 2.0),
            (Some(elo), None) | (None, Some(elo)) => Some(f64::from(elo)),
            (None, None) => None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_result(self.tags.result.as_deref())
    }
}

fn parse_elo(s: &str) -> Option<u32> {
    s.trim().parse::<u32>().ok()
}

/// Result bucket used by every aggregate in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    WhiteWin,
    BlackWin,
    /// Draws and everything unrecognized (`*`, missing, garbage).
    Other,
}

impl Outcome {
    pub fn from_result(result: Option<&str>) -> Self {
        match result {
            Some("1-0") => Self::WhiteWin,
            Some("0-1") => Self::BlackWin,
            _ => Self::Other,
        }
    }
}

/// Win/draw/loss tally for one continuation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveStat {
    pub w: u32,
    pub d: u32,
    pub b: u32,
}

impl MoveStat {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::WhiteWin => self.w += 1,
            Outcome::BlackWin => self.b += 1,
            Outcome::Other => self.d += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.w + self.d + self.b
    }

    /// Percentage of games won by `side`, draws counting half.
    pub fn score_percent(&self, side: PieceColor) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let wins = match side {
            PieceColor::White => self.w,
            PieceColor::Black => self.b,
        };
        (f64::from(wins) + f64::from(self.d) / 2.0) * 100.0 / f64::from(total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    White,
    Black,
}

impl PieceColor {
    /// Side to move after `ply` half-moves from the initial position.
    pub fn to_move_at(ply: usize) -> Self {
        if ply.is_multiple_of(2) {
            Self::White
        } else {
            Self::Black
        }
    }
}

impl From<PieceColor> for Color {
    fn from(color: PieceColor) -> Self {
        match color {
            PieceColor::White => Color::White,
            PieceColor::Black => Color::Black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceRole {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl From<PieceRole> for Role {
    fn from(role: PieceRole) -> Self {
        match role {
            PieceRole::Pawn => Role::Pawn,
            PieceRole::Knight => Role::Knight,
            PieceRole::Bishop => Role::Bishop,
            PieceRole::Rook => Role::Rook,
            PieceRole::Queen => Role::Queen,
            PieceRole::King => Role::King,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_with(extra: &[(&str, &str)], result: Option<&str>) -> Game {
        Game {
            tags: Tags {
                result: result.map(str::to_string),
                ..Tags::default()
            },
            extra: extra
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Game::default()
        }
    }

    #[test]
    fn test_derived_elo_averages_both_sides() {
        let game = game_with(&[("WhiteElo", "2500"), ("BlackElo", "2400")], None);
        assert_eq!(game.derived_elo(), Some(2450.0));
    }

    #[test]
    fn test_derived_elo_uses_single_side() {
        let game = game_with(&[("BlackElo", "2100")], None);
        assert_eq!(game.derived_elo(), Some(2100.0));
    }

    #[test]
    fn test_derived_elo_ignores_unparsable_ratings() {
        let game = game_with(&[("WhiteElo", "?"), ("BlackElo", "-")], None);
        assert_eq!(game.derived_elo(), None);
    }

    #[test]
    fn test_tag_lookup_covers_roster_and_extra() {
        let mut game = game_with(&[("TimeControl", "600+5")], Some("1-0"));
        game.tags.white = Some("Carlsen".to_string());
        assert_eq!(game.tag("White"), Some("Carlsen"));
        assert_eq!(game.tag("TimeControl"), Some("600+5"));
        assert_eq!(game.tag("Opening"), None);
    }

    #[test]
    fn test_outcome_buckets_unknown_results_as_other() {
        assert_eq!(Outcome::from_result(Some("1-0")), Outcome::WhiteWin);
        assert_eq!(Outcome::from_result(Some("0-1")), Outcome::BlackWin);
        assert_eq!(Outcome::from_result(Some("1/2-1/2")), Outcome::Other);
        assert_eq!(Outcome::from_result(Some("*")), Outcome::Other);
        assert_eq!(Outcome::from_result(Some("white wins")), Outcome::Other);
        assert_eq!(Outcome::from_result(None), Outcome::Other);
    }

    #[test]
    fn test_score_percent_counts_draws_half() {
        let stat = MoveStat { w: 2, d: 2, b: 0 };
        assert_eq!(stat.score_percent(PieceColor::White), 75.0);
        assert_eq!(stat.score_percent(PieceColor::Black), 25.0);
        assert_eq!(MoveStat::default().score_percent(PieceColor::White), 0.0);
    }
}
