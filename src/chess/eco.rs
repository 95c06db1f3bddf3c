//! Opening classification by move sequence.
//!
//! Keys are exact SAN sequences (space separated, at most [`MAX_PLY`] plies).
//! Lookup walks from the longest available prefix down; at each length the
//! named lines win over the generic category lines.

use std::collections::HashMap;
use std::sync::LazyLock;

pub const MAX_PLY: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcoEntry {
    pub code: &'static str,
    pub name: &'static str,
}

const NAMED_LINES: &[(&str, &str, &str)] = &[
    // Open games
    ("e4 e5 Nf3 Nc6 Bb5", "C60", "Ruy Lopez"),
    ("e4 e5 Nf3 Nc6 Bb5 a6", "C70", "Ruy Lopez: Morphy Defense"),
    ("e4 e5 Nf3 Nc6 Bb5 a6 Bxc6", "C68", "Ruy Lopez: Exchange Variation"),
    ("e4 e5 Nf3 Nc6 Bb5 a6 Ba4 Nf6 O-O Be7", "C84", "Ruy Lopez: Closed"),
    ("e4 e5 Nf3 Nc6 Bb5 a6 Ba4 Nf6 O-O Nxe4", "C80", "Ruy Lopez: Open"),
    ("e4 e5 Nf3 Nc6 Bb5 Nf6", "C65", "Ruy Lopez: Berlin Defense"),
    ("e4 e5 Nf3 Nc6 Bb5 Nf6 O-O Nxe4", "C67", "Ruy Lopez: Berlin Defense, Rio Gambit Accepted"),
    ("e4 e5 Nf3 Nc6 Bc4", "C50", "Italian Game"),
    ("e4 e5 Nf3 Nc6 Bc4 Bc5", "C50", "Italian Game: Giuoco Piano"),
    ("e4 e5 Nf3 Nc6 Bc4 Bc5 c3", "C53", "Italian Game: Classical Variation"),
    ("e4 e5 Nf3 Nc6 Bc4 Bc5 b4", "C51", "Italian Game: Evans Gambit"),
    ("e4 e5 Nf3 Nc6 Bc4 Nf6", "C55", "Italian Game: Two Knights Defense"),
    ("e4 e5 Nf3 Nc6 Bc4 Nf6 Ng5", "C57", "Italian Game: Two Knights Defense, Knight Attack"),
    ("e4 e5 Nf3 Nc6 d4", "C44", "Scotch Game"),
    ("e4 e5 Nf3 Nc6 d4 exd4 Nxd4", "C45", "Scotch Game"),
    ("e4 e5 Nf3 Nc6 Nc3 Nf6", "C47", "Four Knights Game"),
    ("e4 e5 Nf3 Nf6", "C42", "Petrov's Defense"),
    ("e4 e5 Nf3 d6", "C41", "Philidor Defense"),
    ("e4 e5 f4", "C30", "King's Gambit"),
    ("e4 e5 f4 exf4", "C33", "King's Gambit Accepted"),
    ("e4 e5 Nc3", "C25", "Vienna Game"),
    // Sicilian
    ("e4 c5 Nf3 d6 d4 cxd4 Nxd4 Nf6 Nc3 a6", "B90", "Sicilian Defense: Najdorf Variation"),
    ("e4 c5 Nf3 d6 d4 cxd4 Nxd4 Nf6 Nc3 g6", "B70", "Sicilian Defense: Dragon Variation"),
    ("e4 c5 Nf3 d6 d4 cxd4 Nxd4 Nf6 Nc3 e6", "B80", "Sicilian Defense: Scheveningen Variation"),
    ("e4 c5 Nf3 d6 d4 cxd4 Nxd4 Nf6 Nc3 Nc6", "B56", "Sicilian Defense: Classical Variation"),
    ("e4 c5 Nf3 Nc6 d4 cxd4 Nxd4 Nf6 Nc3 e5", "B33", "Sicilian Defense: Sveshnikov Variation"),
    ("e4 c5 Nf3 e6 d4 cxd4 Nxd4 a6", "B41", "Sicilian Defense: Kan Variation"),
    ("e4 c5 Nf3 e6 d4 cxd4 Nxd4 Nc6", "B44", "Sicilian Defense: Taimanov Variation"),
    ("e4 c5 Nf3 d6 Bb5+", "B51", "Sicilian Defense: Moscow Variation"),
    ("e4 c5 c3", "B22", "Sicilian Defense: Alapin Variation"),
    ("e4 c5 Nc3", "B23", "Sicilian Defense: Closed"),
    ("e4 c5 d4 cxd4 c3", "B21", "Sicilian Defense: Smith-Morra Gambit"),
    // French, Caro-Kann, others
    ("e4 e6 d4 d5 Nc3 Bb4", "C15", "French Defense: Winawer Variation"),
    ("e4 e6 d4 d5 Nc3 Nf6", "C11", "French Defense: Classical Variation"),
    ("e4 e6 d4 d5 Nd2", "C03", "French Defense: Tarrasch Variation"),
    ("e4 e6 d4 d5 e5", "C02", "French Defense: Advance Variation"),
    ("e4 e6 d4 d5 exd5 exd5", "C01", "French Defense: Exchange Variation"),
    ("e4 c6 d4 d5 e5", "B12", "Caro-Kann Defense: Advance Variation"),
    ("e4 c6 d4 d5 Nc3 dxe4 Nxe4 Bf5", "B18", "Caro-Kann Defense: Classical Variation"),
    ("e4 c6 d4 d5 exd5 cxd5", "B13", "Caro-Kann Defense: Exchange Variation"),
    ("e4 d5 exd5 Qxd5", "B01", "Scandinavian Defense: Mieses-Kotroc Variation"),
    ("e4 Nf6 e5 Nd5 d4 d6", "B03", "Alekhine Defense: Modern Variation"),
    // Closed games
    ("d4 d5 c4 e6", "D30", "Queen's Gambit Declined"),
    ("d4 d5 c4 e6 Nc3 Nf6 Bg5", "D50", "Queen's Gambit Declined: Modern Variation"),
    ("d4 d5 c4 dxc4", "D20", "Queen's Gambit Accepted"),
    ("d4 d5 c4 c6", "D10", "Slav Defense"),
    ("d4 d5 c4 c6 Nf3 Nf6 Nc3 e6", "D43", "Semi-Slav Defense"),
    ("d4 d5 Bf4", "D02", "Queen's Pawn Game: London System"),
    ("d4 Nf6 Bf4", "A46", "Indian Game: London System"),
    // Indian defenses
    ("d4 Nf6 c4 g6 Nc3 Bg7 e4 d6", "E70", "King's Indian Defense: Normal Variation"),
    ("d4 Nf6 c4 g6 Nc3 Bg7 e4 d6 Nf3 O-O Be2 e5", "E92", "King's Indian Defense: Classical Variation"),
    ("d4 Nf6 c4 g6 Nc3 Bg7 e4 d6 f3", "E80", "King's Indian Defense: Samisch Variation"),
    ("d4 Nf6 c4 g6 Nc3 d5", "D80", "Grunfeld Defense"),
    ("d4 Nf6 c4 g6 Nc3 d5 cxd5 Nxd5 e4", "D85", "Grunfeld Defense: Exchange Variation"),
    ("d4 Nf6 c4 e6 Nc3 Bb4", "E20", "Nimzo-Indian Defense"),
    ("d4 Nf6 c4 e6 Nc3 Bb4 Qc2", "E32", "Nimzo-Indian Defense: Classical Variation"),
    ("d4 Nf6 c4 e6 Nf3 b6", "E12", "Queen's Indian Defense"),
    ("d4 Nf6 c4 e6 Nf3 Bb4+", "E11", "Bogo-Indian Defense"),
    ("d4 Nf6 c4 e6 g3", "E01", "Catalan Opening"),
    ("d4 Nf6 c4 c5 d5", "A56", "Benoni Defense"),
    ("d4 Nf6 c4 c5 d5 e6", "A60", "Benoni Defense: Modern Variation"),
    ("d4 Nf6 c4 c5 d5 b5", "A57", "Benko Gambit"),
    ("d4 f5 g3 Nf6 Bg2 g6", "A87", "Dutch Defense: Leningrad Variation"),
    // Flank openings
    ("c4 c5", "A30", "English Opening: Symmetrical Variation"),
    ("c4 e5", "A20", "English Opening: King's English Variation"),
    ("c4 Nf6", "A15", "English Opening: Anglo-Indian Defense"),
    ("Nf3 d5 c4", "A09", "Reti Opening"),
];

const CATEGORY_LINES: &[(&str, &str, &str)] = &[
    ("e4", "B00", "King's Pawn Game"),
    ("e4 e5", "C20", "King's Pawn Game"),
    ("e4 e5 Nf3", "C40", "King's Knight Opening"),
    ("e4 e5 Nf3 Nc6", "C44", "King's Knight Opening: Normal Variation"),
    ("e4 c5", "B20", "Sicilian Defense"),
    ("e4 c5 Nf3", "B27", "Sicilian Defense"),
    ("e4 c5 Nf3 d6", "B50", "Sicilian Defense"),
    ("e4 c5 Nf3 Nc6", "B30", "Sicilian Defense: Old Sicilian"),
    ("e4 c5 Nf3 e6", "B40", "Sicilian Defense: French Variation"),
    ("e4 c5 Nf3 d6 d4 cxd4 Nxd4 Nf6 Nc3", "B54", "Sicilian Defense: Open"),
    ("e4 e6", "C00", "French Defense"),
    ("e4 e6 d4 d5", "C00", "French Defense"),
    ("e4 c6", "B10", "Caro-Kann Defense"),
    ("e4 c6 d4 d5", "B12", "Caro-Kann Defense"),
    ("e4 d5", "B01", "Scandinavian Defense"),
    ("e4 d6", "B07", "Pirc Defense"),
    ("e4 g6", "B06", "Modern Defense"),
    ("e4 Nf6", "B02", "Alekhine Defense"),
    ("d4", "A40", "Queen's Pawn Game"),
    ("d4 d5", "D00", "Queen's Pawn Game"),
    ("d4 d5 c4", "D06", "Queen's Gambit"),
    ("d4 Nf6", "A45", "Indian Game"),
    ("d4 Nf6 c4", "A50", "Indian Game: Normal Variation"),
    ("d4 Nf6 c4 e6", "E00", "Indian Game: East Indian Defense"),
    ("d4 Nf6 c4 g6", "E60", "King's Indian Defense"),
    ("d4 Nf6 c4 g6 Nc3 Bg7", "E61", "King's Indian Defense"),
    ("d4 f5", "A80", "Dutch Defense"),
    ("c4", "A10", "English Opening"),
    ("Nf3", "A04", "Zukertort Opening"),
    ("f4", "A02", "Bird Opening"),
    ("b3", "A01", "Nimzo-Larsen Attack"),
    ("g3", "A00", "Hungarian Opening"),
];

static NAMED: LazyLock<HashMap<&'static str, EcoEntry>> = LazyLock::new(|| build(NAMED_LINES));
static CATEGORIES: LazyLock<HashMap<&'static str, EcoEntry>> =
    LazyLock::new(|| build(CATEGORY_LINES));

fn build(table: &'static [(&'static str, &'static str, &'static str)]) -> HashMap<&'static str, EcoEntry> {
    table
        .iter()
        .map(|&(line, code, name)| (line, EcoEntry { code, name }))
        .collect()
}

/// Deepest table entry whose key equals a prefix of `moves`.
pub fn lookup<S: AsRef<str>>(moves: &[S]) -> Option<EcoEntry> {
    let depth = moves.len().min(MAX_PLY);
    if depth == 0 {
        return None;
    }

    // One joined string, sliced at token boundaries for each prefix length.
    let mut joined = String::new();
    let mut ends = Vec::with_capacity(depth);
    for san in &moves[..depth] {
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(san.as_ref());
        ends.push(joined.len());
    }

    ends.iter().rev().find_map(|&end| {
        let key = &joined[..end];
        NAMED.get(key).or_else(|| CATEGORIES.get(key)).copied()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sans(line: &str) -> Vec<&str> {
        line.split_whitespace().collect()
    }

    #[test]
    fn test_lookup_prefers_deepest_match() {
        let entry = lookup(&sans("e4 c5 Nf3 d6 d4 cxd4 Nxd4 Nf6 Nc3 a6 Be3 e5 Nb3")).unwrap();
        assert_eq!(entry.code, "B90");
    }

    #[test]
    fn test_lookup_named_line_beats_category_at_same_depth() {
        // "e4 e5 Nf3 Nc6" is only a category line, but "... Bb5" is named.
        assert_eq!(lookup(&sans("e4 e5 Nf3 Nc6 Bb5 d6")).unwrap().code, "C60");
        assert_eq!(lookup(&sans("e4 e5 Nf3 Nc6 h3")).unwrap().code, "C44");
    }

    #[test]
    fn test_lookup_falls_back_to_category() {
        let entry = lookup(&sans("e4 c5 a3")).unwrap();
        assert_eq!(entry.code, "B20");
        assert_eq!(entry.name, "Sicilian Defense");
    }

    #[test]
    fn test_lookup_ignores_plies_beyond_limit() {
        // Twelve plies reach the classical King's Indian; later moves don't matter.
        let entry = lookup(&sans("d4 Nf6 c4 g6 Nc3 Bg7 e4 d6 Nf3 O-O Be2 e5 O-O Nc6")).unwrap();
        assert_eq!(entry.code, "E92");
    }

    #[test]
    fn test_lookup_unknown_and_empty() {
        assert_eq!(lookup(&sans("a4 h5")), None);
        assert_eq!(lookup::<&str>(&[]), None);
    }

    #[test]
    fn test_table_keys_fit_depth_limit() {
        for (line, _, _) in NAMED_LINES.iter().chain(CATEGORY_LINES) {
            assert!(line.split_whitespace().count() <= MAX_PLY, "{line}");
        }
    }
}
