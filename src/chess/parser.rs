use super::eco;
use super::error::ErrorAccumulator;
use super::types::{Game, Tags};

use regex::Regex;
use std::mem;
use std::sync::LazyLock;
use tracing::debug;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\[\s*([A-Za-z0-9_]+)\s+"(.*)"\s*\]$"#).unwrap());
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}").unwrap());
static VARIATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());
static MOVE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.+").unwrap());

const RESULT_TOKENS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Headers,
    Movetext,
}

/// Accumulates one game block at a time while scanning lines.
struct GameBuilder {
    tags: Tags,
    extra: Vec<(String, String)>,
    movetext: String,
    header_count: usize,
    raw_start: Option<usize>,
    raw_end: usize,
    warnings: ErrorAccumulator,
}

impl GameBuilder {
    fn new() -> Self {
        Self {
            tags: Tags::default(),
            extra: Vec::new(),
            movetext: String::new(),
            header_count: 0,
            raw_start: None,
            raw_end: 0,
            warnings: ErrorAccumulator::default(),
        }
    }

    fn touch(&mut self, start: usize, end: usize) {
        self.raw_start.get_or_insert(start);
        self.raw_end = end;
    }

    fn push_header(&mut self, line: &str) {
        let Some(caps) = HEADER.captures(line) else {
            debug!("Dropping malformed header line: {line}");
            self.warnings.push(&format!("Malformed header: {line}"));
            return;
        };
        let key = &caps[1];
        let value = caps[2].to_string();
        self.header_count += 1;

        match self.tags.slot_mut(key) {
            Some(slot) => {
                if slot.is_none() {
                    *slot = Some(value);
                }
            }
            None => self.extra.push((key.to_string(), value)),
        }
    }

    fn push_movetext(&mut self, line: &str) {
        if !self.movetext.is_empty() {
            self.movetext.push(' ');
        }
        self.movetext.push_str(line);
    }

    /// `None` when the block had neither headers nor moves.
    fn finish(&mut self, text: &str) -> Option<Game> {
        let builder = mem::replace(self, Self::new());
        let GameBuilder {
            tags,
            extra,
            movetext,
            header_count,
            raw_start,
            raw_end,
            mut warnings,
        } = builder;

        let moves = clean_movetext(&movetext);
        if header_count == 0 && moves.is_empty() {
            return None;
        }

        let raw = raw_start
            .map(|start| text[start..raw_end].trim().to_string())
            .unwrap_or_default();

        let tag_value = |key: &str| {
            extra
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty() && v != "?")
        };
        let classified = eco::lookup(&moves);
        let eco = tag_value("ECO").or_else(|| classified.map(|e| e.code.to_string()));
        let opening = tag_value("Opening").or_else(|| classified.map(|e| e.name.to_string()));

        Some(Game {
            tags,
            extra,
            moves,
            eco,
            opening,
            raw,
            parse_warning: warnings.take(),
        })
    }
}

/// Split PGN text into games.
///
/// A blank line after headers switches to movetext; a header line met in
/// movetext closes the current game. Never fails: malformed headers are dropped
/// and recorded on the game's `parse_warning`.
pub fn parse(text: &str) -> Vec<Game> {
    let mut games = Vec::new();
    let mut builder = GameBuilder::new();
    let mut section = Section::Headers;
    let mut offset = 0;

    for raw_line in text.split_inclusive('\n') {
        let start = offset;
        offset += raw_line.len();
        let line = raw_line.trim();

        // In movetext only a well-formed tag pair opens the next game; other
        // bracketed lines (wrapped `[%clk ...]` comments) stay movetext.
        if line.starts_with('[') && (section == Section::Headers || HEADER.is_match(line)) {
            if section == Section::Movetext {
                games.extend(builder.finish(text));
                section = Section::Headers;
            }
            builder.touch(start, offset);
            builder.push_header(line);
        } else if line.is_empty() {
            if section == Section::Headers && builder.header_count > 0 {
                section = Section::Movetext;
            }
        } else {
            // Movetext without the separating blank line is still movetext.
            section = Section::Movetext;
            builder.touch(start, offset);
            builder.push_movetext(line);
        }
    }
    games.extend(builder.finish(text));

    games
}

/// Strip comments, variations, move numbers and results, then tokenize.
///
/// Single pass, not recursive: `{a {b} c}` leaves ` c}` behind and nested
/// parentheses leak the same way.
pub fn clean_movetext(movetext: &str) -> Vec<String> {
    let text = COMMENT.replace_all(movetext, " ");
    let text = VARIATION.replace_all(&text, " ");
    let text = MOVE_NUMBER.replace_all(&text, " ");

    text.split_whitespace()
        .filter(|token| !RESULT_TOKENS.contains(token))
        .filter(|token| !token.starts_with('$'))
        .map(|token| token.trim_end_matches(['!', '?']))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_game() {
        let games = parse("[Event \"Test\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 Nc6 1-0");
        assert_eq!(games.len(), 1);

        let game = &games[0];
        assert_eq!(game.moves, vec!["e4", "e5", "Nf3", "Nc6"]);
        assert_eq!(game.tags.result.as_deref(), Some("1-0"));
        assert_eq!(game.tags.event.as_deref(), Some("Test"));
        assert!(game.parse_warning.is_none());
    }

    #[test]
    fn test_parse_multiple_games() {
        let pgn = r#"[Event "One"]
[White "A"]
[Black "B"]
[Result "1-0"]

1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0

[Event "Two"]
[Result "0-1"]

1. d4 d5 0-1

[Event "Three"]
[Result "1/2-1/2"]

1. c4 1/2-1/2
"#;
        let games = parse(pgn);
        assert_eq!(games.len(), 3);
        assert_eq!(games[0].tags.white.as_deref(), Some("A"));
        assert_eq!(games[0].moves.last().map(String::as_str), Some("Qxf7#"));
        assert_eq!(games[1].moves, vec!["d4", "d5"]);
        assert_eq!(games[2].moves, vec!["c4"]);
        for game in &games {
            assert!(game.moves.iter().all(|m| !m.ends_with('.') && !m.contains('{')));
        }
    }

    #[test]
    fn test_parse_header_in_movetext_starts_new_game() {
        // No blank line between games.
        let pgn = "[Event \"A\"]\n\n1. e4 e5 *\n[Event \"B\"]\n\n1. d4 *\n";
        let games = parse(pgn);
        assert_eq!(games.len(), 2);
        assert_eq!(games[1].tags.event.as_deref(), Some("B"));
        assert_eq!(games[1].moves, vec!["d4"]);
    }

    #[test]
    fn test_parse_wrapped_clock_comment_stays_in_game() {
        let pgn = "[Event \"A\"]\n\n1. e4 { good\n[%clk 0:02:59] } e5 2. Nf3 *\n";
        let games = parse(pgn);
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].moves, vec!["e4", "e5", "Nf3"]);
        assert!(games[0].parse_warning.is_none());
    }

    #[test]
    fn test_parse_keeps_header_only_game() {
        let games = parse("[Event \"Empty\"]\n[Result \"*\"]\n\n*\n");
        assert_eq!(games.len(), 1);
        assert!(games[0].moves.is_empty());
    }

    #[test]
    fn test_parse_drops_blank_input() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
    }

    #[test]
    fn test_parse_malformed_header_dropped_and_recorded() {
        let pgn = "[Event \"Ok\"]\n[Broken header\n[Site \"Here\"]\n\n1. e4 *";
        let games = parse(pgn);
        assert_eq!(games.len(), 1);

        let game = &games[0];
        assert_eq!(game.tags.event.as_deref(), Some("Ok"));
        assert_eq!(game.tags.site.as_deref(), Some("Here"));
        let warning = game.parse_warning.as_deref().unwrap();
        assert!(warning.contains("[Broken header"));
    }

    #[test]
    fn test_parse_extra_tags_keep_file_order() {
        let pgn = "[White \"W\"]\n[WhiteElo \"2700\"]\n[TimeControl \"180+2\"]\n[BlackElo \"2650\"]\n\n1. e4 *";
        let game = &parse(pgn)[0];
        let keys: Vec<&str> = game.extra.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["WhiteElo", "TimeControl", "BlackElo"]);
        assert_eq!(game.white_elo(), Some(2700));
    }

    #[test]
    fn test_parse_raw_slice_is_the_game_text() {
        let first = "[Event \"A\"]\n\n1. e4 e5 1-0";
        let second = "[Event \"B\"]\n\n1. d4 0-1";
        let text = format!("{first}\n\n{second}\n");
        let games = parse(&text);
        assert_eq!(games[0].raw, first);
        assert_eq!(games[1].raw, second);

        // Reparsing the raw slice gives the same game back.
        assert_eq!(parse(&games[0].raw)[0].moves, games[0].moves);
    }

    #[test]
    fn test_parse_eco_from_table_and_tag() {
        let pgn = "[Event \"A\"]\n\n1. e4 c5 2. Nf3 d6 *\n\n[Event \"B\"]\n[ECO \"C99\"]\n\n1. e4 c5 *";
        let games = parse(pgn);
        assert_eq!(games[0].eco.as_deref(), Some("B50"));
        assert_eq!(games[0].opening.as_deref(), Some("Sicilian Defense"));
        assert_eq!(games[1].eco.as_deref(), Some("C99"));
    }

    #[test]
    fn test_parse_movetext_spanning_lines() {
        let pgn = "[Event \"A\"]\n\n1. e4 e5\n2. Nf3 Nc6\n3. Bb5 1-0\n";
        let game = &parse(pgn)[0];
        assert_eq!(game.moves, vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]);
    }

    #[test]
    fn test_parse_crlf_line_endings() {
        let pgn = "[Event \"A\"]\r\n[Result \"0-1\"]\r\n\r\n1. d4 Nf6 0-1\r\n";
        let games = parse(pgn);
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].moves, vec!["d4", "Nf6"]);
    }

    #[test]
    fn test_clean_movetext_strips_annotations() {
        let moves = clean_movetext("1. e4! {Best by test} (1. d4 d5) e5?? $1 2. Nf3 1-0");
        assert_eq!(moves, vec!["e4", "e5", "Nf3"]);
    }

    #[test]
    fn test_clean_movetext_black_move_numbers() {
        assert_eq!(clean_movetext("12... Nf6 13.Bg5"), vec!["Nf6", "Bg5"]);
    }

    #[test]
    fn test_clean_movetext_castling_and_checks_preserved() {
        assert_eq!(
            clean_movetext("1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. O-O Nf6 5. Ng5+"),
            vec!["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5", "O-O", "Nf6", "Ng5+"]
        );
    }

    #[test]
    fn test_clean_movetext_nested_comment_leaks() {
        // Single non-recursive pass: the tail of the outer comment survives.
        let moves = clean_movetext("1. e4 { outer { inner } tail } e5");
        assert_eq!(moves, vec!["e4", "tail", "}", "e5"]);
    }

    #[test]
    fn test_clean_movetext_nested_variation_leaks() {
        let moves = clean_movetext("1. e4 (1. d4 (1. c4) d5) e5");
        assert_eq!(moves, vec!["e4", "d5)", "e5"]);
    }
}
