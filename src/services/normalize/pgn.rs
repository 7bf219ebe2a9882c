//! PGN game splitting and header rewriting.

use chrono::NaiveDate;

const EVENT_TAG: &str = "[Event ";
const DATE_TAG: &str = "[Date ";
const WHITE_TAG: &str = "[White ";
const BLACK_TAG: &str = "[Black ";

/// Split a PGN text into games.
///
/// A game starts at each `[Event ` line; text before the first one is kept
/// with the first game. Whitespace-only chunks are dropped, as is a leading
/// byte order mark.
pub fn split_games(text: &str) -> Vec<String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut games = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let starts_game = line.trim_start().starts_with(EVENT_TAG);
        if starts_game && current.iter().any(|l| l.trim_start().starts_with(EVENT_TAG)) {
            push_game(&mut games, &current);
            current.clear();
        }
        current.push(line);
    }
    push_game(&mut games, &current);

    games
}

fn push_game(games: &mut Vec<String>, lines: &[&str]) {
    if lines.iter().any(|l| !l.trim().is_empty()) {
        games.push(lines.join("\n").trim().to_string());
    }
}

/// Rewrite one game's header block for the archive.
///
/// Inside the header block (up to the first blank line after the first tag):
/// - `[Event …]` becomes `[Event "Lc0 match <id>"]`, inserted at the top if absent
/// - `[White …]` and `[Black …]` become `label`
/// - `[Date "<YYYY-MM-DD>"]` follows the Event tag when no Date tag exists
///
/// Everything else, including all move text, passes through unchanged.
pub fn rewrite_game(game: &str, match_id: i64, date: NaiveDate, label: &str) -> String {
    let lines: Vec<&str> = game.lines().collect();
    let header_end = header_block_end(&lines);
    let header = &lines[..header_end];

    let has_event = header.iter().any(|l| l.trim_start().starts_with(EVENT_TAG));
    let has_date = header.iter().any(|l| l.trim_start().starts_with(DATE_TAG));

    let event_line = format!("[Event \"Lc0 match {}\"]", match_id);
    let date_line = format!("[Date \"{}\"]", date.format("%Y-%m-%d"));
    let player = |tag: &str| format!("[{} \"{}\"]", tag, label);

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 2);
    if !has_event {
        out.push(event_line.clone());
        if !has_date {
            out.push(date_line.clone());
        }
    }

    for line in header {
        let tag = line.trim_start();
        if tag.starts_with(EVENT_TAG) {
            out.push(event_line.clone());
            if !has_date {
                out.push(date_line.clone());
            }
        } else if tag.starts_with(WHITE_TAG) {
            out.push(player("White"));
        } else if tag.starts_with(BLACK_TAG) {
            out.push(player("Black"));
        } else {
            out.push(line.to_string());
        }
    }

    out.extend(lines[header_end..].iter().map(|l| l.to_string()));
    out.join("\n")
}

/// Index of the first line after the header block.
fn header_block_end(lines: &[&str]) -> usize {
    let mut seen_tag = false;
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            seen_tag = true;
        } else if trimmed.is_empty() && seen_tag {
            return i;
        }
    }
    lines.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, 15).unwrap()
    }

    #[test]
    fn test_split_games_on_event_tags() {
        let text = "[Event \"a\"]\n[White \"x\"]\n\n1. e4 e5 1-0\n\n[Event \"b\"]\n\n1. d4 0-1\n\n\n";
        let games = split_games(text);
        assert_eq!(games.len(), 2);
        assert_eq!(games[0], "[Event \"a\"]\n[White \"x\"]\n\n1. e4 e5 1-0");
        assert_eq!(games[1], "[Event \"b\"]\n\n1. d4 0-1");
    }

    #[test]
    fn test_split_games_without_event_tag() {
        let games = split_games("[White \"x\"]\n\n1. e4 *\n");
        assert_eq!(games, vec!["[White \"x\"]\n\n1. e4 *"]);
        assert!(split_games("  \n\n").is_empty());
    }

    #[test]
    fn test_split_games_ignores_byte_order_mark() {
        let text = "\u{feff}[Event \"a\"]\n[White \"x\"]\n\n1. e4 1-0\n\n[Event \"b\"]\n[Black \"y\"]\n\n1. d4 0-1\n";
        let games = split_games(text);
        assert_eq!(games.len(), 2);
        assert!(games[0].starts_with("[Event \"a\"]"));

        let rewritten = rewrite_game(&games[1], 4, date(), "v0.27.0");
        assert!(rewritten.starts_with("[Event \"Lc0 match 4\"]"));
        assert!(rewritten.contains("[Black \"v0.27.0\"]"));
        assert_eq!(rewritten.matches("[Event ").count(), 1);
    }
}
