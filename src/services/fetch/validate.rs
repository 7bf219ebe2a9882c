//! Structural checks on downloaded payloads.

use super::layout::PayloadKind;
use crate::services::normalize::archive::extract_pgn_members;

/// How many leading bytes of a plain payload are searched for PGN tags.
const PLAIN_SNIFF_LEN: usize = 500;

/// Tags that mark the start of a PGN game.
const PGN_MARKERS: [&str; 2] = ["[Event", "[White"];

/// Accept or reject a payload fetched from a candidate of the given kind.
///
/// Archives must decompress and untar completely and hold at least one
/// `.pgn` member. Plain payloads must show a PGN tag near the start.
pub fn validate_payload(content: &[u8], kind: PayloadKind) -> Result<(), String> {
    match kind {
        PayloadKind::Archive => match extract_pgn_members(content) {
            Ok(members) if members.is_empty() => Err("archive holds no .pgn files".to_string()),
            Ok(_) => Ok(()),
            Err(e) => Err(format!("corrupt archive: {}", e)),
        },
        PayloadKind::Plain => {
            let head = &content[..content.len().min(PLAIN_SNIFF_LEN)];
            let text = String::from_utf8_lossy(head);
            if PGN_MARKERS.iter().any(|marker| text.contains(marker)) {
                Ok(())
            } else {
                Err(format!("no PGN tags in first {} bytes", PLAIN_SNIFF_LEN))
            }
        }
    }
}
