//! Match listing page parser.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::models::CatalogEntry;

const ROW_SELECTOR: &str = "table.table tbody tr";

/// Extract catalog entries from one listing page.
///
/// The id comes from the link in the first cell (or the cell text when there
/// is no link); the last cell holds the match timestamp. Rows that do not
/// yield a positive numeric id and a non-empty timestamp are skipped.
pub fn parse_listing(html: &str) -> Vec<CatalogEntry> {
    let document = Html::parse_document(html);

    let (rows, cells, links) = match (
        Selector::parse(ROW_SELECTOR),
        Selector::parse("td"),
        Selector::parse("a"),
    ) {
        (Ok(rows), Ok(cells), Ok(links)) => (rows, cells, links),
        _ => {
            warn!("Failed to build listing selectors");
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for row in document.select(&rows) {
        let tds: Vec<ElementRef> = row.select(&cells).collect();
        if tds.len() < 2 {
            continue;
        }

        let id_text = match tds[0].select(&links).next() {
            Some(link) => cell_text(link),
            None => cell_text(tds[0]),
        };
        let occurred_at = cell_text(tds[tds.len() - 1]);

        let id = match id_text.parse::<i64>() {
            Ok(id) if id > 0 => id,
            _ => {
                debug!("Skipping listing row with id {:?}", id_text);
                continue;
            }
        };
        if occurred_at.is_empty() {
            debug!("Skipping match {} with empty timestamp", id);
            continue;
        }

        entries.push(CatalogEntry::new(id, occurred_at));
    }

    entries
}

fn cell_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
