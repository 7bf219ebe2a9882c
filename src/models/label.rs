//! Era-based canonical labels for engine participants.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Version assumed for matches on or after `since`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelThreshold {
    pub since: NaiveDate,
    pub version: String,
}

/// Ordered table mapping match dates to engine versions.
///
/// Thresholds are kept most recent first; the first threshold a date reaches
/// wins. Dates older than every threshold (or unparseable) get `fallback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTable {
    thresholds: Vec<LabelThreshold>,
    fallback: String,
}

impl LabelTable {
    /// Build a table; thresholds are sorted most recent first.
    pub fn new(mut thresholds: Vec<LabelThreshold>, fallback: impl Into<String>) -> Self {
        thresholds.sort_by(|a, b| b.since.cmp(&a.since));
        Self {
            thresholds,
            fallback: fallback.into(),
        }
    }

    /// Engine version for a match date.
    pub fn version_for(&self, date: Option<NaiveDate>) -> &str {
        let Some(date) = date else {
            return &self.fallback;
        };
        self.thresholds
            .iter()
            .find(|t| date >= t.since)
            .map(|t| t.version.as_str())
            .unwrap_or(&self.fallback)
    }

    /// Display name substituted for both players, e.g. `Lc0 v0.27.0`.
    pub fn participant_label(&self, date: Option<NaiveDate>) -> String {
        format!("Lc0 {}", self.version_for(date))
    }

    pub fn thresholds(&self) -> &[LabelThreshold] {
        &self.thresholds
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        let table = [
            ((2025, 1, 1), "v0.32.0"),
            ((2024, 6, 1), "v0.31.0"),
            ((2023, 7, 1), "v0.30.0"),
            ((2023, 1, 1), "v0.29.0"),
            ((2022, 1, 1), "v0.28.0"),
            ((2021, 1, 1), "v0.27.0"),
            ((2020, 1, 1), "v0.26.0"),
            ((2019, 1, 1), "v0.25.0"),
            ((2018, 1, 1), "v0.24.0"),
            ((1970, 1, 1), "v0.23.0"),
        ];
        let thresholds = table
            .into_iter()
            .filter_map(|((y, m, d), version)| {
                NaiveDate::from_ymd_opt(y, m, d).map(|since| LabelThreshold {
                    since,
                    version: version.to_string(),
                })
            })
            .collect();
        Self::new(thresholds, "v0.21.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_default_table_boundaries() {
        let table = LabelTable::default();
        assert_eq!(table.version_for(date(2025, 3, 1)), "v0.32.0");
        assert_eq!(table.version_for(date(2024, 12, 31)), "v0.31.0");
        assert_eq!(table.version_for(date(2024, 6, 1)), "v0.31.0");
        assert_eq!(table.version_for(date(2023, 6, 30)), "v0.29.0");
        assert_eq!(table.version_for(date(2021, 3, 15)), "v0.27.0");
        assert_eq!(table.version_for(date(2017, 12, 31)), "v0.23.0");
    }

    #[test]
    fn test_fallback_for_missing_or_ancient_dates() {
        let table = LabelTable::default();
        assert_eq!(table.version_for(None), "v0.21.0");
        assert_eq!(table.version_for(date(1969, 7, 20)), "v0.21.0");
    }

    #[test]
    fn test_unsorted_thresholds_are_ordered() {
        let table = LabelTable::new(
            vec![
                LabelThreshold {
                    since: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
                    version: "old".to_string(),
                },
                LabelThreshold {
                    since: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                    version: "new".to_string(),
                },
            ],
            "ancient",
        );
        assert_eq!(table.version_for(date(2023, 1, 1)), "new");
        assert_eq!(table.version_for(date(2020, 1, 1)), "old");
        assert_eq!(table.participant_label(date(2018, 1, 1)), "Lc0 ancient");
    }
}
