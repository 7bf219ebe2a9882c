//! Command implementations, one module per subcommand family.

pub mod download;
pub mod process;
pub mod report;
pub mod scrape;
pub mod stats;
