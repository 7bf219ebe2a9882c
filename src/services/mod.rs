//! Service layer for lc0acquire business logic.
//!
//! This module contains domain logic separated from UI concerns.
//! The CLI drives these services and renders their events.

pub mod fetch;
pub mod normalize;

pub use fetch::{FetchConfig, FetchEvent, FetchResult, FetchService};
pub use normalize::{NormalizeConfig, NormalizeResult, NormalizeService};
