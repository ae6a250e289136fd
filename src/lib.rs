//! Population dashboard core: boundary datasets, filtering, statistics,
//! upload comparison and the trend store.

pub mod config;
pub mod data;
pub mod error;
pub mod store;
