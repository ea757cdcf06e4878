//! Core engine: identity matching, quote grouping and the scan pipeline.

pub mod matcher;
pub mod quotes;
pub mod scanner;
