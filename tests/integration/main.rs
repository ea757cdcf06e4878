//! End-to-end scan tests over in-memory data sources.

mod mock_sources;
mod pipeline;
