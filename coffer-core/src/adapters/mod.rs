//! Adapter implementations
//!
//! Adapters implement the repository ports with concrete technologies:
//! - DuckDB for durable single-file storage
//! - An in-memory store for tests, demo mode, and embedding

pub mod duckdb;
pub mod memory;
