//! C7 — relational + FTS + vector store (spec.md §4.6). `schema` owns the
//! sqlite connection and forward-only migrations; `relational` gives
//! typed accessors over every table; `fts` and `vectors` layer the FTS5
//! and brute-force cosine search C8 needs on top of the same connection.

pub mod fts;
pub mod relational;
pub mod schema;
pub mod vectors;

pub use relational::Store;
pub use schema::CURRENT_SCHEMA_VERSION;
