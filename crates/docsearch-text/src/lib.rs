//! docsearch-text
//!
//! Tantivy-backed full-text index: lifecycle of the writer and snapshots,
//! the indexing pipeline, query compilation and highlighted results.
pub mod schema;
pub mod lifecycle;
pub mod index;
pub mod query;
pub mod highlight;
pub mod search;

pub use index::{project, TextIndex};
pub use lifecycle::{HandleStatus, IndexLocation, IndexManager, IndexSnapshot};
pub use query::{CompiledQuery, QueryCompiler, QueryPlan};
