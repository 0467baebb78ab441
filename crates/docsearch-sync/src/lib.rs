pub mod service;

pub use service::{DocumentService, ReindexOutcome};
