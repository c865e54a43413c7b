//! The search engine: content repositories, keyword and semantic engines,
//! result grouping and the orchestrator tying them together.

pub mod aggregate;
pub mod bm25;
pub mod content;
pub mod keyword;
pub mod orchestrator;
pub mod semantic;
pub mod vector;
