//! Core engine — enrichment, filtering, ranking and the run pipeline.

pub mod enricher;
pub mod filter;
pub mod ranker;
pub mod pipeline;
