//! Knowledge base and retrieval engine for heliolab.
//!
//! `corpus` holds the fixed PV testing reference catalogue, loaded once at
//! process start and shared read-only. `retrieval` ranks corpus entries
//! against a query by lexical overlap.

pub mod corpus;
pub mod retrieval;

pub use corpus::Corpus;
pub use retrieval::RetrievalEngine;
