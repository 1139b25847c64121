//! lenettoyage - Response Sanitization
//!
//! *Le Nettoyage* (The Cleanup) - Strips embedding vectors and heavy fields
//! from knowledge-graph results before they cross the HTTP boundary

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Untyped result value model
pub mod value;

/// Recursive embedding/heavy-field sanitizer
pub mod sanitize;

pub use sanitize::{
    is_embedding, is_heavy_key, sanitize, sanitize_each, sanitize_or_empty_mapping,
    sanitize_or_empty_sequence, EMBEDDING_MIN_LEN, EMBEDDING_SAMPLE_LEN,
};
pub use value::{AttributedObject, Fields, ResultValue};
