//! Recursive response sanitizer
//!
//! Walks a [`ResultValue`] depth-first and rebuilds it without embedding
//! vectors or heavy/internal fields. The walk borrows its input and never
//! fails: every value is either passed through, rebuilt, or dropped.
//!
//! Precedence for each value:
//!
//! 1. embedding-shaped sequence → absent
//! 2. mapping → mapping with heavy keys removed
//! 3. attributed object → mapping of its attributes, heavy keys removed
//! 4. sequence → sequence of sanitized elements, absent ones omitted
//! 5. scalar → unchanged
//!
//! "Absent" is `None`. The null scalar is a present value and is kept.

use crate::value::{Fields, ResultValue};

/// Minimum length for a numeric sequence to count as an embedding
pub const EMBEDDING_MIN_LEN: usize = 32;

/// Number of leading elements inspected by the embedding heuristic
pub const EMBEDDING_SAMPLE_LEN: usize = 64;

/// Keys dropped on exact (case-insensitive) match
const DENYLISTED_KEYS: &[&str] = &["name_embedding", "fact_embedding"];

/// Keys treated as opaque and dropped without inspecting their content
const OPAQUE_KEYS: &[&str] = &["attributes"];

/// Whether `value` looks like an embedding vector
///
/// A sequence of at least [`EMBEDDING_MIN_LEN`] elements whose first
/// [`EMBEDDING_SAMPLE_LEN`] elements are all integers or floats.
pub fn is_embedding(value: &ResultValue) -> bool {
    value.as_sequence().is_some_and(is_embedding_slice)
}

fn is_embedding_slice(items: &[ResultValue]) -> bool {
    items.len() >= EMBEDDING_MIN_LEN
        && items
            .iter()
            .take(EMBEDDING_SAMPLE_LEN)
            // Booleans are not numbers here, so a long list of flags is kept.
            .all(ResultValue::is_numeric)
}

/// Whether a mapping key names a heavy or internal field
pub fn is_heavy_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    lowered.contains("embedding")
        || DENYLISTED_KEYS.contains(&lowered.as_str())
        || OPAQUE_KEYS.contains(&key)
}

/// Sanitize a value
///
/// Returns `None` when the value itself is embedding-shaped, including at
/// the top level. Callers that must serialize something should use
/// [`sanitize_or_empty_sequence`] or [`sanitize_or_empty_mapping`].
pub fn sanitize(value: &ResultValue) -> Option<ResultValue> {
    if is_embedding(value) {
        return None;
    }

    match value {
        ResultValue::Mapping(fields) => Some(ResultValue::Mapping(sanitize_fields(fields))),
        ResultValue::Object(object) => {
            Some(ResultValue::Mapping(sanitize_fields(object.attributes())))
        }
        ResultValue::Sequence(items) => sanitize_sequence(items),
        scalar => Some(scalar.clone()),
    }
}

fn sanitize_fields(fields: &Fields) -> Fields {
    fields
        .iter()
        .filter(|(key, _)| !is_heavy_key(key))
        .filter_map(|(key, value)| sanitize(value).map(|clean| (key, clean)))
        .collect()
}

fn sanitize_sequence(items: &[ResultValue]) -> Option<ResultValue> {
    let cleaned: Vec<ResultValue> = items.iter().filter_map(sanitize).collect();

    // Dropping nested vectors can leave a purely numeric sequence behind.
    if is_embedding_slice(&cleaned) {
        return None;
    }

    Some(ResultValue::Sequence(cleaned))
}

/// Sanitize, substituting an empty sequence for an absent result
pub fn sanitize_or_empty_sequence(value: &ResultValue) -> ResultValue {
    sanitize(value).unwrap_or_else(|| ResultValue::Sequence(Vec::new()))
}

/// Sanitize, substituting an empty mapping for an absent result
pub fn sanitize_or_empty_mapping(value: &ResultValue) -> ResultValue {
    sanitize(value).unwrap_or_else(|| ResultValue::Mapping(Fields::new()))
}

/// Sanitize each value of a result list, omitting absent ones
pub fn sanitize_each(values: &[ResultValue]) -> Vec<ResultValue> {
    values.iter().filter_map(sanitize).collect()
}
