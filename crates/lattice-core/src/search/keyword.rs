//! Keyword Search (FTS5 query building)
//!
//! User text must never reach FTS5 unescaped: quotes, `*`, `-`, `NEAR` and
//! column filters are all query syntax. Each alphanumeric term is quoted and
//! the terms are OR-ed, so any term may match and BM25 ranks documents that
//! match more of them higher.

/// Maximum number of terms kept from a query
pub const MAX_QUERY_TERMS: usize = 32;

/// Split text into lowercase alphanumeric terms, deduplicated in order
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in query.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let term = word.to_lowercase();
        if !terms.contains(&term) {
            terms.push(term);
        }
        if terms.len() == MAX_QUERY_TERMS {
            break;
        }
    }
    terms
}

/// Whether `text` contains at least one searchable term
pub fn has_query_terms(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|word| !word.is_empty())
}

/// Build a safe FTS5 MATCH expression from free text
///
/// Returns an empty string when the text has no searchable terms; callers
/// treat that as "no matches" rather than issuing the query.
pub fn sanitize_fts5_query(query: &str) -> String {
    query_terms(query)
        .iter()
        .map(|term| format!("\"{}\"", term))
        .collect::<Vec<_>>()
        .join(" OR ")
}
