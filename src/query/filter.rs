use crate::document::{path, Doc, Document};
use crate::errors::FerriteResult;
use crate::query::matcher;

/// Runs the matcher over each document and keeps the matches in order.
///
/// With a positive `limit` the scan short-circuits after that many
/// matches.
pub fn filter(list: &[Doc], query: &Document, limit: usize) -> FerriteResult<Vec<Doc>> {
    let mut matched = Vec::new();
    for doc in list {
        if matcher::matches(doc, query)? {
            matched.push(doc.clone());
            if limit > 0 && matched.len() >= limit {
                break;
            }
        }
    }
    Ok(matched)
}

/// Derives a seed document from the pure equality conjuncts of a query.
///
/// For each top-level `(path, value)` pair where the value is not an
/// operator document and the path contains no `$`, the value is written
/// at the path in the seed. Everything else is ignored. Used to
/// synthesize the inserted document on upsert.
pub fn extract(query: &Document) -> FerriteResult<Document> {
    let mut seed = Document::new();

    for (key, value) in query.iter() {
        // skip operators and paths containing operators
        if key.contains('$') {
            continue;
        }

        // skip operator documents
        if let Some(doc) = value.as_document() {
            let is_operator_doc = doc
                .iter()
                .next()
                .map(|(k, _)| k.starts_with('$'))
                .unwrap_or(false);
            if is_operator_doc {
                continue;
            }
        }

        path::put(&mut seed, key, value.clone(), false)?;
    }

    Ok(seed)
}
