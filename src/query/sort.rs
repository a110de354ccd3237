use crate::document::{compare, path, Doc, Document};
use crate::errors::{ErrorKind, FerriteError, FerriteResult};
use std::cmp::Ordering;

/// A sort or index column: a document path and a direction.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Column {
    /// The path of the document field.
    pub path: String,
    /// Whether the ordering is reversed (descending).
    pub reverse: bool,
}

impl Column {
    pub fn new(path: &str, reverse: bool) -> Self {
        Column {
            path: path.to_string(),
            reverse,
        }
    }
}

/// Builds columns from a sort or index key specification.
///
/// The specification is a document of `path: direction` pairs where the
/// direction is `1` (ascending) or `-1` (descending); pair order is
/// preserved. Any other direction value is rejected.
pub fn columns(spec: &Document) -> FerriteResult<Vec<Column>> {
    let mut columns = Vec::with_capacity(spec.len());
    for (path, direction) in spec.iter() {
        let reverse = match direction.as_i32().map(i64::from).or(direction.as_i64()) {
            Some(1) => false,
            Some(-1) => true,
            _ => {
                log::error!("expected 1 or -1 as sort direction for \"{}\"", path);
                return Err(FerriteError::new(
                    &format!("expected 1 or -1 as sort direction for \"{}\"", path),
                    ErrorKind::InvalidDataType,
                ));
            }
        };
        columns.push(Column {
            path: path.clone(),
            reverse,
        });
    }
    Ok(columns)
}

/// Returns the order of two documents based on the specified columns.
///
/// Columns apply in the given order; a reversed column flips the result
/// of the value comparison. Documents equal under every column compare
/// equal.
pub fn order(left: &Document, right: &Document, columns: &[Column]) -> Ordering {
    for column in columns {
        // get values
        let a = path::get(left, &column.path);
        let b = path::get(right, &column.path);

        // compare values
        let res = compare(&a, &b);
        if res == Ordering::Equal {
            continue;
        }

        if column.reverse {
            return res.reverse();
        }
        return res;
    }

    Ordering::Equal
}

/// Stably sorts the list of document handles by the specified columns.
pub fn sort(list: &mut [Doc], columns: &[Column]) {
    list.sort_by(|a, b| order(a, b, columns));
}

/// Returns a sorted copy of the list according to a sort specification.
pub fn sorted(list: &[Doc], spec: &Document) -> FerriteResult<Vec<Doc>> {
    let columns = columns(spec)?;
    let mut list = list.to_vec();
    sort(&mut list, &columns);
    Ok(list)
}
