use crate::document::{Document, Value};
use crate::errors::{ErrorKind, FerriteError, FerriteResult};
use smallvec::SmallVec;

type Segments<'a> = SmallVec<[&'a str; 8]>;

fn split(path: &str) -> Segments<'_> {
    path.split('.').collect()
}

/// Returns the value in the document at the location specified by `path`.
///
/// Dots descend into nested documents, e.g. `"foo.bar.baz"`, and numbers
/// descend into arrays, e.g. `"foo.2.bar"`. Returns [Value::Missing] if
/// the location does not exist or the path is invalid.
pub fn get(doc: &Document, path: &str) -> Value {
    let (value, _) = get_in_document(doc, &split(path), false, false);
    value
}

/// Like [get], but additionally collects values from documents embedded
/// in arrays.
///
/// When descending into an array without a numeric segment, every element
/// is visited and the results are gathered into a new array; the returned
/// flag is `true` in that case. With `compact`, missing values are skipped
/// and intermediary arrays are flattened one level. With `merge`, a final
/// array of arrays is concatenated one level.
pub fn all(doc: &Document, path: &str, compact: bool, merge: bool) -> (Value, bool) {
    let (value, nested) = get_in_document(doc, &split(path), true, compact);
    if !nested || !merge {
        return (value, nested);
    }

    let Value::Array(array) = value else {
        return (value, nested);
    };

    // merge arrays
    let mut result = Vec::with_capacity(array.len());
    for item in array {
        match item {
            Value::Array(inner) => result.extend(inner),
            other => result.push(other),
        }
    }

    (Value::Array(result), nested)
}

// callers guarantee a non-empty path
fn get_in_document(doc: &Document, path: &[&str], collect: bool, compact: bool) -> (Value, bool) {
    if path[0].is_empty() {
        return (Value::Missing, false);
    }
    match doc.get(path[0]) {
        Some(child) => get_value(child, &path[1..], collect, compact),
        None => (Value::Missing, false),
    }
}

fn get_value(v: &Value, path: &[&str], collect: bool, compact: bool) -> (Value, bool) {
    // check path
    if path.is_empty() {
        return (v.clone(), false);
    }

    // check if empty
    if path[0].is_empty() {
        return (Value::Missing, false);
    }

    // get document field
    if let Value::Document(doc) = v {
        return get_in_document(doc, path, collect, compact);
    }

    // get array field
    if let Value::Array(arr) = v {
        // get indexed array element
        if let Ok(index) = path[0].parse::<usize>() {
            return match arr.get(index) {
                Some(item) => get_value(item, &path[1..], collect, compact),
                None => (Value::Missing, false),
            };
        }

        // collect values from embedded documents
        if collect {
            let mut res = Vec::with_capacity(arr.len());
            for item in arr {
                let (value, nested) = get_value(item, path, collect, compact);
                if value.is_missing() {
                    if !compact {
                        res.push(value);
                    }
                } else if nested && compact {
                    if let Value::Array(inner) = value {
                        res.extend(inner);
                    }
                } else {
                    res.push(value);
                }
            }
            return (Value::Array(res), true);
        }
    }

    (Value::Missing, false)
}

/// Stores `value` in the document at the location specified by `path`.
///
/// Intermediate document fields are created as needed. If `prepend` is
/// set, new keys are inserted at the beginning of their document instead
/// of the end. A numeric segment extends an existing array with nulls to
/// reach the index; where no array exists the segment becomes a document
/// key. Traversing an existing scalar fails.
pub fn put(doc: &mut Document, path: &str, value: Value, prepend: bool) -> FerriteResult<()> {
    if !put_in_document(doc, &split(path), value, prepend) {
        log::error!("cannot put value at {}", path);
        return Err(FerriteError::new(
            &format!("cannot put value at \"{}\"", path),
            ErrorKind::InvalidPath,
        ));
    }
    Ok(())
}

fn put_in_document(doc: &mut Document, path: &[&str], value: Value, prepend: bool) -> bool {
    // check if empty
    if path[0].is_empty() {
        return false;
    }

    // put existing field
    if let Some(child) = doc.get_mut(path[0]) {
        if path.len() == 1 {
            *child = value;
            return true;
        }
        return put_in_value(child, &path[1..], value, prepend);
    }

    // create missing field
    let scaffolded = if path.len() == 1 {
        Some(value)
    } else {
        scaffold(&path[1..], value)
    };
    match scaffolded {
        Some(v) => {
            if prepend {
                doc.insert_front(path[0], v);
            } else {
                doc.insert(path[0], v);
            }
            true
        }
        None => false,
    }
}

fn put_in_value(v: &mut Value, path: &[&str], value: Value, prepend: bool) -> bool {
    // check if empty
    if path[0].is_empty() {
        return false;
    }

    match v {
        Value::Document(doc) => put_in_document(doc, path, value, prepend),
        Value::Array(arr) => {
            let Ok(index) = path[0].parse::<usize>() else {
                return false;
            };

            // update existing element
            if index < arr.len() {
                if path.len() == 1 {
                    arr[index] = value;
                    return true;
                }
                return put_in_value(&mut arr[index], &path[1..], value, prepend);
            }

            // fill with null elements and append
            let scaffolded = if path.len() == 1 {
                Some(value)
            } else {
                scaffold(&path[1..], value)
            };
            match scaffolded {
                Some(v) => {
                    while arr.len() < index {
                        arr.push(Value::Null);
                    }
                    arr.push(v);
                    true
                }
                None => false,
            }
        }
        // traversing a scalar fails
        _ => false,
    }
}

// Builds nested single-field documents for the missing part of a path.
// Numeric segments become document keys here; arrays are only descended
// into when they already exist.
fn scaffold(path: &[&str], value: Value) -> Option<Value> {
    if path.is_empty() {
        return Some(value);
    }
    if path[0].is_empty() {
        return None;
    }
    let inner = scaffold(&path[1..], value)?;
    let mut doc = Document::new();
    doc.insert(path[0], inner);
    Some(Value::Document(doc))
}

/// Removes the value at the location in the document specified by `path`.
///
/// If the path addresses an array element, e.g. `"foo.2"`, the element is
/// set to null but not removed, so sibling positions are preserved.
/// Missing paths are no-ops.
pub fn unset(doc: &mut Document, path: &str) {
    unset_in_document(doc, &split(path));
}

fn unset_in_document(doc: &mut Document, path: &[&str]) {
    if path[0].is_empty() {
        return;
    }
    if path.len() == 1 {
        doc.remove(path[0]);
        return;
    }
    if let Some(child) = doc.get_mut(path[0]) {
        unset_in_value(child, &path[1..]);
    }
}

fn unset_in_value(v: &mut Value, path: &[&str]) {
    if path[0].is_empty() {
        return;
    }
    match v {
        Value::Document(doc) => unset_in_document(doc, path),
        Value::Array(arr) => {
            let Ok(index) = path[0].parse::<usize>() else {
                return;
            };
            if index >= arr.len() {
                return;
            }
            if path.len() == 1 {
                arr[index] = Value::Null;
            } else {
                unset_in_value(&mut arr[index], &path[1..]);
            }
        }
        _ => {}
    }
}

/// Adds `increment` to the numeric value at `path`.
///
/// A missing field stores the increment as-is. The wider operand type
/// wins: int32 + int64 yields int64, anything + float64 yields float64.
/// A non-numeric field or increment fails.
pub fn increment(doc: &mut Document, path: &str, increment: &Value) -> FerriteResult<()> {
    let field = get(doc, path);

    let updated = match field {
        Value::I32(num) => match increment {
            Value::I32(inc) => Value::I32(num.wrapping_add(*inc)),
            Value::I64(inc) => Value::I64((num as i64).wrapping_add(*inc)),
            Value::F64(inc) => Value::F64(num as f64 + inc),
            _ => return Err(not_a_number("increment")),
        },
        Value::I64(num) => match increment {
            Value::I32(inc) => Value::I64(num.wrapping_add(*inc as i64)),
            Value::I64(inc) => Value::I64(num.wrapping_add(*inc)),
            Value::F64(inc) => Value::F64(num as f64 + inc),
            _ => return Err(not_a_number("increment")),
        },
        Value::F64(num) => match increment {
            Value::I32(inc) => Value::F64(num + *inc as f64),
            Value::I64(inc) => Value::F64(num + *inc as f64),
            Value::F64(inc) => Value::F64(num + inc),
            _ => return Err(not_a_number("increment")),
        },
        Value::Missing => {
            if increment.is_number() {
                increment.clone()
            } else {
                return Err(not_a_number("increment"));
            }
        }
        _ => {
            log::error!("incrementee \"{}\" is not a number", path);
            return Err(FerriteError::new(
                &format!("incrementee \"{}\" is not a number", path),
                ErrorKind::InvalidDataType,
            ));
        }
    };

    put(doc, path, updated, false)
}

/// Multiplies the numeric value at `path` with `multiplier`.
///
/// A missing field stores a zero of the multiplier's type. The wider
/// operand type wins, as in [increment]. A non-numeric field or
/// multiplier fails.
pub fn multiply(doc: &mut Document, path: &str, multiplier: &Value) -> FerriteResult<()> {
    let field = get(doc, path);

    let updated = match field {
        Value::I32(num) => match multiplier {
            Value::I32(mul) => Value::I32(num.wrapping_mul(*mul)),
            Value::I64(mul) => Value::I64((num as i64).wrapping_mul(*mul)),
            Value::F64(mul) => Value::F64(num as f64 * mul),
            _ => return Err(not_a_number("multiplier")),
        },
        Value::I64(num) => match multiplier {
            Value::I32(mul) => Value::I64(num.wrapping_mul(*mul as i64)),
            Value::I64(mul) => Value::I64(num.wrapping_mul(*mul)),
            Value::F64(mul) => Value::F64(num as f64 * mul),
            _ => return Err(not_a_number("multiplier")),
        },
        Value::F64(num) => match multiplier {
            Value::I32(mul) => Value::F64(num * *mul as f64),
            Value::I64(mul) => Value::F64(num * *mul as f64),
            Value::F64(mul) => Value::F64(num * mul),
            _ => return Err(not_a_number("multiplier")),
        },
        Value::Missing => match multiplier {
            Value::I32(_) => Value::I32(0),
            Value::I64(_) => Value::I64(0),
            Value::F64(_) => Value::F64(0.0),
            _ => return Err(not_a_number("multiplier")),
        },
        _ => {
            log::error!("multiplicand \"{}\" is not a number", path);
            return Err(FerriteError::new(
                &format!("multiplicand \"{}\" is not a number", path),
                ErrorKind::InvalidDataType,
            ));
        }
    };

    put(doc, path, updated, false)
}

fn not_a_number(operand: &str) -> FerriteError {
    log::error!("{} is not a number", operand);
    FerriteError::new(
        &format!("{} is not a number", operand),
        ErrorKind::InvalidDataType,
    )
}
