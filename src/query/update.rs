use crate::document::{compare, path, Document, TimestampGenerator, Value};
use crate::errors::{ErrorKind, FerriteError, FerriteResult};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

fn apply_error(message: &str) -> FerriteError {
    log::error!("{}", message);
    FerriteError::new(message, ErrorKind::OperatorError)
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Applies an update document to a document.
///
/// Every top-level key of the update must be an operator (`$set`,
/// `$setOnInsert`, `$unset`, `$rename`, `$inc`, `$mul`, `$min`, `$max`,
/// `$currentDate`); each operator carries a document of `path: operand`
/// pairs. Operators apply in the order given; two writes to the same path
/// within one update are a conflict and fail the whole update.
///
/// `$setOnInsert` only takes effect when `upsert` is set; otherwise the
/// operator is skipped.
pub fn apply(doc: &mut Document, update: &Document, upsert: bool) -> FerriteResult<()> {
    let mut changed: HashSet<String> = HashSet::new();

    for (operator, operand) in update.iter() {
        // check operator
        if !operator.starts_with('$') {
            return Err(apply_error(&format!(
                "apply: expected operator, got \"{}\"",
                operator
            )));
        }

        // check operand
        let Some(pairs) = operand.as_document() else {
            return Err(apply_error("apply: operator expected document"));
        };

        for (field, argument) in pairs.iter() {
            apply_operator(doc, operator, field, argument, upsert, &mut changed)?;
        }
    }

    Ok(())
}

fn apply_operator(
    doc: &mut Document,
    operator: &str,
    field: &str,
    argument: &Value,
    upsert: bool,
    changed: &mut HashSet<String>,
) -> FerriteResult<()> {
    match operator {
        "$set" => {
            claim(changed, field)?;
            path::put(doc, field, argument.clone(), false)
        }
        "$setOnInsert" => {
            // only applied when inserting via upsert
            if upsert {
                claim(changed, field)?;
                path::put(doc, field, argument.clone(), false)?;
            }
            Ok(())
        }
        "$unset" => {
            claim(changed, field)?;
            path::unset(doc, field);
            Ok(())
        }
        "$rename" => apply_rename(doc, field, argument, changed),
        "$inc" => {
            claim(changed, field)?;
            path::increment(doc, field, argument)
        }
        "$mul" => {
            claim(changed, field)?;
            path::multiply(doc, field, argument)
        }
        "$min" => {
            claim(changed, field)?;
            let current = path::get(doc, field);
            if current.is_missing() || compare(argument, &current) == Ordering::Less {
                path::put(doc, field, argument.clone(), false)?;
            }
            Ok(())
        }
        "$max" => {
            claim(changed, field)?;
            let current = path::get(doc, field);
            if current.is_missing() || compare(argument, &current) == Ordering::Greater {
                path::put(doc, field, argument.clone(), false)?;
            }
            Ok(())
        }
        "$currentDate" => {
            claim(changed, field)?;
            apply_current_date(doc, field, argument)
        }
        _ => Err(apply_error(&format!(
            "apply: unknown operator \"{}\"",
            operator
        ))),
    }
}

fn claim(changed: &mut HashSet<String>, field: &str) -> FerriteResult<()> {
    if !changed.insert(field.to_string()) {
        return Err(apply_error(&format!(
            "apply: conflicting update at path \"{}\"",
            field
        )));
    }
    Ok(())
}

fn apply_rename(
    doc: &mut Document,
    source: &str,
    argument: &Value,
    changed: &mut HashSet<String>,
) -> FerriteResult<()> {
    let Some(target) = argument.as_str() else {
        return Err(apply_error(&format!(
            "apply: $rename: expected string target for \"{}\"",
            source
        )));
    };

    if source == target {
        return Err(apply_error(&format!(
            "apply: $rename: source and target must differ for \"{}\"",
            source
        )));
    }

    if path_traverses_array(doc, source) || path_traverses_array(doc, target) {
        return Err(apply_error(&format!(
            "apply: $rename: path through array for \"{}\"",
            source
        )));
    }

    claim(changed, source)?;
    claim(changed, target)?;

    // a missing source is a no-op
    let value = path::get(doc, source);
    if value.is_missing() {
        return Ok(());
    }

    path::unset(doc, source);
    path::put(doc, target, value, false)
}

// A rename may not move values into or out of arrays: no proper prefix
// of the path may resolve to an array.
fn path_traverses_array(doc: &Document, full_path: &str) -> bool {
    let segments: Vec<&str> = full_path.split('.').collect();
    for end in 1..segments.len() {
        let prefix = segments[..end].join(".");
        if path::get(doc, &prefix).is_array() {
            return true;
        }
    }
    false
}

fn apply_current_date(doc: &mut Document, field: &str, argument: &Value) -> FerriteResult<()> {
    match argument {
        Value::Bool(_) => path::put(doc, field, Value::DateTime(now_millis()), false),
        Value::Document(spec) => {
            if spec.len() != 1 || !spec.contains_key("$type") {
                return Err(apply_error(
                    "apply: $currentDate: expected document with a single $type field",
                ));
            }
            match spec.get("$type").and_then(|v| v.as_str()) {
                Some("date") => path::put(doc, field, Value::DateTime(now_millis()), false),
                Some("timestamp") => path::put(
                    doc,
                    field,
                    Value::Timestamp(TimestampGenerator::global().generate()),
                    false,
                ),
                _ => Err(apply_error(
                    "apply: $currentDate: expected $type 'date' or 'timestamp'",
                )),
            }
        }
        _ => Err(apply_error(
            "apply: $currentDate: expected boolean or document",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{doc, val};

    #[test]
    fn empty_update_is_a_noop() {
        let mut doc = doc! { "foo": "bar" };
        apply(&mut doc, &doc! {}, false).unwrap();
        assert_eq!(doc, doc! { "foo": "bar" });
    }

    #[test]
    fn rejects_non_operator_keys() {
        let mut doc = doc! { "foo": "bar" };
        let err = apply(&mut doc, &doc! { "foo": "baz" }, false).unwrap_err();
        assert_eq!(err.message(), "apply: expected operator, got \"foo\"");
    }

    #[test]
    fn rejects_unknown_operators() {
        let mut doc = doc! { "foo": "bar" };
        let err = apply(&mut doc, &doc! { "$foo": doc! { "a": 1 } }, false).unwrap_err();
        assert_eq!(err.message(), "apply: unknown operator \"$foo\"");
    }

    #[test]
    fn rejects_non_document_operands() {
        let mut doc = doc! { "foo": "bar" };
        let err = apply(&mut doc, &doc! { "$set": "bar" }, false).unwrap_err();
        assert_eq!(err.message(), "apply: operator expected document");
    }

    #[test]
    fn set_replaces_and_adds_values() {
        let mut doc = doc! { "foo": "bar" };
        apply(&mut doc, &doc! { "$set": doc! { "foo": "baz" } }, false).unwrap();
        assert_eq!(doc, doc! { "foo": "baz" });

        apply(
            &mut doc,
            &doc! { "$set": doc! { "quz.qux": 42 } },
            false,
        )
        .unwrap();
        assert_eq!(path::get(&doc, "quz.qux"), val!(42));
    }

    #[test]
    fn set_on_insert_only_applies_in_upsert_mode() {
        let mut doc = doc! { "foo": "bar" };
        apply(&mut doc, &doc! { "$setOnInsert": doc! { "n": 1 } }, false).unwrap();
        assert!(path::get(&doc, "n").is_missing());

        apply(&mut doc, &doc! { "$setOnInsert": doc! { "n": 1 } }, true).unwrap();
        assert_eq!(path::get(&doc, "n"), val!(1));
    }

    #[test]
    fn unset_removes_nested_values() {
        let mut doc = doc! { "foo": doc! { "bar": "baz" } };
        apply(&mut doc, &doc! { "$unset": doc! { "foo.bar": Value::Null } }, false).unwrap();
        assert_eq!(doc, doc! { "foo": doc! {} });

        let mut doc = doc! { "foo": doc! { "bar": "baz" } };
        apply(&mut doc, &doc! { "$unset": doc! { "foo": Value::Null } }, false).unwrap();
        assert_eq!(doc, doc! {});
    }

    #[test]
    fn rename_moves_values() {
        let mut doc = doc! { "foo": doc! { "bar": "baz" } };
        apply(
            &mut doc,
            &doc! { "$rename": doc! { "foo.bar": "foo.baz" } },
            false,
        )
        .unwrap();
        assert_eq!(doc, doc! { "foo": doc! { "baz": "baz" } });

        let mut doc = doc! { "foo": doc! { "bar": "baz" } };
        apply(&mut doc, &doc! { "$rename": doc! { "foo": "bar" } }, false).unwrap();
        assert_eq!(doc, doc! { "bar": doc! { "bar": "baz" } });
    }

    #[test]
    fn rename_rejects_identical_paths_and_arrays() {
        let mut doc = doc! { "foo": "bar", "arr": vec![val!(1)] };
        let err = apply(&mut doc, &doc! { "$rename": doc! { "foo": "foo" } }, false).unwrap_err();
        assert!(err.message().contains("must differ"));

        let err = apply(
            &mut doc,
            &doc! { "$rename": doc! { "arr.0": "foo2" } },
            false,
        )
        .unwrap_err();
        assert!(err.message().contains("array"));
    }

    #[test]
    fn rename_with_missing_source_is_a_noop() {
        let mut doc = doc! { "foo": "bar" };
        apply(&mut doc, &doc! { "$rename": doc! { "nope": "other" } }, false).unwrap();
        assert_eq!(doc, doc! { "foo": "bar" });
    }

    #[test]
    fn inc_widens_and_creates() {
        let mut doc = doc! { "foo": doc! { "bar": 42i64 } };
        apply(&mut doc, &doc! { "$inc": doc! { "foo.bar": 2 } }, false).unwrap();
        assert!(matches!(path::get(&doc, "foo.bar"), Value::I64(44)));

        apply(&mut doc, &doc! { "$inc": doc! { "foo.baz": 2 } }, false).unwrap();
        assert!(matches!(path::get(&doc, "foo.baz"), Value::I32(2)));
    }

    #[test]
    fn mul_widens_and_zeroes() {
        let mut doc = doc! { "foo": doc! { "bar": 42i64 } };
        apply(&mut doc, &doc! { "$mul": doc! { "foo.bar": 2 } }, false).unwrap();
        assert!(matches!(path::get(&doc, "foo.bar"), Value::I64(84)));

        apply(&mut doc, &doc! { "$mul": doc! { "foo.baz": 2 } }, false).unwrap();
        assert!(matches!(path::get(&doc, "foo.baz"), Value::I32(0)));
    }

    #[test]
    fn min_and_max_overwrite_only_strictly() {
        let mut doc = doc! { "n": 42i64 };
        apply(&mut doc, &doc! { "$max": doc! { "n": 2 } }, false).unwrap();
        assert!(matches!(path::get(&doc, "n"), Value::I64(42)));

        apply(&mut doc, &doc! { "$max": doc! { "n": 44 } }, false).unwrap();
        assert!(matches!(path::get(&doc, "n"), Value::I32(44)));

        apply(&mut doc, &doc! { "$min": doc! { "n": 44 } }, false).unwrap();
        assert!(matches!(path::get(&doc, "n"), Value::I32(44)));

        apply(&mut doc, &doc! { "$min": doc! { "n": 21 } }, false).unwrap();
        assert!(matches!(path::get(&doc, "n"), Value::I32(21)));

        // missing fields are always set
        apply(&mut doc, &doc! { "$min": doc! { "m": 7 } }, false).unwrap();
        assert_eq!(path::get(&doc, "m"), val!(7));
    }

    #[test]
    fn current_date_sets_datetime_or_timestamp() {
        let mut doc = doc! {};
        apply(&mut doc, &doc! { "$currentDate": doc! { "d": true } }, false).unwrap();
        assert!(matches!(path::get(&doc, "d"), Value::DateTime(_)));

        apply(
            &mut doc,
            &doc! { "$currentDate": doc! { "d2": doc! { "$type": "date" } } },
            false,
        )
        .unwrap();
        assert!(matches!(path::get(&doc, "d2"), Value::DateTime(_)));

        apply(
            &mut doc,
            &doc! { "$currentDate": doc! { "t": doc! { "$type": "timestamp" } } },
            false,
        )
        .unwrap();
        assert!(matches!(path::get(&doc, "t"), Value::Timestamp(_)));
    }

    #[test]
    fn current_date_shape_errors() {
        let mut doc = doc! {};
        let err = apply(
            &mut doc,
            &doc! { "$currentDate": doc! { "d": "baz" } },
            false,
        )
        .unwrap_err();
        assert_eq!(err.message(), "apply: $currentDate: expected boolean or document");

        let err = apply(
            &mut doc,
            &doc! { "$currentDate": doc! { "d": doc! { "foo": "bar" } } },
            false,
        )
        .unwrap_err();
        assert_eq!(
            err.message(),
            "apply: $currentDate: expected document with a single $type field"
        );

        let err = apply(
            &mut doc,
            &doc! { "$currentDate": doc! { "d": doc! { "$type": "foo" } } },
            false,
        )
        .unwrap_err();
        assert_eq!(
            err.message(),
            "apply: $currentDate: expected $type 'date' or 'timestamp'"
        );
    }

    #[test]
    fn conflicting_writes_to_one_path_fail() {
        let mut doc = doc! { "n": 1 };
        let err = apply(
            &mut doc,
            &doc! { "$set": doc! { "n": 2 }, "$inc": doc! { "n": 1 } },
            false,
        )
        .unwrap_err();
        assert!(err.message().contains("conflicting update"));
    }

    #[test]
    fn timestamps_from_current_date_are_monotonic() {
        let mut doc = doc! {};
        apply(
            &mut doc,
            &doc! { "$currentDate": doc! {
                "a": doc! { "$type": "timestamp" },
                "b": doc! { "$type": "timestamp" },
            } },
            false,
        )
        .unwrap();
        let a = path::get(&doc, "a");
        let b = path::get(&doc, "b");
        assert!(compare(&a, &b) == Ordering::Less);
    }
}
