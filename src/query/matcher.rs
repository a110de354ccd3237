use crate::document::compare::same_bracket;
use crate::document::{compare, path, Document, Value};
use crate::errors::{ErrorKind, FerriteError, FerriteResult};
use regex::Regex;
use std::cmp::Ordering;

fn operator_error(message: &str) -> FerriteError {
    log::error!("{}", message);
    FerriteError::new(message, ErrorKind::OperatorError)
}

/// Evaluates a query document against a document.
///
/// A top-level pair `(path, condition)` evaluates the condition against
/// the value at `path`; a pair whose key starts with `$` is a logical
/// combinator. All top-level pairs must hold.
///
/// A condition that is a document whose first key starts with `$` is an
/// operator document; any other condition matches by comparator equality,
/// where an array target matches if any element equals the condition or
/// the array as a whole does. Dotted paths crossing arrays collect values
/// from every element and a predicate holds if it holds for any of them.
pub fn matches(doc: &Document, query: &Document) -> FerriteResult<bool> {
    for (key, condition) in query.iter() {
        let matched = if key.starts_with('$') {
            match_combinator(doc, key, condition)?
        } else {
            match_condition(doc, key, condition)?
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn match_combinator(doc: &Document, operator: &str, operand: &Value) -> FerriteResult<bool> {
    match operator {
        "$and" => {
            let queries = combinator_queries(operator, operand)?;
            for query in queries {
                if !matches(doc, query)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        "$or" => {
            let queries = combinator_queries(operator, operand)?;
            for query in queries {
                if matches(doc, query)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        "$nor" => {
            let queries = combinator_queries(operator, operand)?;
            for query in queries {
                if matches(doc, query)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        "$not" => {
            // accept a single query document as well as a list
            if let Some(query) = operand.as_document() {
                return Ok(!matches(doc, query)?);
            }
            let queries = combinator_queries(operator, operand)?;
            for query in queries {
                if !matches(doc, query)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(operator_error(&format!(
            "match: unknown top level operator \"{}\"",
            operator
        ))),
    }
}

fn combinator_queries<'a>(operator: &str, operand: &'a Value) -> FerriteResult<Vec<&'a Document>> {
    let items = operand.as_array().ok_or_else(|| {
        operator_error(&format!("match: {}: expected list of queries", operator))
    })?;
    if items.is_empty() {
        return Err(operator_error(&format!(
            "match: {}: empty list of queries",
            operator
        )));
    }
    let mut queries = Vec::with_capacity(items.len());
    for item in items {
        let query = item.as_document().ok_or_else(|| {
            operator_error(&format!("match: {}: expected list of queries", operator))
        })?;
        queries.push(query);
    }
    Ok(queries)
}

fn match_condition(doc: &Document, field: &str, condition: &Value) -> FerriteResult<bool> {
    // a regex condition applies as a pattern, not by equality
    if let Value::Regex(_) = condition {
        let regex = build_regex(condition, None, field)?;
        let (value, _) = path::all(doc, field, true, false);
        return Ok(match_any(&value, |v| {
            v.as_str().map(|s| regex.is_match(s)).unwrap_or(false)
        }));
    }

    // a document whose first key starts with "$" is an operator document
    if let Some(ops) = condition.as_document() {
        let is_operator_doc = ops
            .iter()
            .next()
            .map(|(key, _)| key.starts_with('$'))
            .unwrap_or(false);
        if is_operator_doc {
            return match_operators(doc, field, ops);
        }
    }

    // plain value equality
    let (value, _) = path::all(doc, field, true, false);
    Ok(match_eq(&value, condition))
}

fn match_operators(doc: &Document, field: &str, ops: &Document) -> FerriteResult<bool> {
    // $options belongs to a sibling $regex and is consumed there
    if ops.contains_key("$options") && !ops.contains_key("$regex") {
        return Err(operator_error(&format!(
            "match: $options: missing $regex for \"{}\"",
            field
        )));
    }

    for (operator, operand) in ops.iter() {
        if operator == "$options" {
            continue;
        }
        if !match_operator(doc, field, operator, operand, ops)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn match_operator(
    doc: &Document,
    field: &str,
    operator: &str,
    operand: &Value,
    ops: &Document,
) -> FerriteResult<bool> {
    let (value, nested) = path::all(doc, field, true, false);

    match operator {
        "$eq" => Ok(match_eq(&value, operand)),
        "$ne" => Ok(!match_eq(&value, operand)),
        "$gt" => Ok(match_cmp(&value, operand, Ordering::is_gt)),
        "$gte" => Ok(match_cmp(&value, operand, Ordering::is_ge)),
        "$lt" => Ok(match_cmp(&value, operand, Ordering::is_lt)),
        "$lte" => Ok(match_cmp(&value, operand, Ordering::is_le)),
        "$in" => {
            let items = operand
                .as_array()
                .ok_or_else(|| operator_error(&format!("match: $in: expected list for \"{}\"", field)))?;
            Ok(items.iter().any(|item| match_eq(&value, item)))
        }
        "$nin" => {
            let items = operand.as_array().ok_or_else(|| {
                operator_error(&format!("match: $nin: expected list for \"{}\"", field))
            })?;
            Ok(!items.iter().any(|item| match_eq(&value, item)))
        }
        "$exists" => {
            let expected = operand.as_bool().ok_or_else(|| {
                operator_error(&format!("match: $exists: expected boolean for \"{}\"", field))
            })?;
            let present = if nested {
                value.as_array().map(|a| !a.is_empty()).unwrap_or(false)
            } else {
                !value.is_missing()
            };
            Ok(present == expected)
        }
        "$type" => match_type(&value, operand, field),
        "$regex" => {
            let regex = build_regex(operand, ops.get("$options"), field)?;
            Ok(match_any(&value, |v| {
                v.as_str().map(|s| regex.is_match(s)).unwrap_or(false)
            }))
        }
        "$mod" => {
            let items = operand.as_array().filter(|a| a.len() == 2).ok_or_else(|| {
                operator_error(&format!(
                    "match: $mod: expected list of divisor and remainder for \"{}\"",
                    field
                ))
            })?;
            let divisor = number_as_i64(&items[0]);
            let remainder = number_as_i64(&items[1]);
            let (Some(divisor), Some(remainder)) = (divisor, remainder) else {
                return Err(operator_error(&format!(
                    "match: $mod: expected list of divisor and remainder for \"{}\"",
                    field
                )));
            };
            if divisor == 0 {
                return Err(operator_error(&format!(
                    "match: $mod: divisor must not be zero for \"{}\"",
                    field
                )));
            }
            Ok(match_any(&value, |v| {
                number_as_i64(v)
                    .map(|n| n % divisor == remainder)
                    .unwrap_or(false)
            }))
        }
        "$all" => {
            let items = operand.as_array().ok_or_else(|| {
                operator_error(&format!("match: $all: expected list for \"{}\"", field))
            })?;
            if items.is_empty() {
                return Ok(false);
            }
            Ok(items.iter().all(|item| match_eq(&value, item)))
        }
        "$size" => {
            let size = number_as_i64(operand).ok_or_else(|| {
                operator_error(&format!("match: $size: expected number for \"{}\"", field))
            })?;
            let value = path::get(doc, field);
            Ok(value
                .as_array()
                .map(|a| a.len() as i64 == size)
                .unwrap_or(false))
        }
        "$elemMatch" => {
            let query = operand.as_document().ok_or_else(|| {
                operator_error(&format!(
                    "match: $elemMatch: expected document for \"{}\"",
                    field
                ))
            })?;
            let value = path::get(doc, field);
            let Some(items) = value.as_array() else {
                return Ok(false);
            };
            for item in items {
                if match_element(item, query)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        "$not" => {
            let inner = operand.as_document().ok_or_else(|| {
                operator_error(&format!(
                    "match: $not: expected operator document for \"{}\"",
                    field
                ))
            })?;
            Ok(!match_operators(doc, field, inner)?)
        }
        _ => Err(operator_error(&format!(
            "match: unknown operator \"{}\"",
            operator
        ))),
    }
}

// Equality used by value conditions, $eq, $in and $all: an array target
// matches if any element equals the operand or the array as a whole does.
fn match_eq(value: &Value, operand: &Value) -> bool {
    if let Value::Array(items) = value {
        if items
            .iter()
            .any(|item| compare(item, operand) == Ordering::Equal)
        {
            return true;
        }
    }
    compare(value, operand) == Ordering::Equal
}

// Ordering comparisons apply within the operand's type bracket only, and
// existentially over array targets.
fn match_cmp(value: &Value, operand: &Value, pred: fn(Ordering) -> bool) -> bool {
    if let Value::Array(items) = value {
        if items
            .iter()
            .any(|item| same_bracket(item, operand) && pred(compare(item, operand)))
        {
            return true;
        }
    }
    same_bracket(value, operand) && pred(compare(value, operand))
}

// Existential predicate over an array target, falling back to the value
// itself.
fn match_any(value: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    if let Value::Array(items) = value {
        if items.iter().any(&pred) {
            return true;
        }
    }
    pred(value)
}

fn match_type(value: &Value, operand: &Value, field: &str) -> FerriteResult<bool> {
    match operand {
        Value::String(alias) => Ok(match_any(value, |v| v.type_alias() == alias)),
        Value::I32(_) | Value::I64(_) | Value::F64(_) => {
            let code = number_as_i64(operand).unwrap_or(0);
            Ok(match_any(value, |v| v.type_code() as i64 == code))
        }
        _ => Err(operator_error(&format!(
            "match: $type: expected string or number for \"{}\"",
            field
        ))),
    }
}

fn build_regex(operand: &Value, options: Option<&Value>, field: &str) -> FerriteResult<Regex> {
    let (pattern, mut flags) = match operand {
        Value::String(pattern) => (pattern.clone(), String::new()),
        Value::Regex(regex) => (regex.pattern.clone(), regex.options.clone()),
        _ => {
            return Err(operator_error(&format!(
                "match: $regex: expected string or regex for \"{}\"",
                field
            )))
        }
    };

    if let Some(options) = options {
        let options = options.as_str().ok_or_else(|| {
            operator_error(&format!("match: $options: expected string for \"{}\"", field))
        })?;
        flags = options.to_string();
    }

    for flag in flags.chars() {
        if !matches!(flag, 'i' | 'm' | 's' | 'x') {
            return Err(operator_error(&format!(
                "match: $options: unsupported option '{}' for \"{}\"",
                flag, field
            )));
        }
    }

    let expression = if flags.is_empty() {
        pattern
    } else {
        format!("(?{}){}", flags, pattern)
    };

    Regex::new(&expression).map_err(|err| {
        log::error!("invalid regex pattern '{}': {}", expression, err);
        FerriteError::new(
            &format!("match: $regex: invalid pattern for \"{}\"", field),
            ErrorKind::OperatorError,
        )
    })
}

// $elemMatch: operator documents apply to the element directly, plain
// queries treat the element as a document.
fn match_element(item: &Value, query: &Document) -> FerriteResult<bool> {
    let is_operator_doc = query
        .iter()
        .next()
        .map(|(key, _)| key.starts_with('$'))
        .unwrap_or(false);

    if is_operator_doc {
        for (operator, operand) in query.iter() {
            if operator == "$options" {
                continue;
            }
            let matched = match operator.as_str() {
                "$eq" => match_eq(item, operand),
                "$ne" => !match_eq(item, operand),
                "$gt" => match_cmp(item, operand, Ordering::is_gt),
                "$gte" => match_cmp(item, operand, Ordering::is_ge),
                "$lt" => match_cmp(item, operand, Ordering::is_lt),
                "$lte" => match_cmp(item, operand, Ordering::is_le),
                "$in" => {
                    let items = operand.as_array().ok_or_else(|| {
                        operator_error("match: $in: expected list in $elemMatch")
                    })?;
                    items.iter().any(|i| match_eq(item, i))
                }
                "$nin" => {
                    let items = operand.as_array().ok_or_else(|| {
                        operator_error("match: $nin: expected list in $elemMatch")
                    })?;
                    !items.iter().any(|i| match_eq(item, i))
                }
                _ => {
                    return Err(operator_error(&format!(
                        "match: unknown operator \"{}\" in $elemMatch",
                        operator
                    )))
                }
            };
            if !matched {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    match item.as_document() {
        Some(doc) => matches(doc, query),
        None => Ok(false),
    }
}

fn number_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::I32(v) => Some(*v as i64),
        Value::I64(v) => Some(*v),
        Value::F64(v) if v.fract() == 0.0 => Some(*v as i64),
        _ => None,
    }
}
