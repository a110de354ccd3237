use crate::document::{Document, ObjectId, Timestamp};
use std::fmt::{Debug, Display, Formatter};

/// A regular expression value with its option flags.
///
/// The pattern is kept verbatim; options are the single-letter flags
/// (`i`, `m`, `s`, `x`) in the order given by the caller.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, serde::Deserialize, serde::Serialize)]
pub struct RegexValue {
    pub pattern: String,
    pub options: String,
}

impl RegexValue {
    pub fn new(pattern: &str, options: &str) -> Self {
        RegexValue {
            pattern: pattern.to_string(),
            options: options.to_string(),
        }
    }
}

/// Represents a [Document] field value.
///
/// `Value` is a tagged sum over the supported scalar types plus the
/// complex [Value::Document] and [Value::Array] variants. The sentinel
/// [Value::Missing] denotes absence along a path and is distinct from
/// [Value::Null]; it is produced by the path accessor and never stored in
/// a document by regular mutations.
///
/// Equality and ordering follow the total order defined by
/// [crate::document::compare]: values order first by type bracket, numbers
/// compare by mathematical value across `I32`/`I64`/`F64`, and `Missing`
/// sorts below everything else.
///
/// # Usage
///
/// Create values using the `From` trait or the [crate::val!] macro:
/// ```text
/// let v1: Value = 42.into();          // From i32
/// let v2 = Value::from("hello");      // From &str
/// let v3 = val!(true);                // using the macro
/// ```
#[derive(Clone, Default, serde::Deserialize, serde::Serialize)]
pub enum Value {
    /// Absence of a value along a path. Distinct from [Value::Null].
    Missing,
    /// Represents a null value.
    #[default]
    Null,
    /// Represents a boolean value.
    Bool(bool),
    /// Represents a signed 32-bit integer value.
    I32(i32),
    /// Represents a signed 64-bit integer value.
    I64(i64),
    /// Represents a 64-bit floating point value.
    F64(f64),
    /// Represents a string value.
    String(String),
    /// Represents binary data.
    Binary(Vec<u8>),
    /// Represents a 12-byte object id.
    ObjectId(ObjectId),
    /// Represents a point in time as milliseconds since the UNIX epoch.
    DateTime(i64),
    /// Represents a locally monotonic `(seconds, counter)` stamp.
    Timestamp(Timestamp),
    /// Represents a 128-bit decimal in its raw 16-byte encoding.
    Decimal128([u8; 16]),
    /// Represents a regular expression with options.
    Regex(RegexValue),
    /// Represents an embedded document.
    Document(Document),
    /// Represents an array of values.
    Array(Vec<Value>),
}

impl Value {
    /// Creates a new [Value] from anything implementing [`Into<Value>`].
    pub fn from<T: Into<Value>>(value: T) -> Value {
        value.into()
    }

    /// Creates a [Value::Array] from a vector of convertible values.
    pub fn from_vec<T: Into<Value>>(values: Vec<T>) -> Value {
        Value::Array(values.into_iter().map(|v| v.into()).collect())
    }

    /// Returns the boolean if the value is [Value::Bool].
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer if the value is [Value::I32].
    #[inline]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer if the value is [Value::I64].
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float if the value is [Value::F64].
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string if the value is [Value::String].
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the document if the value is [Value::Document].
    #[inline]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the mutable document if the value is [Value::Document].
    #[inline]
    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the array if the value is [Value::Array].
    #[inline]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the mutable array if the value is [Value::Array].
    #[inline]
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the object id if the value is [Value::ObjectId].
    #[inline]
    pub fn as_object_id(&self) -> Option<&ObjectId> {
        match self {
            Value::ObjectId(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the timestamp if the value is [Value::Timestamp].
    #[inline]
    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            Value::Timestamp(v) => Some(v),
            _ => None,
        }
    }

    /// Checks if the value is [Value::Missing].
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Checks if the value is [Value::Null].
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Checks if the value is an arithmetic number (`I32`, `I64` or `F64`).
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::I32(_) | Value::I64(_) | Value::F64(_))
    }

    /// Checks if the value is [Value::String].
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Checks if the value is [Value::Document].
    #[inline]
    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    /// Checks if the value is [Value::Array].
    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Takes the value, replacing it with [Value::Null].
    pub fn take(&mut self) -> Value {
        std::mem::replace(self, Value::Null)
    }

    /// Returns the canonical type alias of this value, as used by `$type`.
    pub fn type_alias(&self) -> &'static str {
        match self {
            Value::Missing => "missing",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "int",
            Value::I64(_) => "long",
            Value::F64(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binData",
            Value::ObjectId(_) => "objectId",
            Value::DateTime(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::Decimal128(_) => "decimal",
            Value::Regex(_) => "regex",
            Value::Document(_) => "object",
            Value::Array(_) => "array",
        }
    }

    /// Returns the numeric type code of this value, as used by `$type`.
    ///
    /// Missing has no code and yields 0, which never matches a query.
    pub fn type_code(&self) -> i32 {
        match self {
            Value::Missing => 0,
            Value::F64(_) => 1,
            Value::String(_) => 2,
            Value::Document(_) => 3,
            Value::Array(_) => 4,
            Value::Binary(_) => 5,
            Value::ObjectId(_) => 7,
            Value::Bool(_) => 8,
            Value::DateTime(_) => 9,
            Value::Null => 10,
            Value::Regex(_) => 11,
            Value::I32(_) => 16,
            Value::Timestamp(_) => 17,
            Value::I64(_) => 18,
            Value::Decimal128(_) => 19,
        }
    }

    fn write_json(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Missing => write!(f, "missing"),
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "\"{}\"", v),
            Value::Binary(v) => write!(f, "Binary({} bytes)", v.len()),
            Value::ObjectId(v) => write!(f, "ObjectId(\"{}\")", v),
            Value::DateTime(v) => write!(f, "DateTime({})", v),
            Value::Timestamp(v) => write!(f, "Timestamp({}, {})", v.t, v.i),
            Value::Decimal128(v) => {
                write!(f, "Decimal128(0x")?;
                for byte in v {
                    write!(f, "{:02x}", byte)?;
                }
                write!(f, ")")
            }
            Value::Regex(v) => write!(f, "/{}/{}", v.pattern, v.options),
            Value::Document(v) => write!(f, "{}", v),
            Value::Array(v) => {
                write!(f, "[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.write_json(f)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write_json(f)
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write_json(f)
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::ObjectId(value)
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Value::Timestamp(value)
    }
}

impl From<RegexValue> for Value {
    fn from(value: RegexValue) -> Self {
        Value::Regex(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A macro to create a [Value] from a given expression.
///
/// # Examples
///
/// ```rust,ignore
/// use ferrite::val;
///
/// let int_value = val!(42);
/// let string_value = val!("hello");
/// let bool_value = val!(true);
/// ```
#[macro_export]
macro_rules! val {
    ($value:expr) => {
        $crate::document::Value::from($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_from_primitives() {
        assert!(matches!(Value::from(42i32), Value::I32(42)));
        assert!(matches!(Value::from(42i64), Value::I64(42)));
        assert!(matches!(Value::from(1.5f64), Value::F64(_)));
        assert!(matches!(Value::from(true), Value::Bool(true)));
        assert!(matches!(Value::from("hi"), Value::String(_)));
        assert!(matches!(Value::from(()), Value::Null));
    }

    #[test]
    fn value_from_option() {
        assert!(matches!(Value::from(Some(1i32)), Value::I32(1)));
        assert!(matches!(Value::from(None::<i32>), Value::Null));
    }

    #[test]
    fn value_from_vec() {
        let array = Value::from_vec(vec![1i32, 2, 3]);
        assert_eq!(array.as_array().unwrap().len(), 3);
    }

    #[test]
    fn accessors_return_matching_variant_only() {
        let value = val!(42);
        assert_eq!(value.as_i32(), Some(42));
        assert_eq!(value.as_i64(), None);
        assert_eq!(value.as_str(), None);
        assert!(!value.is_array());
        assert!(value.is_number());
    }

    #[test]
    fn missing_is_distinct_from_null() {
        assert!(Value::Missing.is_missing());
        assert!(!Value::Missing.is_null());
        assert!(Value::Null.is_null());
        assert!(!Value::Null.is_missing());
    }

    #[test]
    fn take_leaves_null_behind() {
        let mut value = val!("content");
        let taken = value.take();
        assert_eq!(taken.as_str(), Some("content"));
        assert!(value.is_null());
    }

    #[test]
    fn type_alias_and_code_agree_with_bson() {
        assert_eq!(val!(1.0).type_alias(), "double");
        assert_eq!(val!(1.0).type_code(), 1);
        assert_eq!(val!("s").type_alias(), "string");
        assert_eq!(val!("s").type_code(), 2);
        assert_eq!(val!(1).type_alias(), "int");
        assert_eq!(val!(1).type_code(), 16);
        assert_eq!(val!(1i64).type_alias(), "long");
        assert_eq!(val!(1i64).type_code(), 18);
        assert_eq!(Value::Null.type_code(), 10);
    }

    #[test]
    fn display_formats_scalars() {
        assert_eq!(format!("{}", val!(42)), "42");
        assert_eq!(format!("{}", val!("x")), "\"x\"");
        assert_eq!(format!("{}", Value::Null), "null");
        assert_eq!(
            format!("{}", Value::Array(vec![val!(1), val!(2)])),
            "[1, 2]"
        );
    }
}
