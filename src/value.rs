//! The small, closed runtime value representation the core shuttles between
//! [`crate::reflect::Reflector`] and the database driver boundary. This is
//! the `Any` referred to by `Params { values: [Any], .. }` in spec §3.

/// A scalar (or NULL) value as seen at the driver boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Whether this is the zero value of its variant, used by `omitempty`
    /// (spec §4.5): `Null` and each variant's default both count as "zero".
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::I64(i) => *i == 0,
            Value::F64(f) => *f == 0.0,
            Value::Str(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The zero value of the same variant as `self`, or `Null` if `self` is
    /// already `Null`. A [`Reflector`](crate::reflect::Reflector) whose
    /// destination field is not itself nullable uses this to turn a scanned
    /// `Null` into the field's zero value instead of storing `Null` directly
    /// (spec §4.6, testable property 7).
    pub fn zero_like(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Bool(_) => Value::Bool(false),
            Value::I64(_) => Value::I64(0),
            Value::F64(_) => Value::F64(0.0),
            Value::Str(_) => Value::Str(String::new()),
            Value::Bytes(_) => Value::Bytes(Vec::new()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::I64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::F64(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}
