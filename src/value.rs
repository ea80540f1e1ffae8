/// Core idzey runtime value type and its coercions.
///
/// Lives in its own module so the interpreter, the CLI and the tests can all
/// import it without pulling in evaluation machinery.
use std::fmt;

use thiserror::Error;

use crate::ast::Block;

/// Element assignment refuses to grow an array past this index; writes beyond
/// it are silently dropped.
const MAX_ARRAY_GROW_INDEX: i64 = 1000;

// ---------------------------------------------------------------------------
// RuntimeError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Runtime error: {0}")]
    Error(String),
    /// Internal signal: `return` unwinds to the nearest function call, which
    /// consumes it. Surfaces as an error only when no call encloses it.
    #[error("Runtime error: 'return' outside of a function")]
    Return(Box<Value>),
    /// Internal signal: `break` unwinds to the nearest loop.
    #[error("Runtime error: 'break' outside of a loop")]
    Break,
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Num(f64),
    Str(String),
    Bool(bool),
    Array(Vec<Value>),
    Function {
        name: String,
        params: Vec<String>,
        /// Deep-cloned at declaration time; independent of the parsed tree.
        body: Block,
    },
    /// Host callable, dispatched by name inside the interpreter.
    Native(String),
}

impl Value {
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Num(_))
    }

    /// Narrow a double back to `Int` when it is exactly representable.
    pub fn narrowed(n: f64) -> Value {
        if n.is_finite() && n == n.trunc() && (i64::MIN as f64..=i64::MAX as f64).contains(&n) {
            Value::Int(n as i64)
        } else {
            Value::Num(n)
        }
    }

    pub fn as_num(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Int(i) => *i as f64,
            Value::Num(n) => *n,
            // A string must lead with an integer part to count as numeric at
            // all; one that does but has more text after it is re-read as a
            // double prefix. ".5" has no integer lead and coerces to 0.
            Value::Str(s) => match int_prefix(s) {
                None => 0.0,
                Some((i, end)) if end == s.len() => i as f64,
                Some(_) => num_prefix(s),
            },
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Array(items) => items.len() as f64,
            Value::Function { .. } | Value::Native(_) => 0.0,
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Int(i) => *i,
            Value::Num(n) => *n as i64,
            Value::Str(s) => int_prefix(s).map_or(0, |(i, _)| i),
            Value::Bool(b) => {
                if *b {
                    1
                } else {
                    0
                }
            }
            Value::Array(items) => items.len() as i64,
            Value::Function { .. } | Value::Native(_) => 0,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Int(i) => *i != 0,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Array(items) => !items.is_empty(),
            Value::Function { .. } | Value::Native(_) => true,
        }
    }

    /// Read `target[index]`.
    ///
    /// Arrays return the element, or null when the index is out of range.
    /// Strings return the whole string at index 0 and a one-byte string for
    /// positive in-range indexes. Any other value acts as a one-element
    /// sequence: itself at index 0, null elsewhere.
    pub fn index(&self, index: i64) -> Value {
        match self {
            Value::Array(items) => {
                if index < 0 || index as usize >= items.len() {
                    Value::Null
                } else {
                    items[index as usize].clone()
                }
            }
            Value::Str(s) => {
                if index == 0 {
                    self.clone()
                } else if index > 0 && (index as usize) < s.len() {
                    Value::Str(s.as_bytes()[index as usize..index as usize + 1]
                        .iter()
                        .map(|b| *b as char)
                        .collect())
                } else {
                    Value::Null
                }
            }
            other => {
                if index == 0 {
                    other.clone()
                } else {
                    Value::Null
                }
            }
        }
    }

    /// Write `target[index] = value` in place, with array value semantics
    /// handled by the caller (read out, mutate, write back).
    ///
    /// Non-arrays first collapse to an array: a string becomes a one-element
    /// array holding itself, everything else becomes empty. Negative indexes
    /// are ignored; growth past [`MAX_ARRAY_GROW_INDEX`] is silently dropped,
    /// and growing writes fill the gap with null.
    pub fn set_index(&mut self, index: i64, value: Value) {
        if let Value::Str(s) = self {
            let s = std::mem::take(s);
            *self = Value::Array(vec![Value::Str(s)]);
        } else if !matches!(self, Value::Array(_)) {
            *self = Value::Array(Vec::new());
        }

        let items = match self {
            Value::Array(items) => items,
            _ => unreachable!(),
        };

        if index < 0 {
            return;
        }

        if index as usize >= items.len() {
            if index > MAX_ARRAY_GROW_INDEX {
                return;
            }
            items.resize(index as usize + 1, Value::Null);
        }

        items[index as usize] = value;
    }

    /// `length` is the only supported property: element count for arrays,
    /// byte length for strings, 1 for everything else. Unknown property
    /// names yield null.
    pub fn property(&self, name: &str) -> Value {
        if name == "length" {
            return match self {
                Value::Array(items) => Value::Int(items.len() as i64),
                Value::Str(s) => Value::Int(s.len() as i64),
                _ => Value::Int(1),
            };
        }
        Value::Null
    }
}

/// Integer prefix of a string: leading whitespace and an optional sign are
/// skipped, then the longest run of digits is consumed; trailing text is
/// ignored. `None` when no digits follow, or the value does not fit.
fn int_prefix(s: &str) -> Option<(i64, usize)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    let mut sign = 1i64;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        if bytes[i] == b'-' {
            sign = -1;
        }
        i += 1;
    }

    let start = i;
    let mut value: i64 = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        value = value
            .checked_mul(10)?
            .checked_add((bytes[i] - b'0') as i64)?;
        i += 1;
    }

    if i == start {
        return None;
    }
    Some((sign * value, i))
}

/// Double prefix of a string: leading whitespace, an optional sign, digits
/// with an optional fraction and exponent; trailing text is ignored. Yields
/// 0.0 when the string holds no digits at all.
fn num_prefix(s: &str) -> f64 {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    let start = i;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let mut digits = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }

    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
            digits += 1;
        }
        if digits > 0 {
            i = j;
        }
    }

    if digits == 0 {
        return 0.0;
    }

    let mut end = i;
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }

    s[start..end].parse::<f64>().unwrap_or(0.0)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(i) => write!(f, "{}", i),
            // Doubles render in fixed six-decimal notation.
            Value::Num(n) => write!(f, "{:.6}", n),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Function { name, .. } => write!(f, "<function {}>", name),
            Value::Native(_) => f.write_str("<native function>"),
        }
    }
}
