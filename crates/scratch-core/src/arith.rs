//! Combination rules used by [`crate::Scratch::add`]
//!
//! Lists and strings grow in place; numbers are summed into a new value that
//! replaces the old one only once the sum is known. Anything else falls
//! through to [`Error::Arithmetic`].
//!
//! | existing  | addend    | result                              |
//! |-----------|-----------|-------------------------------------|
//! | list      | list      | elements appended one by one        |
//! | list      | other     | addend appended as a single element |
//! | string    | string    | addend pushed onto the string       |
//! | int       | int       | checked integer sum                 |
//! | int/float | float/int | float sum                           |
//! | map       | any       | type mismatch                       |
//! | scalar    | map       | type mismatch                       |

use crate::{Error, Result, Value};

/// Combine `addend` into `existing` for the given key
///
/// `existing` is only written once the combination is known to succeed.
pub(crate) fn accumulate(key: &str, existing: &mut Value, addend: Value) -> Result<()> {
    match (existing, addend) {
        (Value::Map(_), _) => Err(Error::type_mismatch(key, "scalar or list", "map")),
        (Value::List(items), Value::List(more)) => {
            items.extend(more);
            Ok(())
        }
        (Value::List(items), addend) => {
            items.push(addend);
            Ok(())
        }
        (Value::String(s), Value::String(more)) => {
            s.push_str(&more);
            Ok(())
        }
        (existing, addend) if existing.is_numeric() && addend.is_numeric() => {
            let sum = add_numbers(existing, &addend)?;
            *existing = sum;
            Ok(())
        }
        (existing, addend) if addend.is_map() => {
            Err(Error::type_mismatch(key, existing.type_name(), "map"))
        }
        (existing, addend) => Err(Error::Arithmetic {
            left: existing.type_name(),
            right: addend.type_name(),
        }),
    }
}

/// `left + right` for two numbers, promoting to float when either is one
fn add_numbers(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or(Error::IntegerOverflow {
                left: *a,
                right: *b,
            }),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + *b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        _ => Err(Error::Arithmetic {
            left: left.type_name(),
            right: right.type_name(),
        }),
    }
}
