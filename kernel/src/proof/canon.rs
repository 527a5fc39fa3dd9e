//! Canonical JSON bytes: the single serialization-for-hashing implementation.
//!
//! **Exactly one place** produces canonical JSON bytes in the workspace. The
//! preregistration commitment and the forensic artifact both route through
//! this module, so the digest a parameter set is sealed under and the bytes
//! it is echoed as in the artifact cannot drift apart.
//!
//! # Canonicalization rules
//!
//! 1. Object keys are sorted lexicographically (byte order).
//! 2. No extraneous whitespace (compact form: `{"a":1,"b":2}`).
//! 3. Strings are JSON-escaped per RFC 8259 §7.
//! 4. Integers (`i64` / `u64`) are written without a fractional part.
//! 5. Floats are written as the shortest decimal that round-trips to the
//!    same `f64`, always carrying a fractional part or an exponent
//!    (`100.0`, `0.95`, `1.0e-7`, `1.5e300`). Negative zero is written
//!    `0.0`. The formatting is locale-free and platform-independent.
//! 6. NaN and Infinity are rejected.
//! 7. `null`, `true`, `false` are written literally.
//! 8. Output is always valid UTF-8.

use std::io::Write;

use super::finite::{ensure_finite, FiniteError};

/// Error type for canonical JSON serialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanonError {
    /// A JSON number could not be represented (NaN, Infinity, or a value
    /// `serde_json` holds in a form this encoder does not recognise).
    #[error("non-finite or unrepresentable number in canonical JSON: {raw}")]
    UnrepresentableNumber { raw: String },
    /// A value could not be converted to a JSON tree before encoding.
    #[error("value is not representable as JSON: {detail}")]
    NotJson { detail: String },
}

/// Produce canonical JSON bytes from a `serde_json::Value`.
///
/// # Errors
///
/// Returns [`CanonError::UnrepresentableNumber`] if any JSON number is not a
/// finite integer or float.
pub fn canonical_json_bytes(value: &serde_json::Value) -> Result<Vec<u8>, CanonError> {
    let mut buf = Vec::new();
    write_value(&mut buf, value)?;
    Ok(buf)
}

/// Serialize any `Serialize` value to canonical JSON bytes.
///
/// Goes through `serde_json::Value` so struct field declaration order never
/// leaks into the output.
///
/// # Errors
///
/// Returns [`CanonError::UnrepresentableNumber`] if any float reachable from
/// the value is NaN or infinite (checked before conversion, which would
/// otherwise turn them into `null`), [`CanonError::NotJson`] if the value
/// cannot be represented as JSON (e.g. a map with non-string keys), or any
/// error of [`canonical_json_bytes`].
pub fn to_canonical_bytes<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, CanonError> {
    ensure_finite(value).map_err(|e| match e {
        FiniteError::NonFinite { .. } => CanonError::UnrepresentableNumber { raw: e.to_string() },
        FiniteError::Custom(detail) => CanonError::NotJson { detail },
    })?;
    let tree = serde_json::to_value(value).map_err(|e| CanonError::NotJson {
        detail: e.to_string(),
    })?;
    canonical_json_bytes(&tree)
}

/// Check whether `bytes` are already in canonical form.
///
/// Parses and re-encodes; `true` iff the re-encoding is byte-identical.
#[must_use]
pub fn is_canonical(bytes: &[u8]) -> bool {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) else {
        return false;
    };
    matches!(canonical_json_bytes(&value), Ok(re) if re == bytes)
}

/// Format a finite `f64` with the canonical float rule.
///
/// # Errors
///
/// Returns [`CanonError::UnrepresentableNumber`] for NaN or Infinity.
pub fn format_f64(f: f64) -> Result<String, CanonError> {
    if !f.is_finite() {
        return Err(CanonError::UnrepresentableNumber {
            raw: format!("{f}"),
        });
    }
    if f == 0.0 {
        return Ok("0.0".to_string());
    }
    // `{:?}` is the shortest round-trip representation and always contains a
    // '.' or an 'e'. Only the exponent form may lack a fractional part.
    let raw = format!("{f:?}");
    match raw.split_once('e') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => {
            Ok(format!("{mantissa}.0e{exponent}"))
        }
        _ => Ok(raw),
    }
}

fn write_value(buf: &mut Vec<u8>, value: &serde_json::Value) -> Result<(), CanonError> {
    use serde_json::Value;

    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Bool(true) => buf.extend_from_slice(b"true"),
        Value::Bool(false) => buf.extend_from_slice(b"false"),
        Value::Number(n) => write_number(buf, n)?,
        Value::String(s) => write_string(buf, s),
        Value::Array(items) => {
            buf.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    buf.push(b',');
                }
                write_value(buf, item)?;
            }
            buf.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            buf.push(b'{');
            for (idx, (key, item)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    buf.push(b',');
                }
                write_string(buf, key);
                buf.push(b':');
                write_value(buf, item)?;
            }
            buf.push(b'}');
        }
    }
    Ok(())
}

fn write_number(buf: &mut Vec<u8>, n: &serde_json::Number) -> Result<(), CanonError> {
    // Integers keep integer form; only genuine floats get the float rule.
    let text = match (n.as_i64(), n.as_u64(), n.as_f64()) {
        (Some(i), _, _) => i.to_string(),
        (None, Some(u), _) => u.to_string(),
        (None, None, Some(f)) => format_f64(f)?,
        (None, None, None) => {
            return Err(CanonError::UnrepresentableNumber {
                raw: n.to_string(),
            })
        }
    };
    buf.extend_from_slice(text.as_bytes());
    Ok(())
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for ch in s.chars() {
        let escaped: Option<&[u8]> = match ch {
            '"' => Some(&b"\\\""[..]),
            '\\' => Some(&b"\\\\"[..]),
            '\n' => Some(&b"\\n"[..]),
            '\r' => Some(&b"\\r"[..]),
            '\t' => Some(&b"\\t"[..]),
            _ => None,
        };
        match escaped {
            Some(seq) => buf.extend_from_slice(seq),
            None if u32::from(ch) < 0x20 => {
                let _ = write!(buf, "\\u{:04x}", u32::from(ch));
            }
            None => {
                let mut utf8 = [0u8; 4];
                buf.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    buf.push(b'"');
}
