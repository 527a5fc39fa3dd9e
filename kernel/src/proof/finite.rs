//! Finite-float walk over any `Serialize` value.
//!
//! `serde_json::to_value` maps NaN and infinities to `null`, so a check on
//! the resulting tree cannot see them. This serializer visits the value
//! itself, produces nothing, and stops at the first non-finite float,
//! reporting its dotted field path.

use std::fmt::Display;

use serde::ser::{self, Serialize};

/// Error raised by [`ensure_finite`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FiniteError {
    #[error("non-finite number {value} at {path}")]
    NonFinite { path: String, value: String },
    #[error("{0}")]
    Custom(String),
}

impl ser::Error for FiniteError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

/// Reject any NaN or infinite float reachable from `value`.
///
/// # Errors
///
/// Returns [`FiniteError::NonFinite`] naming the path of the first offending
/// float, or [`FiniteError::Custom`] if the value's own `Serialize` fails.
pub fn ensure_finite<T: Serialize + ?Sized>(value: &T) -> Result<(), FiniteError> {
    value.serialize(Walker {
        path: String::from("$"),
    })
}

struct Walker {
    path: String,
}

impl Walker {
    fn child(&self, segment: impl Display) -> Self {
        Self {
            path: format!("{}.{segment}", self.path),
        }
    }

    #[allow(clippy::unnecessary_wraps)]
    fn compound(self) -> Result<Compound, FiniteError> {
        Ok(Compound {
            parent: self,
            index: 0,
        })
    }

    fn float(&self, f: f64) -> Result<(), FiniteError> {
        if f.is_finite() {
            Ok(())
        } else {
            Err(FiniteError::NonFinite {
                path: self.path.clone(),
                value: f.to_string(),
            })
        }
    }
}

/// Walker state inside a sequence, map or struct.
struct Compound {
    parent: Walker,
    index: usize,
}

impl Compound {
    fn next_index(&mut self) -> Walker {
        let child = self.parent.child(self.index);
        self.index += 1;
        child
    }
}

impl ser::Serializer for Walker {
    type Ok = ();
    type Error = FiniteError;
    type SerializeSeq = Compound;
    type SerializeTuple = Compound;
    type SerializeTupleStruct = Compound;
    type SerializeTupleVariant = Compound;
    type SerializeMap = Compound;
    type SerializeStruct = Compound;
    type SerializeStructVariant = Compound;

    fn serialize_bool(self, _: bool) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_i8(self, _: i8) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_i16(self, _: i16) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_i32(self, _: i32) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_i64(self, _: i64) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_u8(self, _: u8) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_u16(self, _: u16) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_u32(self, _: u32) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_u64(self, _: u64) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_f32(self, v: f32) -> Result<(), FiniteError> {
        self.float(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> Result<(), FiniteError> {
        self.float(v)
    }
    fn serialize_char(self, _: char) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_str(self, _: &str) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_bytes(self, _: &[u8]) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_none(self) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), FiniteError> {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_unit_struct(self, _: &'static str) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<(), FiniteError> {
        Ok(())
    }
    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<(), FiniteError> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), FiniteError> {
        value.serialize(self.child(variant))
    }
    fn serialize_seq(self, _: Option<usize>) -> Result<Compound, FiniteError> {
        self.compound()
    }
    fn serialize_tuple(self, _: usize) -> Result<Compound, FiniteError> {
        self.compound()
    }
    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Compound, FiniteError> {
        self.compound()
    }
    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Compound, FiniteError> {
        self.child(variant).compound()
    }
    fn serialize_map(self, _: Option<usize>) -> Result<Compound, FiniteError> {
        self.compound()
    }
    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Compound, FiniteError> {
        self.compound()
    }
    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Compound, FiniteError> {
        self.child(variant).compound()
    }
}

impl ser::SerializeSeq for Compound {
    type Ok = ();
    type Error = FiniteError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FiniteError> {
        value.serialize(self.next_index())
    }
    fn end(self) -> Result<(), FiniteError> {
        Ok(())
    }
}

impl ser::SerializeTuple for Compound {
    type Ok = ();
    type Error = FiniteError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FiniteError> {
        value.serialize(self.next_index())
    }
    fn end(self) -> Result<(), FiniteError> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for Compound {
    type Ok = ();
    type Error = FiniteError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FiniteError> {
        value.serialize(self.next_index())
    }
    fn end(self) -> Result<(), FiniteError> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for Compound {
    type Ok = ();
    type Error = FiniteError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FiniteError> {
        value.serialize(self.next_index())
    }
    fn end(self) -> Result<(), FiniteError> {
        Ok(())
    }
}

impl ser::SerializeMap for Compound {
    type Ok = ();
    type Error = FiniteError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), FiniteError> {
        key.serialize(self.parent.child("<key>"))
    }
    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FiniteError> {
        value.serialize(self.next_index())
    }
    fn end(self) -> Result<(), FiniteError> {
        Ok(())
    }
}

impl ser::SerializeStruct for Compound {
    type Ok = ();
    type Error = FiniteError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), FiniteError> {
        value.serialize(self.parent.child(key))
    }
    fn end(self) -> Result<(), FiniteError> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for Compound {
    type Ok = ();
    type Error = FiniteError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), FiniteError> {
        value.serialize(self.parent.child(key))
    }
    fn end(self) -> Result<(), FiniteError> {
        Ok(())
    }
}
