//! Non-finite float detection.
//!
//! `serde_json` writes NaN and infinities as `null`, which would silently turn
//! a value into a missing one. Records are walked with this serializer first
//! so such values are rejected instead.

use serde::ser::{self, Serialize, Serializer};

use crate::errors::{DataError, DataResult};

/// Fails with `DataError::TypeResolution` if `value` contains a NaN or
/// infinite float anywhere in its serialized form.
pub(crate) fn ensure_finite<T: Serialize + ?Sized>(value: &T) -> DataResult<()> {
    value.serialize(&mut FiniteFloats { field: None })
}

struct FiniteFloats {
    field: Option<&'static str>,
}

impl FiniteFloats {
    fn check(&self, v: f64) -> DataResult<()> {
        if v.is_finite() {
            return Ok(());
        }
        Err(match self.field {
            Some(field) => DataError::TypeResolution(format!(
                "field `{}` holds the non-finite number {}",
                field, v
            )),
            None => DataError::TypeResolution(format!("non-finite number {}", v)),
        })
    }
}

impl ser::Error for DataError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        DataError::TypeResolution(msg.to_string())
    }
}

impl<'a> Serializer for &'a mut FiniteFloats {
    type Ok = ();
    type Error = DataError;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _: bool) -> DataResult<()> {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> DataResult<()> {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> DataResult<()> {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> DataResult<()> {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> DataResult<()> {
        Ok(())
    }

    fn serialize_i128(self, _: i128) -> DataResult<()> {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> DataResult<()> {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> DataResult<()> {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> DataResult<()> {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> DataResult<()> {
        Ok(())
    }

    fn serialize_u128(self, _: u128) -> DataResult<()> {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> DataResult<()> {
        self.check(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> DataResult<()> {
        self.check(v)
    }

    fn serialize_char(self, _: char) -> DataResult<()> {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> DataResult<()> {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> DataResult<()> {
        Ok(())
    }

    fn serialize_none(self) -> DataResult<()> {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> DataResult<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> DataResult<()> {
        Ok(())
    }

    fn serialize_unit_struct(self, _: &'static str) -> DataResult<()> {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> DataResult<()> {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> DataResult<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> DataResult<()> {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> DataResult<Self> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> DataResult<Self> {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> DataResult<Self> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> DataResult<Self> {
        Ok(self)
    }

    fn serialize_map(self, _: Option<usize>) -> DataResult<Self> {
        Ok(self)
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> DataResult<Self> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> DataResult<Self> {
        Ok(self)
    }
}

impl<'a> ser::SerializeSeq for &'a mut FiniteFloats {
    type Ok = ();
    type Error = DataError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> DataResult<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> DataResult<()> {
        Ok(())
    }
}

impl<'a> ser::SerializeTuple for &'a mut FiniteFloats {
    type Ok = ();
    type Error = DataError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> DataResult<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> DataResult<()> {
        Ok(())
    }
}

impl<'a> ser::SerializeTupleStruct for &'a mut FiniteFloats {
    type Ok = ();
    type Error = DataError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> DataResult<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> DataResult<()> {
        Ok(())
    }
}

impl<'a> ser::SerializeTupleVariant for &'a mut FiniteFloats {
    type Ok = ();
    type Error = DataError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> DataResult<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> DataResult<()> {
        Ok(())
    }
}

impl<'a> ser::SerializeMap for &'a mut FiniteFloats {
    type Ok = ();
    type Error = DataError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> DataResult<()> {
        key.serialize(&mut **self)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> DataResult<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> DataResult<()> {
        Ok(())
    }
}

impl<'a> ser::SerializeStruct for &'a mut FiniteFloats {
    type Ok = ();
    type Error = DataError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> DataResult<()> {
        self.field = Some(key);
        value.serialize(&mut **self)
    }

    fn end(self) -> DataResult<()> {
        Ok(())
    }
}

impl<'a> ser::SerializeStructVariant for &'a mut FiniteFloats {
    type Ok = ();
    type Error = DataError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> DataResult<()> {
        self.field = Some(key);
        value.serialize(&mut **self)
    }

    fn end(self) -> DataResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Reading {
        id: i64,
        value: Option<f64>,
        samples: Vec<f32>,
    }

    #[test]
    fn test_finite_values_pass() {
        let reading = Reading {
            id: 1,
            value: Some(2.5),
            samples: vec![1.0, -0.5],
        };
        assert!(ensure_finite(&reading).is_ok());
        assert!(ensure_finite(&serde_json::json!({ "a": [1, 2.0, null] })).is_ok());
    }

    #[test]
    fn test_non_finite_field_is_named() {
        let reading = Reading {
            id: 1,
            value: Some(f64::INFINITY),
            samples: vec![],
        };
        let err = ensure_finite(&reading).unwrap_err();
        assert!(matches!(err, DataError::TypeResolution(ref m) if m.contains("`value`")));
    }

    #[test]
    fn test_nan_in_sequence_is_rejected() {
        let reading = Reading {
            id: 1,
            value: None,
            samples: vec![1.0, f32::NAN],
        };
        assert!(matches!(
            ensure_finite(&reading),
            Err(DataError::TypeResolution(_))
        ));
    }
}
