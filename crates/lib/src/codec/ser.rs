//! Serializer building a [`Value`] tree from any serializable type.
//!
//! Enums use the externally tagged shape the decoder expects: unit variants
//! become their name, other variants a single-entry map keyed by the name.

use std::{collections::BTreeMap, fmt::Display};

use serde::ser::{self, Impossible, Serialize, Serializer as _};

use super::CodecError;
use crate::{Value, kv::path};

/// Serializes into a [`Value`], tracking the key path for error reports.
pub(crate) struct ValueSerializer {
    path: String,
}

impl ValueSerializer {
    pub(crate) fn new() -> Self {
        Self {
            path: String::new(),
        }
    }

    fn at(path: String) -> Self {
        Self { path }
    }

    fn unsupported(&self, kind: impl Display) -> CodecError {
        CodecError::UnsupportedValueKind {
            path: self.path.clone(),
            kind: kind.to_string(),
        }
    }

    fn integer<N: TryInto<i64> + Display + Copy>(&self, n: N) -> Result<Value, CodecError> {
        n.try_into()
            .map(Value::Int)
            .map_err(|_| self.unsupported(format!("integer {n} out of range")))
    }
}

/// Widens through the shortest decimal form so `0.1f32` stays `0.1`.
fn widen_f32(v: f32) -> f64 {
    if v.is_finite() {
        v.to_string().parse().unwrap_or(f64::from(v))
    } else {
        f64::from(v)
    }
}

fn serialize_child<T: Serialize + ?Sized>(path: String, value: &T) -> Result<Value, CodecError> {
    value
        .serialize(ValueSerializer::at(path.clone()))
        .map_err(|e| e.with_path(&path))
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = CodecError;

    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = VariantBuilder<SeqBuilder>;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = VariantBuilder<MapBuilder>;

    fn serialize_bool(self, v: bool) -> Result<Value, CodecError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, CodecError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, CodecError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, CodecError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, CodecError> {
        Ok(Value::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value, CodecError> {
        self.integer(v)
    }

    fn serialize_u8(self, v: u8) -> Result<Value, CodecError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, CodecError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, CodecError> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, CodecError> {
        self.integer(v)
    }

    fn serialize_u128(self, v: u128) -> Result<Value, CodecError> {
        self.integer(v)
    }

    fn serialize_f32(self, v: f32) -> Result<Value, CodecError> {
        Ok(Value::Float(widen_f32(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, CodecError> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, CodecError> {
        Ok(Value::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, CodecError> {
        Ok(Value::Text(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, CodecError> {
        Ok(Value::List(v.iter().map(|b| Value::Int((*b).into())).collect()))
    }

    fn serialize_none(self) -> Result<Value, CodecError> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, CodecError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, CodecError> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, CodecError> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, CodecError> {
        Ok(Value::Text(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, CodecError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, CodecError> {
        let inner = serialize_child(path::join(&self.path, variant), value)?;
        Ok(Value::map([(variant, inner)]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder, CodecError> {
        Ok(SeqBuilder::new(self.path, len))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqBuilder, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantBuilder<SeqBuilder>, CodecError> {
        Ok(VariantBuilder {
            variant,
            inner: SeqBuilder::new(path::join(&self.path, variant), Some(len)),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapBuilder, CodecError> {
        Ok(MapBuilder::new(self.path))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<MapBuilder, CodecError> {
        Ok(MapBuilder::new(self.path))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantBuilder<MapBuilder>, CodecError> {
        Ok(VariantBuilder {
            variant,
            inner: MapBuilder::new(path::join(&self.path, variant)),
        })
    }
}

pub(crate) struct SeqBuilder {
    path: String,
    items: Vec<Value>,
}

impl SeqBuilder {
    fn new(path: String, len: Option<usize>) -> Self {
        Self {
            path,
            items: Vec::with_capacity(len.unwrap_or(0)),
        }
    }
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        let child = path::join(&self.path, &self.items.len().to_string());
        self.items.push(serialize_child(child, value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, CodecError> {
        Ok(Value::List(self.items))
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, CodecError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqBuilder {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, CodecError> {
        ser::SerializeSeq::end(self)
    }
}

pub(crate) struct MapBuilder {
    path: String,
    entries: BTreeMap<String, Value>,
    next_key: Option<String>,
}

impl MapBuilder {
    fn new(path: String) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
            next_key: None,
        }
    }

    fn insert<T: Serialize + ?Sized>(&mut self, key: String, value: &T) -> Result<(), CodecError> {
        let child = serialize_child(path::join(&self.path, &key), value)?;
        self.entries.insert(key, child);
        Ok(())
    }
}

impl ser::SerializeMap for MapBuilder {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), CodecError> {
        self.next_key = Some(key.serialize(KeySerializer { path: &self.path })?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        match self.next_key.take() {
            Some(key) => self.insert(key, value),
            None => Err(ser::Error::custom("map value serialized before its key")),
        }
    }

    fn end(self) -> Result<Value, CodecError> {
        Ok(Value::Map(self.entries))
    }
}

impl ser::SerializeStruct for MapBuilder {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Value, CodecError> {
        ser::SerializeMap::end(self)
    }
}

/// Wraps the content of a tuple or struct variant in `{variant: content}`.
pub(crate) struct VariantBuilder<B> {
    variant: &'static str,
    inner: B,
}

impl ser::SerializeTupleVariant for VariantBuilder<SeqBuilder> {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        ser::SerializeSeq::serialize_element(&mut self.inner, value)
    }

    fn end(self) -> Result<Value, CodecError> {
        let content = ser::SerializeSeq::end(self.inner)?;
        Ok(Value::map([(self.variant, content)]))
    }
}

impl ser::SerializeStructVariant for VariantBuilder<MapBuilder> {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        self.inner.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Value, CodecError> {
        let content = ser::SerializeMap::end(self.inner)?;
        Ok(Value::map([(self.variant, content)]))
    }
}

/// Map keys become path segments, so only scalars that render as text are
/// accepted.
struct KeySerializer<'a> {
    path: &'a str,
}

impl KeySerializer<'_> {
    fn reject(&self, kind: &str) -> CodecError {
        CodecError::UnsupportedValueKind {
            path: self.path.to_string(),
            kind: format!("map key of kind {kind}"),
        }
    }
}

impl ser::Serializer for KeySerializer<'_> {
    type Ok = String;
    type Error = CodecError;

    type SerializeSeq = Impossible<String, CodecError>;
    type SerializeTuple = Impossible<String, CodecError>;
    type SerializeTupleStruct = Impossible<String, CodecError>;
    type SerializeTupleVariant = Impossible<String, CodecError>;
    type SerializeMap = Impossible<String, CodecError>;
    type SerializeStruct = Impossible<String, CodecError>;
    type SerializeStructVariant = Impossible<String, CodecError>;

    fn serialize_bool(self, v: bool) -> Result<String, CodecError> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String, CodecError> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String, CodecError> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String, CodecError> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String, CodecError> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String, CodecError> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String, CodecError> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String, CodecError> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String, CodecError> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<String, CodecError> {
        Err(self.reject("float"))
    }

    fn serialize_f64(self, _v: f64) -> Result<String, CodecError> {
        Err(self.reject("float"))
    }

    fn serialize_char(self, v: char) -> Result<String, CodecError> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, CodecError> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, CodecError> {
        Err(self.reject("bytes"))
    }

    fn serialize_none(self) -> Result<String, CodecError> {
        Err(self.reject("null"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<String, CodecError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String, CodecError> {
        Err(self.reject("null"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, CodecError> {
        Err(self.reject("null"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String, CodecError> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, CodecError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, CodecError> {
        Err(self.reject("enum"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, CodecError> {
        Err(self.reject("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, CodecError> {
        Err(self.reject("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, CodecError> {
        Err(self.reject("tuple"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, CodecError> {
        Err(self.reject("enum"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, CodecError> {
        Err(self.reject("map"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, CodecError> {
        Err(self.reject("struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, CodecError> {
        Err(self.reject("enum"))
    }
}
