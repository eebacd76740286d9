//! Binding of a [`Node`] tree onto serde targets.
//!
//! Values read back from the keeper are usually text, so scalar requests
//! coerce: a target asking for an integer, float or boolean parses the stored
//! text, and a target asking for a string accepts any scalar in its rendered
//! form. Field names must match the tree segments exactly; use
//! `#[serde(rename_all = "...")]` on the target to adapt casing.

use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor, value::StrDeserializer,
};

use super::{
    CodecError,
    tree::{Node, indexed_children, is_sequence, visible_children},
};
use crate::kv::{Scalar, path};

/// Deserializer reading from a borrowed [`Node`].
pub(crate) struct NodeDeserializer<'a> {
    node: &'a Node,
    path: String,
}

impl<'a> NodeDeserializer<'a> {
    pub(crate) fn new(node: &'a Node) -> Self {
        Self {
            node,
            path: String::new(),
        }
    }

    fn at(node: &'a Node, parent: &str, name: &str) -> Self {
        Self {
            node,
            path: path::join(parent, name),
        }
    }

    fn scalar(&self) -> Option<&'a Scalar> {
        match self.node {
            Node::Leaf(scalar) => Some(scalar),
            Node::Branch(_) => None,
        }
    }

    fn mismatch(&self, expected: &str) -> CodecError {
        let found = match self.node {
            Node::Leaf(scalar) => format!("{} '{}'", scalar.kind(), scalar),
            Node::Branch(_) => "a directory".to_string(),
        };
        CodecError::Binding {
            path: self.path.clone(),
            reason: format!("expected {expected}, found {found}"),
        }
    }

    fn integer<'de, V: Visitor<'de>>(&self, visitor: V) -> Result<V::Value, CodecError> {
        match self.scalar() {
            Some(Scalar::Int(n)) => visitor.visit_i64(*n),
            Some(Scalar::Text(s)) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<i64>() {
                    visitor.visit_i64(n)
                } else if let Ok(n) = s.parse::<u64>() {
                    visitor.visit_u64(n)
                } else {
                    Err(self.mismatch("an integer"))
                }
            }
            _ => Err(self.mismatch("an integer")),
        }
    }

    fn float<'de, V: Visitor<'de>>(&self, visitor: V) -> Result<V::Value, CodecError> {
        match self.scalar() {
            Some(Scalar::Float(f)) => visitor.visit_f64(*f),
            Some(Scalar::Int(n)) => visitor.visit_i64(*n),
            Some(Scalar::Text(s)) => match s.trim().parse::<f64>() {
                Ok(f) => visitor.visit_f64(f),
                Err(_) => Err(self.mismatch("a float")),
            },
            _ => Err(self.mismatch("a float")),
        }
    }

    fn text<'de, V: Visitor<'de>>(&self, visitor: V) -> Result<V::Value, CodecError> {
        match self.scalar() {
            Some(Scalar::Text(s)) => visitor.visit_str(s),
            Some(other) => visitor.visit_string(other.render()),
            None => Err(self.mismatch("a string")),
        }
    }

    fn sequence<'de, V: Visitor<'de>>(&self, visitor: V) -> Result<V::Value, CodecError> {
        let Node::Branch(children) = self.node else {
            return Err(self.mismatch("a sequence"));
        };
        match indexed_children(children) {
            Some(items) => visitor.visit_seq(NodeSeq {
                items: items.into_iter(),
                path: self.path.clone(),
            }),
            None => Err(self.mismatch("a sequence")),
        }
    }

    fn mapping<'de, V: Visitor<'de>>(&self, visitor: V) -> Result<V::Value, CodecError> {
        let Node::Branch(children) = self.node else {
            return Err(self.mismatch("a mapping"));
        };
        visitor.visit_map(NodeMap {
            entries: visible_children(children).collect::<Vec<_>>().into_iter(),
            pending: None,
            path: self.path.clone(),
        })
    }
}

macro_rules! deserialize_integers {
    ($($method:ident),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
            self.integer(visitor).map_err(|e| e.with_path(&self.path))
        }
    )*};
}

impl<'de, 'a> Deserializer<'de> for NodeDeserializer<'a> {
    type Error = CodecError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        let result = match self.node {
            Node::Leaf(Scalar::Null) => visitor.visit_unit(),
            Node::Leaf(Scalar::Bool(b)) => visitor.visit_bool(*b),
            Node::Leaf(Scalar::Int(n)) => visitor.visit_i64(*n),
            Node::Leaf(Scalar::Float(f)) => visitor.visit_f64(*f),
            Node::Leaf(Scalar::Text(s)) => visitor.visit_str(s),
            Node::Branch(children) if is_sequence(children) => self.sequence(visitor),
            Node::Branch(_) => self.mapping(visitor),
        };
        result.map_err(|e| e.with_path(&self.path))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        let result = match self.scalar() {
            Some(Scalar::Bool(b)) => visitor.visit_bool(*b),
            Some(Scalar::Text(s)) => match s.trim().parse::<bool>() {
                Ok(b) => visitor.visit_bool(b),
                Err(_) => Err(self.mismatch("a boolean")),
            },
            _ => Err(self.mismatch("a boolean")),
        };
        result.map_err(|e| e.with_path(&self.path))
    }

    deserialize_integers!(
        deserialize_i8,
        deserialize_i16,
        deserialize_i32,
        deserialize_i64,
        deserialize_i128,
        deserialize_u8,
        deserialize_u16,
        deserialize_u32,
        deserialize_u64,
        deserialize_u128,
    );

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.float(visitor).map_err(|e| e.with_path(&self.path))
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.float(visitor).map_err(|e| e.with_path(&self.path))
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        let result = match self.scalar() {
            Some(Scalar::Text(s)) if s.chars().count() == 1 => match s.chars().next() {
                Some(c) => visitor.visit_char(c),
                None => Err(self.mismatch("a character")),
            },
            _ => Err(self.mismatch("a character")),
        };
        result.map_err(|e| e.with_path(&self.path))
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.text(visitor).map_err(|e| e.with_path(&self.path))
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.text(visitor).map_err(|e| e.with_path(&self.path))
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        let result = match self.scalar() {
            Some(Scalar::Text(s)) => visitor.visit_bytes(s.as_bytes()),
            Some(_) => Err(self.mismatch("bytes")),
            None => self.sequence(visitor),
        };
        result.map_err(|e| e.with_path(&self.path))
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.scalar() {
            Some(scalar) if scalar.is_empty() => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.scalar() {
            Some(scalar) if scalar.is_empty() => visitor.visit_unit(),
            _ => Err(self.mismatch("an empty value")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.sequence(visitor).map_err(|e| e.with_path(&self.path))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.mapping(visitor).map_err(|e| e.with_path(&self.path))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        let result = match self.node {
            Node::Leaf(Scalar::Text(s)) => {
                let variant: StrDeserializer<'_, CodecError> = s.as_str().into_deserializer();
                visitor.visit_enum(variant)
            }
            Node::Branch(children) => {
                let mut visible = visible_children(children);
                match (visible.next(), visible.next()) {
                    (Some((variant, node)), None) => visitor.visit_enum(NodeEnum {
                        variant,
                        node,
                        path: self.path.clone(),
                    }),
                    _ => Err(self.mismatch("a single enum variant")),
                }
            }
            Node::Leaf(_) => Err(self.mismatch("an enum variant name")),
        };
        result.map_err(|e| e.with_path(&self.path))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        visitor.visit_unit()
    }
}

struct NodeSeq<'a> {
    items: std::vec::IntoIter<(usize, &'a Node)>,
    path: String,
}

impl<'de, 'a> SeqAccess<'de> for NodeSeq<'a> {
    type Error = CodecError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, CodecError> {
        match self.items.next() {
            Some((index, node)) => seed
                .deserialize(NodeDeserializer::at(node, &self.path, &index.to_string()))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct NodeMap<'a> {
    entries: std::vec::IntoIter<(&'a String, &'a Node)>,
    pending: Option<(&'a String, &'a Node)>,
    path: String,
}

impl<'de, 'a> MapAccess<'de> for NodeMap<'a> {
    type Error = CodecError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, CodecError> {
        let Some((name, node)) = self.entries.next() else {
            return Ok(None);
        };
        self.pending = Some((name, node));

        // Keys go through the same coercions as leaves so integer-keyed maps bind
        let key = Node::Leaf(Scalar::Text(name.clone()));
        seed.deserialize(NodeDeserializer::at(&key, &self.path, name))
            .map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, CodecError> {
        match self.pending.take() {
            Some((name, node)) => seed.deserialize(NodeDeserializer::at(node, &self.path, name)),
            None => Err(de::Error::custom("map value requested before its key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct NodeEnum<'a> {
    variant: &'a String,
    node: &'a Node,
    path: String,
}

impl<'de, 'a> EnumAccess<'de> for NodeEnum<'a> {
    type Error = CodecError;
    type Variant = NodeDeserializer<'a>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), CodecError> {
        let name: StrDeserializer<'_, CodecError> = self.variant.as_str().into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((
            variant,
            NodeDeserializer::at(self.node, &self.path, self.variant),
        ))
    }
}

impl<'de, 'a> VariantAccess<'de> for NodeDeserializer<'a> {
    type Error = CodecError;

    fn unit_variant(self) -> Result<(), CodecError> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, CodecError> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_map(visitor)
    }
}
