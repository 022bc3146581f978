use bytes::Buf;
use serde::Deserializer;

use crate::error::EncodingError;

/// Reads fixed-width little-endian fields back out of a buffer.
///
/// Every read is bounds checked, so a truncated datagram surfaces as
/// [`EncodingError::NotEnoughData`] instead of a panic inside `bytes`.
pub struct WireDeserializer<B: Buf> {
    pub input: B,
    pub consumed: usize,
}

impl<B: Buf> WireDeserializer<B> {
    pub fn new(input: B) -> Self {
        Self { input, consumed: 0 }
    }

    fn take(&mut self, len: usize) -> Result<(), EncodingError> {
        let remaining = self.input.remaining();
        if remaining < len {
            return Err(EncodingError::NotEnoughData(remaining, len));
        }
        self.consumed += len;
        Ok(())
    }
}

macro_rules! get_le {
    ($fn: ident, $ty: ty, $get: ident, $visit: ident) => {
        fn $fn<V>(self, visitor: V) -> Result<V::Value, Self::Error>
        where
            V: serde::de::Visitor<'de>,
        {
            self.take(std::mem::size_of::<$ty>())?;
            visitor.$visit(self.input.$get())
        }
    };
}

macro_rules! unsupported {
    ($($fn: ident),*) => {
        $(
            fn $fn<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
            where
                V: serde::de::Visitor<'de>,
            {
                Err(EncodingError::CustomError)
            }
        )*
    };
}

impl<'de, 'a, B: Buf> Deserializer<'de> for &'a mut WireDeserializer<B> {
    type Error = EncodingError;

    get_le!(deserialize_i8, i8, get_i8, visit_i8);
    get_le!(deserialize_i16, i16, get_i16_le, visit_i16);
    get_le!(deserialize_i32, i32, get_i32_le, visit_i32);
    get_le!(deserialize_i64, i64, get_i64_le, visit_i64);
    get_le!(deserialize_u8, u8, get_u8, visit_u8);
    get_le!(deserialize_u16, u16, get_u16_le, visit_u16);
    get_le!(deserialize_u32, u32, get_u32_le, visit_u32);
    get_le!(deserialize_u64, u64, get_u64_le, visit_u64);
    get_le!(deserialize_f32, f32, get_f32_le, visit_f32);
    get_le!(deserialize_f64, f64, get_f64_le, visit_f64);

    unsupported!(
        deserialize_any,
        deserialize_char,
        deserialize_str,
        deserialize_string,
        deserialize_option,
        deserialize_seq,
        deserialize_map,
        deserialize_identifier,
        deserialize_ignored_any
    );

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        self.take(1)?;
        visitor.visit_bool(self.input.get_u8() != 0)
    }

    /// Consumes everything left in the buffer.
    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        let len = self.input.remaining();
        self.take(len)?;
        let bytes = self.input.copy_to_bytes(len);
        visitor.visit_byte_buf(bytes.to_vec())
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        visitor.visit_seq(Access {
            deserializer: self,
            len,
        })
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        self.deserialize_tuple(fields.len(), visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        Err(EncodingError::CustomError)
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

struct Access<'a, B: Buf> {
    deserializer: &'a mut WireDeserializer<B>,
    len: usize,
}

impl<'a, 'de: 'a, B: Buf> serde::de::SeqAccess<'de> for Access<'a, B> {
    type Error = EncodingError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: serde::de::DeserializeSeed<'de>,
    {
        if self.len > 0 {
            self.len -= 1;
            let value = serde::de::DeserializeSeed::deserialize(seed, &mut *self.deserializer)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len)
    }
}
