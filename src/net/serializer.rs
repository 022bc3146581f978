use bytes::BufMut;
use serde::{
    ser::{
        Impossible, SerializeStruct, SerializeTuple, SerializeTupleStruct,
    },
    Serialize, Serializer,
};

use crate::error::EncodingError;

/// Writes fixed-width little-endian fields into a buffer.
///
/// Only the shapes used by wire headers are supported: integers, raw bytes,
/// structs and tuples. Variable-length containers have no length prefix on
/// this wire, so sequences and maps are rejected.
pub struct WireSerializer<B: BufMut> {
    pub output: B,
    pub size: usize,
}

impl<B: BufMut> WireSerializer<B> {
    pub fn new(output: B) -> Self {
        Self { output, size: 0 }
    }

    fn reserve(&self, len: usize) -> Result<(), EncodingError> {
        if self.output.remaining_mut() < len {
            return Err(EncodingError::NotEnoughData(
                self.output.remaining_mut(),
                len,
            ));
        }
        Ok(())
    }
}

macro_rules! put_le {
    ($fn: ident, $ty: ty, $put: ident) => {
        fn $fn(self, v: $ty) -> Result<Self::Ok, Self::Error> {
            let len = std::mem::size_of::<$ty>();
            self.reserve(len)?;
            self.output.$put(v);
            self.size += len;
            Ok(())
        }
    };
}

impl<'a, B: BufMut> Serializer for &'a mut WireSerializer<B> {
    type Ok = ();

    type Error = EncodingError;

    type SerializeSeq = Impossible<(), EncodingError>;

    type SerializeTuple = Self;

    type SerializeTupleStruct = Self;

    type SerializeTupleVariant = Impossible<(), EncodingError>;

    type SerializeMap = Impossible<(), EncodingError>;

    type SerializeStruct = Self;

    type SerializeStructVariant = Impossible<(), EncodingError>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        self.serialize_u8(u8::from(v))
    }

    put_le!(serialize_i8, i8, put_i8);
    put_le!(serialize_i16, i16, put_i16_le);
    put_le!(serialize_i32, i32, put_i32_le);
    put_le!(serialize_i64, i64, put_i64_le);
    put_le!(serialize_u8, u8, put_u8);
    put_le!(serialize_u16, u16, put_u16_le);
    put_le!(serialize_u32, u32, put_u32_le);
    put_le!(serialize_u64, u64, put_u64_le);
    put_le!(serialize_f32, f32, put_f32_le);
    put_le!(serialize_f64, f64, put_f64_le);

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        self.serialize_u32(v.into())
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        self.serialize_bytes(v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        self.reserve(v.len())?;
        self.output.put_slice(v);
        self.size += v.len();
        Ok(())
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        let index: u8 = variant_index.try_into()?;
        index.serialize(self)
    }

    fn serialize_newtype_struct<T: ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize,
    {
        Err(EncodingError::CustomError)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Err(EncodingError::CustomError)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(EncodingError::CustomError)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Err(EncodingError::CustomError)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(EncodingError::CustomError)
    }
}

impl<'a, B: BufMut> SerializeStruct for &'a mut WireSerializer<B> {
    type Ok = ();

    type Error = EncodingError;

    fn serialize_field<T: ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}

impl<'a, B: BufMut> SerializeTuple for &'a mut WireSerializer<B> {
    type Ok = ();

    type Error = EncodingError;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}

impl<'a, B: BufMut> SerializeTupleStruct for &'a mut WireSerializer<B> {
    type Ok = ();

    type Error = EncodingError;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}
