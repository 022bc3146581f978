pub mod deserializer;
pub mod memory;
pub mod serializer;
pub mod socket;
