//! Frame envelope: header, flags, typed payload variants, encode/decode.

pub mod flags;
pub mod message_type;
pub mod payload;
pub mod value;
pub mod wire;
