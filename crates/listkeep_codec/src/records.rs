//! Compact encodings of the records kept in local storage.
//!
//! These are the only types besides [`crate::Snapshot`] that cross the
//! storage boundary as bytes.

use crate::error::{CodecError, CodecResult};
use crate::model::{Item, ListRecord, User};
use crate::{Decode, Encode};

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CodecError::encoding_failed(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

impl Encode for User {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_json(self)
    }
}

impl Decode for User {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_json(bytes)
    }
}

impl Encode for Vec<ListRecord> {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_json(self)
    }
}

impl Decode for Vec<ListRecord> {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_json(bytes)
    }
}

impl Encode for Vec<Item> {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_json(self)
    }
}

impl Decode for Vec<Item> {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_json(bytes)
    }
}

/// Encodes an item sequence in its stored form.
pub fn encode_items(items: &[Item]) -> CodecResult<Vec<u8>> {
    to_json(items)
}

/// Decodes an item sequence from its stored form.
pub fn decode_items(bytes: &[u8]) -> CodecResult<Vec<Item>> {
    from_json(bytes)
}
