//! Container messages: payloads made of `(header id, length, payload)` entries.
//!
//! Every entry starts with a 3-byte header id, in the container's header byte order,
//! followed by one length byte and the contained message's payload.

use serde::{Deserialize, Serialize};

use crate::types::{signal::ByteOrder, value::SignalMap};

/// Size of an entry header: 3 bytes of id plus 1 length byte.
pub(crate) const HEADER_SIZE: usize = 4;

/// Identifies the contained message of an entry to encode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ContainedKey {
    HeaderId(u32),
    Name(String),
}

impl From<u32> for ContainedKey {
    fn from(id: u32) -> Self {
        ContainedKey::HeaderId(id)
    }
}

impl From<&str> for ContainedKey {
    fn from(name: &str) -> Self {
        ContainedKey::Name(name.to_string())
    }
}

/// Content of an entry to encode: signal values or an already encoded payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ContainedPayload {
    Signals(SignalMap),
    Raw(Vec<u8>),
}

/// One entry of a container message to encode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainedEntry {
    pub key: ContainedKey,
    pub payload: ContainedPayload,
}

impl ContainedEntry {
    pub fn signals(key: impl Into<ContainedKey>, signals: SignalMap) -> Self {
        ContainedEntry {
            key: key.into(),
            payload: ContainedPayload::Signals(signals),
        }
    }

    /// Raw entry. A header id unknown to the container is accepted as-is.
    pub fn raw(key: impl Into<ContainedKey>, data: Vec<u8>) -> Self {
        ContainedEntry {
            key: key.into(),
            payload: ContainedPayload::Raw(data),
        }
    }
}

/// One decoded entry of a container message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ContainedDecoded {
    Known {
        name: String,
        header_id: u32,
        signals: SignalMap,
    },
    /// Header id not declared by the container; payload returned undecoded.
    Unknown { header_id: u32, data: Vec<u8> },
}

impl ContainedDecoded {
    pub fn header_id(&self) -> u32 {
        match self {
            ContainedDecoded::Known { header_id, .. } | ContainedDecoded::Unknown { header_id, .. } => {
                *header_id
            }
        }
    }
}

/// Writes an entry header.
pub(crate) fn write_header(out: &mut Vec<u8>, header_id: u32, length: u8, order: ByteOrder) {
    let id: [u8; 4] = header_id.to_be_bytes();
    match order {
        ByteOrder::BigEndian => out.extend_from_slice(&id[1..]),
        ByteOrder::LittleEndian => out.extend([id[3], id[2], id[1]]),
    }
    out.push(length);
}

/// Reads the header id of an entry starting at `header[0]`.
pub(crate) fn read_header_id(header: &[u8], order: ByteOrder) -> u32 {
    match order {
        ByteOrder::BigEndian => u32::from_be_bytes([0, header[0], header[1], header[2]]),
        ByteOrder::LittleEndian => u32::from_le_bytes([header[0], header[1], header[2], 0]),
    }
}

/// Raw split of a container payload.
pub(crate) struct Entry<'a> {
    pub header_id: u32,
    pub data: &'a [u8],
}

/// Splits a container payload into its entries.
///
/// Errors name what went wrong; the caller adds the message name.
pub(crate) fn split_entries(data: &[u8], order: ByteOrder) -> Result<Vec<Entry<'_>>, String> {
    let mut entries: Vec<Entry<'_>> = Vec::new();
    let mut pos: usize = 0;
    while pos < data.len() {
        if data.len() - pos < HEADER_SIZE {
            return Err(format!(
                "{} trailing bytes at offset {} are too short for an entry header",
                data.len() - pos,
                pos
            ));
        }
        let header_id: u32 = read_header_id(&data[pos..pos + 3], order);
        let length: usize = data[pos + 3] as usize;
        let start: usize = pos + HEADER_SIZE;
        if start + length > data.len() {
            return Err(format!(
                "entry 0x{:06X} at offset {} announces {} bytes, only {} remain",
                header_id,
                pos,
                length,
                data.len() - start
            ));
        }
        entries.push(Entry {
            header_id,
            data: &data[start..start + length],
        });
        pos = start + length;
    }
    Ok(entries)
}
