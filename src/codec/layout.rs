//! Bit layout of a single signal inside a payload.
//!
//! A signal is split into one [`BitSegment`] per byte it touches. Both packing and
//! unpacking walk the same segment list, so they are inverse by construction and
//! byte order is only interpreted while the segments are computed.

use serde::{Deserialize, Serialize};

use crate::types::signal::ByteOrder;

/// One contiguous run of bits inside a single payload byte.
///
/// "Take `num_bits` bits starting at `bit_offset` in `data[byte_index]` and place
/// them at `value_shift` in the raw value."
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BitSegment {
    pub byte_index: usize,
    /// Lowest bit of the run inside the byte (0..=7).
    pub bit_offset: u8,
    /// Number of bits of the run (1..=8).
    pub num_bits: u8,
    /// Position of the run inside the raw value, LSB-relative.
    pub value_shift: u8,
}

impl BitSegment {
    fn byte_mask(&self) -> u8 {
        (((1u16 << self.num_bits) - 1) as u8) << self.bit_offset
    }
}

/// Precomputed mapping from a signal's `start`/`length`/byte order to payload bits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FieldLayout {
    segments: Vec<BitSegment>,
}

impl FieldLayout {
    /// Decomposes a field into per-byte segments.
    ///
    /// - Big endian: `start` is the MSB. Take `bit+1` bits from the first byte,
    ///   then continue at bit 7 of the following byte.
    /// - Little endian: `start` is the LSB. Take `8-bit` bits from the first byte,
    ///   then continue at bit 0 of the following byte.
    pub fn new(start: u32, length: u32, byte_order: ByteOrder) -> Self {
        let mut segments: Vec<BitSegment> = Vec::with_capacity(length as usize / 8 + 2);
        let mut byte_index: usize = (start / 8) as usize;
        let mut bit_index: u32 = start % 8;
        let mut remaining: u32 = length;

        match byte_order {
            ByteOrder::BigEndian => {
                while remaining > 0 {
                    let num_bits: u32 = (bit_index + 1).min(remaining);
                    remaining -= num_bits;
                    segments.push(BitSegment {
                        byte_index,
                        bit_offset: (bit_index + 1 - num_bits) as u8,
                        num_bits: num_bits as u8,
                        value_shift: remaining as u8,
                    });
                    byte_index += 1;
                    bit_index = 7;
                }
            }
            ByteOrder::LittleEndian => {
                let mut value_shift: u32 = 0;
                while remaining > 0 {
                    let num_bits: u32 = (8 - bit_index).min(remaining);
                    segments.push(BitSegment {
                        byte_index,
                        bit_offset: bit_index as u8,
                        num_bits: num_bits as u8,
                        value_shift: value_shift as u8,
                    });
                    value_shift += num_bits;
                    remaining -= num_bits;
                    byte_index += 1;
                    bit_index = 0;
                }
            }
        }

        FieldLayout { segments }
    }

    /// Number of payload bytes needed to hold the whole field.
    pub fn required_bytes(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.byte_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Reads the raw (unsigned) bit pattern of the field.
    ///
    /// The caller guarantees `data.len() >= self.required_bytes()`.
    pub fn extract(&self, data: &[u8]) -> u64 {
        let mut result: u64 = 0;
        for segment in &self.segments {
            let mask: u8 = ((1u16 << segment.num_bits) - 1) as u8;
            let bits: u8 = (data[segment.byte_index] >> segment.bit_offset) & mask;
            result |= (bits as u64) << segment.value_shift;
        }
        result
    }

    /// Writes the low `length` bits of `raw` into `data`, clearing the target bits first.
    ///
    /// Segments beyond the end of `data` are dropped.
    pub fn insert(&self, data: &mut [u8], raw: u64) {
        for segment in &self.segments {
            let Some(byte) = data.get_mut(segment.byte_index) else {
                continue;
            };
            let mask: u8 = ((1u16 << segment.num_bits) - 1) as u8;
            let bits: u8 = ((raw >> segment.value_shift) as u8) & mask;
            *byte &= !(mask << segment.bit_offset);
            *byte |= bits << segment.bit_offset;
        }
    }

    /// Clears the bits covered by the field in a padding mask.
    ///
    /// Segments beyond the end of the mask are ignored.
    pub fn clear_in_mask(&self, mask: &mut [u8]) {
        for segment in &self.segments {
            if let Some(byte) = mask.get_mut(segment.byte_index) {
                *byte &= !segment.byte_mask();
            }
        }
    }

    /// Sawtooth numbers (`8*byte + bit`) of every bit covered by the field.
    pub fn bits(&self) -> impl Iterator<Item = usize> + '_ {
        self.segments.iter().flat_map(|segment| {
            let first: usize = segment.byte_index * 8 + segment.bit_offset as usize;
            first..first + segment.num_bits as usize
        })
    }
}

/// Mask with the low `length` bits set.
pub(crate) fn value_mask(length: u32) -> u64 {
    if length >= 64 {
        u64::MAX
    } else {
        (1u64 << length) - 1
    }
}

/// Sign-extends the low `length` bits of `raw`.
pub(crate) fn sign_extend(raw: u64, length: u32) -> i64 {
    if length == 0 || length >= 64 {
        return raw as i64;
    }
    let shift: u32 = 64 - length;
    ((raw << shift) as i64) >> shift
}
