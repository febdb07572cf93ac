use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::conversion::Conversion;
use crate::types::{
    attributes::Attributes,
    value::{Choices, Comments},
};

/// Byte order of a signal (and of container headers).
///
/// In DBC `@1` is little endian (Intel) and `@0` is big endian (Motorola).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// DBC digit of the byte order.
    pub fn dbc_digit(&self) -> char {
        match self {
            ByteOrder::LittleEndian => '1',
            ByteOrder::BigEndian => '0',
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LittleEndian => f.write_str("little_endian"),
            ByteOrder::BigEndian => f.write_str("big_endian"),
        }
    }
}

/// A signal of a CAN message.
///
/// `start` is a sawtooth bit number (`8*byte + bit`, bit 7 = MSB of a byte). For
/// little-endian signals it addresses the least significant bit, for big-endian
/// signals the most significant one.
///
/// # Example
/// ```
/// use can_database::{ByteOrder, Signal};
/// let sig = Signal::new("Temperature", 0, 12)
///     .with_byte_order(ByteOrder::BigEndian)
///     .signed(true)
///     .with_scaling(0.01, 250.0)
///     .with_unit("degK");
/// assert_eq!(sig.scale(), 0.01);
/// assert!(sig.receivers.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub start: u32,
    /// Field width in bits (1..=64).
    pub length: u32,
    pub byte_order: ByteOrder,
    pub is_signed: bool,
    /// IEEE-754 field; only valid for lengths 32 and 64.
    pub is_float: bool,
    pub conversion: Conversion,
    /// Physical lower bound, `None` when unbounded.
    pub minimum: Option<f64>,
    /// Physical upper bound, `None` when unbounded.
    pub maximum: Option<f64>,
    pub unit: Option<String>,
    pub choices: Option<Choices>,
    pub receivers: Vec<String>,
    /// `true` when the signal selects a multiplexed branch.
    pub is_multiplexer: bool,
    /// Selector values this signal is present for.
    pub multiplexer_ids: Option<Vec<i64>>,
    /// Name of the selector this signal depends on.
    pub multiplexer_signal: Option<String>,
    /// Initial raw value.
    pub initial: Option<i128>,
    /// Raw value reported when the sender has no valid data.
    pub invalid: Option<i128>,
    pub comments: Comments,
    pub attributes: Attributes,
}

impl Signal {
    /// Creates an unsigned little-endian signal with identity scaling.
    pub fn new(name: impl Into<String>, start: u32, length: u32) -> Self {
        Signal {
            name: name.into(),
            start,
            length,
            byte_order: ByteOrder::LittleEndian,
            is_signed: false,
            is_float: false,
            conversion: Conversion::identity(),
            minimum: None,
            maximum: None,
            unit: None,
            choices: None,
            receivers: Vec::new(),
            is_multiplexer: false,
            multiplexer_ids: None,
            multiplexer_signal: None,
            initial: None,
            invalid: None,
            comments: Comments::default(),
            attributes: Attributes::default(),
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn signed(mut self, is_signed: bool) -> Self {
        self.is_signed = is_signed;
        self
    }

    pub fn float(mut self, is_float: bool) -> Self {
        self.is_float = is_float;
        self
    }

    pub fn with_scaling(mut self, scale: f64, offset: f64) -> Self {
        self.conversion = Conversion::linear(scale, offset);
        self
    }

    pub fn with_range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_choices(mut self, choices: Choices) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn with_receivers<I, S>(mut self, receivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.receivers = receivers.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the signal as a multiplexer (selector).
    pub fn multiplexer(mut self) -> Self {
        self.is_multiplexer = true;
        self
    }

    /// Makes the signal present only when `selector` has one of `ids`.
    pub fn multiplexed_by(mut self, selector: impl Into<String>, ids: Vec<i64>) -> Self {
        self.multiplexer_signal = Some(selector.into());
        self.multiplexer_ids = Some(ids);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.set(comment);
        self
    }

    pub fn scale(&self) -> f64 {
        self.conversion.scale()
    }

    pub fn offset(&self) -> f64 {
        self.conversion.offset()
    }

    /// Replaces scale and offset.
    pub fn set_scaling(&mut self, scale: f64, offset: f64) {
        self.conversion = Conversion::linear(scale, offset);
    }

    /// Language-less (or English) comment.
    pub fn comment(&self) -> Option<&str> {
        self.comments.get()
    }

    /// Range of raw integers accepted by the field: the union of the signed and
    /// unsigned interpretations of `length` bits.
    pub fn raw_capacity(&self) -> (i128, i128) {
        let length: u32 = self.length.clamp(1, 64);
        (-(1i128 << (length - 1)), (1i128 << length) - 1)
    }

    /// Raw range of the field as interpreted by its signedness.
    pub fn raw_range(&self) -> (i128, i128) {
        let length: u32 = self.length.clamp(1, 64);
        if self.is_signed {
            (-(1i128 << (length - 1)), (1i128 << (length - 1)) - 1)
        } else {
            (0, (1i128 << length) - 1)
        }
    }

    /// `true` if this signal is present for selector value `id`.
    pub fn is_present_for(&self, id: i64) -> bool {
        self.multiplexer_ids
            .as_ref()
            .is_some_and(|ids| ids.contains(&id))
    }

    /// Looks up a receiver by name. Names are case sensitive.
    pub fn has_receiver(&self, name: &str) -> bool {
        self.receivers.iter().any(|r| r == name)
    }
}
