use log::trace;
use serde::{Deserialize, Serialize};

use crate::codec::{
    container::{
        ContainedDecoded, ContainedEntry, ContainedKey, ContainedPayload, split_entries,
        write_header,
    },
    conversion::{DecodeContext, EncodeContext},
    layout::FieldLayout,
    multiplex::{Codec, SignalTreeNode},
};
use crate::options::{DecodeOptions, EncodeOptions};
use crate::types::{
    attributes::Attributes,
    errors::{DecodeError, EncodeError, LookupError, SchemaError},
    signal::{ByteOrder, Signal},
    value::{Comments, SignalMap},
};

/// Largest payload of a CAN FD frame.
pub const MAX_MESSAGE_LENGTH: usize = 64;

/// Signal group of a message (`SIG_GROUP_`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalGroup {
    pub name: String,
    pub repetitions: u32,
    pub signal_names: Vec<String>,
}

/// Result of decoding a payload: a signal map, or the entries of a container message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DecodedMessage {
    Signals(SignalMap),
    Container(Vec<ContainedDecoded>),
}

impl DecodedMessage {
    pub fn signals(&self) -> Option<&SignalMap> {
        match self {
            DecodedMessage::Signals(map) => Some(map),
            DecodedMessage::Container(_) => None,
        }
    }

    pub fn into_signals(self) -> Option<SignalMap> {
        match self {
            DecodedMessage::Signals(map) => Some(map),
            DecodedMessage::Container(_) => None,
        }
    }

    pub fn entries(&self) -> Option<&[ContainedDecoded]> {
        match self {
            DecodedMessage::Container(entries) => Some(entries),
            DecodedMessage::Signals(_) => None,
        }
    }
}

/// CAN message: frame id, payload length and the signals packed into it.
///
/// Fields that shape the payload (frame id, length, signals, unused bit pattern,
/// contained messages) are private and changed through setters, which rebuild the
/// derived codec. [`Message::refresh`] re-validates the message.
///
/// # Example
/// ```
/// use can_database::{EncodeOptions, Message, Signal, SignalMap};
/// let msg = Message::new(0x100, "Status", 2, vec![Signal::new("Counter", 0, 8)]);
/// let mut data = SignalMap::new();
/// data.insert("Counter".into(), 7.into());
/// assert_eq!(msg.encode(&data, &EncodeOptions::default()).unwrap(), vec![7, 0]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    frame_id: u32,
    is_extended_frame: bool,
    name: String,
    length: usize,
    signals: Vec<Signal>,
    unused_bit_pattern: u8,
    contained_messages: Option<Vec<Message>>,
    /// CAN FD frame.
    pub is_fd: bool,
    pub senders: Vec<String>,
    /// Cycle time in milliseconds.
    pub cycle_time: Option<u32>,
    /// Send type label, e.g. `Cyclic`.
    pub send_type: Option<String>,
    pub comments: Comments,
    pub attributes: Attributes,
    pub signal_groups: Vec<SignalGroup>,
    /// Header id when this message is carried inside a container message.
    pub header_id: Option<u32>,
    /// Byte order of the entry headers when this message is a container.
    pub header_byte_order: ByteOrder,
    pub bus_name: Option<String>,
    codec: Codec,
}

impl Message {
    /// Creates a standard-frame message. The codec is built right away; call
    /// [`Message::refresh`] with `strict = true` to validate the layout.
    pub fn new(frame_id: u32, name: impl Into<String>, length: usize, signals: Vec<Signal>) -> Self {
        let mut msg: Message = Message {
            frame_id,
            is_extended_frame: false,
            name: name.into(),
            length,
            signals,
            unused_bit_pattern: 0x00,
            contained_messages: None,
            is_fd: false,
            senders: Vec::new(),
            cycle_time: None,
            send_type: None,
            comments: Comments::default(),
            attributes: Attributes::default(),
            signal_groups: Vec::new(),
            header_id: None,
            header_byte_order: ByteOrder::BigEndian,
            bus_name: None,
            codec: Codec::default(),
        };
        msg.rebuild_codec();
        msg
    }

    pub fn with_extended_frame(mut self, is_extended_frame: bool) -> Self {
        self.is_extended_frame = is_extended_frame;
        self
    }

    pub fn with_fd(mut self, is_fd: bool) -> Self {
        self.is_fd = is_fd;
        self
    }

    pub fn with_senders<I, S>(mut self, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.senders = senders.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cycle_time(mut self, cycle_time: u32) -> Self {
        self.cycle_time = Some(cycle_time);
        self
    }

    pub fn with_unused_bit_pattern(mut self, pattern: u8) -> Self {
        self.unused_bit_pattern = pattern;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.set(comment);
        self
    }

    /// Turns the message into a container of `messages`.
    pub fn with_contained_messages(mut self, messages: Vec<Message>) -> Self {
        self.set_contained_messages(Some(messages));
        self
    }

    /// Sets the header id used when this message is carried inside a container.
    pub fn with_header_id(mut self, header_id: u32) -> Self {
        self.header_id = Some(header_id);
        self
    }

    pub fn with_header_byte_order(mut self, order: ByteOrder) -> Self {
        self.header_byte_order = order;
        self
    }

    // ---- structural getters ----

    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    pub fn is_extended_frame(&self) -> bool {
        self.is_extended_frame
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload length in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Signals in declaration order.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn unused_bit_pattern(&self) -> u8 {
        self.unused_bit_pattern
    }

    pub fn contained_messages(&self) -> Option<&[Message]> {
        self.contained_messages.as_deref()
    }

    pub fn is_container(&self) -> bool {
        self.contained_messages.is_some()
    }

    /// `true` when at least one multiplexer selects signals.
    pub fn is_multiplexed(&self) -> bool {
        self.codec.is_multiplexed()
    }

    /// Language-less (or English) comment.
    pub fn comment(&self) -> Option<&str> {
        self.comments.get()
    }

    /// Header id of this message inside a container; the frame id when none is set.
    pub fn contained_header_id(&self) -> u32 {
        self.header_id.unwrap_or(self.frame_id)
    }

    // ---- structural setters ----

    pub fn set_frame_id(&mut self, frame_id: u32) {
        self.frame_id = frame_id;
    }

    pub fn set_extended_frame(&mut self, is_extended_frame: bool) {
        self.is_extended_frame = is_extended_frame;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_length(&mut self, length: usize) {
        self.length = length;
        self.rebuild_codec();
    }

    pub fn set_signals(&mut self, signals: Vec<Signal>) {
        self.signals = signals;
        self.rebuild_codec();
    }

    pub fn add_signal(&mut self, signal: Signal) {
        self.signals.push(signal);
        self.rebuild_codec();
    }

    /// Runs `f` on the signal list, then rebuilds the codec.
    pub fn update_signals<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Vec<Signal>) -> R,
    {
        let result: R = f(&mut self.signals);
        self.rebuild_codec();
        result
    }

    pub fn set_unused_bit_pattern(&mut self, pattern: u8) {
        self.unused_bit_pattern = pattern;
    }

    pub fn set_contained_messages(&mut self, messages: Option<Vec<Message>>) {
        self.contained_messages = messages;
    }

    // ---- lookups ----

    /// Returns the signal called `name` (case sensitive).
    pub fn get_signal_by_name(&self, name: &str) -> Result<&Signal, LookupError> {
        self.signals
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| LookupError::Signal {
                message: self.name.clone(),
                signal: name.to_string(),
            })
    }

    /// Contained message by header id.
    pub fn get_contained_message_by_header_id(&self, header_id: u32) -> Option<&Message> {
        self.contained_messages
            .as_ref()?
            .iter()
            .find(|m| m.contained_header_id() == header_id)
    }

    pub fn get_contained_message_by_name(&self, name: &str) -> Option<&Message> {
        self.contained_messages
            .as_ref()?
            .iter()
            .find(|m| m.name == name)
    }

    /// Nested view of the multiplex tree: plain names, and selectors with their branches.
    pub fn signal_tree(&self) -> Vec<SignalTreeNode> {
        self.codec.signal_tree(&self.signals)
    }

    /// Signals active for the selector values found in `data`.
    pub fn gather_signals(
        &self,
        data: &SignalMap,
        options: &EncodeOptions,
    ) -> Result<Vec<&Signal>, EncodeError> {
        let ctx: EncodeContext<'_> = self.encode_context(options);
        let mut out: Vec<&Signal> = Vec::new();
        self.codec.gather(&self.signals, data, &ctx, &mut out)?;
        Ok(out)
    }

    // ---- validation ----

    /// Rebuilds the codec and validates the message.
    ///
    /// Signal widths and the payload length are always checked, and no signal may
    /// reach past [`MAX_MESSAGE_LENGTH`] bytes. With `strict`, the frame id width, the
    /// bounds against [`Message::length`], multiplexer references and overlaps inside
    /// every multiplex branch are checked as well.
    pub fn refresh(&mut self, strict: bool) -> Result<(), SchemaError> {
        if self.length > MAX_MESSAGE_LENGTH {
            return Err(SchemaError::InvalidMessageLength {
                message: self.name.clone(),
                length: self.length,
                maximum: MAX_MESSAGE_LENGTH,
            });
        }
        for signal in &self.signals {
            if signal.length == 0 || signal.length > 64 {
                return Err(SchemaError::InvalidSignalLength {
                    message: self.name.clone(),
                    signal: signal.name.clone(),
                    length: signal.length,
                });
            }
            if signal.is_float && signal.length != 32 && signal.length != 64 {
                return Err(SchemaError::InvalidFloatLength {
                    message: self.name.clone(),
                    signal: signal.name.clone(),
                    length: signal.length,
                });
            }
        }
        self.check_signal_bounds(MAX_MESSAGE_LENGTH)?;

        self.rebuild_codec();

        if strict {
            self.check_frame_id()?;
            self.check_signal_names()?;
            self.check_signal_bounds(self.length)?;
            self.check_multiplexer_references()?;
            self.codec.check_overlaps(&self.name, &self.signals)?;
        }

        if let Some(contained) = self.contained_messages.as_mut() {
            for message in contained.iter_mut() {
                message.refresh(strict)?;
            }
        }
        Ok(())
    }

    fn rebuild_codec(&mut self) {
        self.codec = Codec::build(&self.name, &self.signals, self.length);
        trace!("codec of message '{}' rebuilt", self.name);
    }

    fn check_frame_id(&self) -> Result<(), SchemaError> {
        let (width, limit) = if self.is_extended_frame {
            (29u8, 0x1FFF_FFFFu32)
        } else {
            (11u8, 0x7FFu32)
        };
        if self.frame_id > limit {
            return Err(SchemaError::FrameIdOutOfRange {
                message: self.name.clone(),
                frame_id: self.frame_id,
                width,
            });
        }
        Ok(())
    }

    fn check_signal_names(&self) -> Result<(), SchemaError> {
        for (idx, signal) in self.signals.iter().enumerate() {
            if self.signals[..idx].iter().any(|s| s.name == signal.name) {
                return Err(SchemaError::DuplicateSignalName {
                    message: self.name.clone(),
                    signal: signal.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Rejects signals reaching past the first `limit` bytes.
    fn check_signal_bounds(&self, limit: usize) -> Result<(), SchemaError> {
        for signal in &self.signals {
            let required: usize =
                FieldLayout::new(signal.start, signal.length, signal.byte_order).required_bytes();
            if required > limit {
                return Err(SchemaError::SignalOutOfBounds {
                    message: self.name.clone(),
                    signal: signal.name.clone(),
                    required,
                    length: limit,
                });
            }
        }
        Ok(())
    }

    fn check_multiplexer_references(&self) -> Result<(), SchemaError> {
        for signal in &self.signals {
            let Some(selector) = signal.multiplexer_signal.as_deref() else {
                continue;
            };
            let known: bool = self
                .signals
                .iter()
                .any(|s| s.name == selector && s.is_multiplexer);
            if !known {
                return Err(SchemaError::UnknownMultiplexer {
                    message: self.name.clone(),
                    signal: signal.name.clone(),
                    multiplexer: selector.to_string(),
                });
            }
        }
        Ok(())
    }

    // ---- encode ----

    fn encode_context(&self, options: &EncodeOptions) -> EncodeContext<'_> {
        EncodeContext {
            message: &self.name,
            scaling: options.scaling,
            strict: options.strict,
        }
    }

    /// Encodes a map of signal values into a payload of [`Message::length`] bytes.
    ///
    /// # Parameters
    /// - `data`: signal name → value. Choice names and [`NamedSignalValue`](crate::NamedSignalValue)s
    ///   are translated through the signal's choices.
    /// - `options`: scaling, padding and strict mode.
    ///
    /// # Errors
    /// - [`EncodeError::MissingSignals`] / [`EncodeError::UnknownSignals`] (strict only).
    /// - [`EncodeError::BelowMinimum`] / [`EncodeError::AboveMaximum`] (strict only).
    /// - [`EncodeError::InvalidMultiplexId`] when a selector value has no branch.
    /// - [`EncodeError::ContainerExpected`] for container messages.
    pub fn encode(&self, data: &SignalMap, options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
        if self.is_container() {
            return Err(EncodeError::ContainerExpected {
                message: self.name.clone(),
            });
        }
        let ctx: EncodeContext<'_> = self.encode_context(options);
        if options.strict {
            self.check_encode_input(data, &ctx)?;
        }

        let mut buffer: Vec<u8> = vec![0; self.length];
        let mut mask: Vec<u8> = vec![0xFF; self.length];
        self.codec
            .encode(&self.signals, data, &ctx, &mut buffer, &mut mask)?;

        if options.padding {
            for (byte, unused) in buffer.iter_mut().zip(&mask) {
                *byte |= unused & self.unused_bit_pattern;
            }
        }
        Ok(buffer)
    }

    fn check_encode_input(&self, data: &SignalMap, ctx: &EncodeContext<'_>) -> Result<(), EncodeError> {
        let mut active: Vec<&Signal> = Vec::new();
        self.codec.gather(&self.signals, data, ctx, &mut active)?;

        let missing: Vec<String> = active
            .iter()
            .filter(|s| !data.contains_key(&s.name))
            .map(|s| s.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(EncodeError::MissingSignals {
                message: self.name.clone(),
                signals: missing,
            });
        }

        let unknown: Vec<String> = data
            .keys()
            .filter(|key| !active.iter().any(|s| &s.name == *key))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(EncodeError::UnknownSignals {
                message: self.name.clone(),
                signals: unknown,
            });
        }
        Ok(())
    }

    /// Encodes the entries of a container message.
    ///
    /// Each entry is written as a 3-byte header id, a length byte and the payload.
    /// With `padding`, the result is filled up to [`Message::length`] with the unused
    /// bit pattern; otherwise it is as long as its entries.
    pub fn encode_container(
        &self,
        entries: &[ContainedEntry],
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, EncodeError> {
        let Some(contained) = self.contained_messages.as_ref() else {
            return Err(EncodeError::NotAContainer {
                message: self.name.clone(),
            });
        };

        let mut out: Vec<u8> = Vec::with_capacity(self.length);
        for entry in entries {
            let inner: Option<&Message> = match &entry.key {
                ContainedKey::HeaderId(id) => {
                    contained.iter().find(|m| m.contained_header_id() == *id)
                }
                ContainedKey::Name(name) => contained.iter().find(|m| &m.name == name),
            };
            let (header_id, payload): (u32, Vec<u8>) = match (&entry.payload, inner) {
                (ContainedPayload::Signals(map), Some(inner)) => {
                    (inner.contained_header_id(), inner.encode(map, options)?)
                }
                (ContainedPayload::Raw(data), Some(inner)) => {
                    (inner.contained_header_id(), data.clone())
                }
                (ContainedPayload::Raw(data), None) => match &entry.key {
                    ContainedKey::HeaderId(id) => (*id, data.clone()),
                    ContainedKey::Name(name) => {
                        return Err(self.unknown_contained(name));
                    }
                },
                (ContainedPayload::Signals(_), None) => {
                    let label: String = match &entry.key {
                        ContainedKey::HeaderId(id) => format!("with header id 0x{id:X}"),
                        ContainedKey::Name(name) => name.clone(),
                    };
                    return Err(self.unknown_contained(&label));
                }
            };

            let Ok(length) = u8::try_from(payload.len()) else {
                return Err(EncodeError::ContainedPayloadTooLong {
                    message: self.name.clone(),
                    contained: format!("0x{header_id:X}"),
                    length: payload.len(),
                });
            };
            write_header(&mut out, header_id, length, self.header_byte_order);
            out.extend_from_slice(&payload);
        }

        if out.len() > self.length {
            return Err(EncodeError::ContainerTooLong {
                message: self.name.clone(),
                length: out.len(),
                capacity: self.length,
            });
        }
        if options.padding {
            out.resize(self.length, self.unused_bit_pattern);
        }
        Ok(out)
    }

    fn unknown_contained(&self, contained: &str) -> EncodeError {
        EncodeError::UnknownContainedMessage {
            message: self.name.clone(),
            contained: contained.to_string(),
        }
    }

    // ---- decode ----

    /// Decodes a payload.
    ///
    /// Container messages are split into their entries when `decode_containers` is
    /// set and rejected otherwise.
    pub fn decode(&self, data: &[u8], options: &DecodeOptions) -> Result<DecodedMessage, DecodeError> {
        if self.is_container() {
            if !options.decode_containers {
                return Err(DecodeError::ContainerDecodingDisabled {
                    message: self.name.clone(),
                });
            }
            return self.decode_container(data, options).map(DecodedMessage::Container);
        }
        self.decode_signals(data, options).map(DecodedMessage::Signals)
    }

    /// Decodes a payload of a plain (non-container) message into a signal map.
    ///
    /// Bytes beyond [`Message::length`] are ignored. A shorter payload is an error
    /// unless `allow_truncated` is set, in which case only the signals lying inside
    /// the supplied bytes are returned.
    pub fn decode_signals(&self, data: &[u8], options: &DecodeOptions) -> Result<SignalMap, DecodeError> {
        if self.is_container() {
            return Err(DecodeError::ContainerDecodingDisabled {
                message: self.name.clone(),
            });
        }
        if data.len() < self.length && !options.allow_truncated {
            return Err(DecodeError::NotEnoughData {
                message: self.name.clone(),
                expected: self.length,
                actual: data.len(),
            });
        }
        let ctx: DecodeContext = DecodeContext {
            scaling: options.scaling,
            decode_choices: options.decode_choices,
        };
        let mut out: SignalMap = SignalMap::new();
        self.codec.decode(
            &self.name,
            &self.signals,
            data,
            ctx,
            options.allow_truncated,
            &mut out,
        )?;
        Ok(out)
    }

    /// Splits a container payload and decodes every entry with a known header id.
    ///
    /// Unknown header ids are returned undecoded.
    pub fn decode_container(
        &self,
        data: &[u8],
        options: &DecodeOptions,
    ) -> Result<Vec<ContainedDecoded>, DecodeError> {
        let Some(contained) = self.contained_messages.as_ref() else {
            return Err(DecodeError::MalformedContainer {
                message: self.name.clone(),
                reason: "message is not a container".to_string(),
            });
        };
        let entries = split_entries(data, self.header_byte_order).map_err(|reason| {
            DecodeError::MalformedContainer {
                message: self.name.clone(),
                reason,
            }
        })?;

        let mut out: Vec<ContainedDecoded> = Vec::with_capacity(entries.len());
        for entry in entries {
            match contained
                .iter()
                .find(|m| m.contained_header_id() == entry.header_id)
            {
                Some(inner) => out.push(ContainedDecoded::Known {
                    name: inner.name.clone(),
                    header_id: entry.header_id,
                    signals: inner.decode_signals(entry.data, options)?,
                }),
                None => out.push(ContainedDecoded::Unknown {
                    header_id: entry.header_id,
                    data: entry.data.to_vec(),
                }),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::value::{Choices, NamedSignalValue, SignalValue};

    fn motohawk() -> Message {
        let signals: Vec<Signal> = vec![
            Signal::new("Enable", 7, 1)
                .with_byte_order(ByteOrder::BigEndian)
                .with_choices([(0, "Disabled"), (1, "Enabled")].into_iter().collect::<Choices>()),
            Signal::new("AverageRadius", 6, 6)
                .with_byte_order(ByteOrder::BigEndian)
                .with_scaling(0.1, 0.0)
                .with_range(Some(0.0), Some(5.0))
                .with_unit("m"),
            Signal::new("Temperature", 0, 12)
                .with_byte_order(ByteOrder::BigEndian)
                .signed(true)
                .with_scaling(0.01, 250.0)
                .with_range(Some(229.52), Some(270.47))
                .with_unit("degK"),
        ];
        let mut msg: Message = Message::new(0x1F0, "ExampleMessage", 8, signals);
        msg.refresh(true).expect("valid message");
        msg
    }

    fn motohawk_data() -> SignalMap {
        let mut data: SignalMap = SignalMap::new();
        data.insert("Temperature".into(), SignalValue::Float(250.55));
        data.insert("AverageRadius".into(), SignalValue::Float(3.2));
        data.insert("Enable".into(), SignalValue::from("Enabled"));
        data
    }

    #[test]
    fn test_encode_motohawk() {
        let msg: Message = motohawk();
        let encoded: Vec<u8> = msg
            .encode(&motohawk_data(), &EncodeOptions::default())
            .expect("encode");
        assert_eq!(encoded, vec![0xC0, 0x06, 0xE0, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_decode_motohawk() {
        let msg: Message = motohawk();
        let decoded: SignalMap = msg
            .decode_signals(&[0xC0, 0x06, 0xE0, 0, 0, 0, 0, 0], &DecodeOptions::default())
            .expect("decode");
        assert_eq!(decoded["Temperature"], SignalValue::Float(250.55));
        assert_eq!(decoded["AverageRadius"], SignalValue::Float(3.2));
        assert_eq!(
            decoded["Enable"],
            SignalValue::Named(NamedSignalValue::new(1, "Enabled"))
        );
    }

    #[test]
    fn test_strict_missing_and_unknown() {
        let msg: Message = motohawk();
        let mut data: SignalMap = motohawk_data();
        data.remove("Enable");
        let err = msg.encode(&data, &EncodeOptions::default());
        assert!(matches!(err, Err(EncodeError::MissingSignals { .. })));
        // non-strict: missing encodes as zero
        let encoded: Vec<u8> = msg
            .encode(&data, &EncodeOptions::default().with_strict(false))
            .expect("lenient");
        assert_eq!(encoded[0], 0x40);

        let mut data: SignalMap = motohawk_data();
        data.insert("Bogus".into(), SignalValue::Integer(1));
        let err = msg.encode(&data, &EncodeOptions::default());
        assert!(matches!(err, Err(EncodeError::UnknownSignals { .. })));
        assert!(msg.encode(&data, &EncodeOptions::default().with_strict(false)).is_ok());
    }

    #[test]
    fn test_short_payload() {
        let msg: Message = motohawk();
        let err = msg.decode_signals(&[0xC0, 0x06], &DecodeOptions::default());
        assert!(matches!(
            err,
            Err(DecodeError::NotEnoughData {
                expected: 8,
                actual: 2,
                ..
            })
        ));
        let partial: SignalMap = msg
            .decode_signals(&[0xC0], &DecodeOptions::default().with_allow_truncated(true))
            .expect("truncated");
        assert!(partial.contains_key("Enable"));
        assert!(partial.contains_key("AverageRadius"));
        assert!(!partial.contains_key("Temperature"));
    }

    #[test]
    fn test_strict_overlap_rejected() {
        let signals: Vec<Signal> = vec![Signal::new("A", 0, 8), Signal::new("B", 4, 8)];
        let mut msg: Message = Message::new(1, "Overlap", 8, signals);
        assert!(matches!(msg.refresh(true), Err(SchemaError::FieldOverlap { .. })));
        assert!(msg.refresh(false).is_ok());
    }

    #[test]
    fn test_out_of_bounds_and_float_length() {
        let mut msg: Message = Message::new(1, "Short", 1, vec![Signal::new("A", 4, 8)]);
        assert!(matches!(
            msg.refresh(true),
            Err(SchemaError::SignalOutOfBounds { required: 2, .. })
        ));
        let mut msg: Message = Message::new(1, "Float", 8, vec![Signal::new("F", 0, 16).float(true)]);
        assert!(matches!(msg.refresh(false), Err(SchemaError::InvalidFloatLength { .. })));
    }

    #[test]
    fn test_padding_fills_unused_bits() {
        let msg: Message = motohawk().with_unused_bit_pattern(0xFF);
        let mut data: SignalMap = motohawk_data();
        data.insert("Temperature".into(), SignalValue::Float(250.0));
        data.insert("AverageRadius".into(), SignalValue::Float(0.0));
        data.insert("Enable".into(), SignalValue::Integer(0));
        let encoded: Vec<u8> = msg
            .encode(&data, &EncodeOptions::default().with_padding(true))
            .expect("encode");
        assert_eq!(encoded, vec![0x00, 0x00, 0x1F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_container_round_trip() {
        let inner: Message = Message::new(0x10, "Inner", 2, vec![Signal::new("Value", 0, 16)])
            .with_header_id(0x0A0B0C);
        let container: Message = Message::new(0x200, "Container", 16, Vec::new())
            .with_contained_messages(vec![inner]);

        let mut values: SignalMap = SignalMap::new();
        values.insert("Value".into(), SignalValue::Integer(0x1234));
        let entries: Vec<ContainedEntry> = vec![
            ContainedEntry::signals("Inner", values.clone()),
            ContainedEntry::raw(0x000001u32, vec![0xAA]),
        ];
        let encoded: Vec<u8> = container
            .encode_container(&entries, &EncodeOptions::default())
            .expect("encode");
        assert_eq!(
            encoded,
            vec![0x0A, 0x0B, 0x0C, 0x02, 0x34, 0x12, 0x00, 0x00, 0x01, 0x01, 0xAA]
        );

        let options: DecodeOptions = DecodeOptions::default();
        assert!(matches!(
            container.decode(&encoded, &options),
            Err(DecodeError::ContainerDecodingDisabled { .. })
        ));
        let decoded: DecodedMessage = container
            .decode(&encoded, &options.with_decode_containers(true))
            .expect("decode");
        assert_eq!(
            decoded.entries(),
            Some(
                &[
                    ContainedDecoded::Known {
                        name: "Inner".into(),
                        header_id: 0x0A0B0C,
                        signals: values,
                    },
                    ContainedDecoded::Unknown {
                        header_id: 1,
                        data: vec![0xAA],
                    },
                ][..]
            )
        );

        let err = container.decode_container(&encoded[..5], &DecodeOptions::default());
        assert!(matches!(err, Err(DecodeError::MalformedContainer { .. })));
        assert!(matches!(
            container.encode(&SignalMap::new(), &EncodeOptions::default()),
            Err(EncodeError::ContainerExpected { .. })
        ));
    }

    #[test]
    fn test_signal_past_largest_payload_is_rejected() {
        let mut msg: Message = Message::new(1, "Huge", 8, vec![Signal::new("S", u32::MAX - 7, 8)]);
        assert!(matches!(
            msg.refresh(false),
            Err(SchemaError::SignalOutOfBounds { length: MAX_MESSAGE_LENGTH, .. })
        ));

        // lenient validation still accepts signals past the declared length
        let mut msg: Message = Message::new(1, "Short", 1, vec![Signal::new("S", 8, 8)]);
        msg.refresh(false).expect("lenient");
        let mut data: SignalMap = SignalMap::new();
        data.insert("S".into(), SignalValue::Integer(0x7F));
        let options: EncodeOptions = EncodeOptions::default().with_strict(false);
        assert_eq!(msg.encode(&data, &options), Ok(vec![0x00]));
    }

    #[test]
    fn test_get_signal_by_name() {
        let msg: Message = motohawk();
        assert_eq!(msg.get_signal_by_name("Enable").map(|s| s.length), Ok(1));
        assert!(msg.get_signal_by_name("enable").is_err());
        assert!(!msg.is_multiplexed());
        assert_eq!(msg.signal_tree().len(), 3);
    }
}
