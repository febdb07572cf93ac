use std::io;
use thiserror::Error;

/// What went wrong while tokenizing or parsing a DBC document.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("{record}: expected {expected}, found {found}")]
    Unexpected {
        record: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("{record}: invalid number '{text}'")]
    InvalidNumber { record: &'static str, text: String },
    #[error("{record}: unexpected end of input")]
    UnexpectedEof { record: &'static str },
}

/// Errors produced while reading DBC text. Carries the position of the offending token.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("line {line}, column {column}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub kind: ParseErrorKind,
}

/// Errors produced when the database, a message or a signal is internally inconsistent.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Message name '{name}' is not unique")]
    DuplicateMessageName { name: String },
    #[error("Node name '{name}' is not unique")]
    DuplicateNodeName { name: String },
    #[error("Signal name '{signal}' is not unique in message '{message}'")]
    DuplicateSignalName { message: String, signal: String },
    #[error(
        "The signal '{signal}' does not fit in message '{message}': it needs {required} bytes, the message has {length}"
    )]
    SignalOutOfBounds {
        message: String,
        signal: String,
        required: usize,
        length: usize,
    },
    #[error("The signals '{first}' and '{second}' are overlapping in message '{message}'")]
    FieldOverlap {
        message: String,
        first: String,
        second: String,
    },
    #[error("Signal '{signal}' of message '{message}' refers to unknown multiplexer '{multiplexer}'")]
    UnknownMultiplexer {
        message: String,
        signal: String,
        multiplexer: String,
    },
    #[error("Signal '{signal}' of message '{message}' has invalid length {length}")]
    InvalidSignalLength {
        message: String,
        signal: String,
        length: u32,
    },
    #[error(
        "Float signal '{signal}' of message '{message}' must be 32 or 64 bits long, not {length}"
    )]
    InvalidFloatLength {
        message: String,
        signal: String,
        length: u32,
    },
    #[error("Frame id 0x{frame_id:X} of message '{message}' does not fit a {width}-bit identifier")]
    FrameIdOutOfRange {
        message: String,
        frame_id: u32,
        width: u8,
    },
    #[error("Message '{message}' has invalid length {length} (maximum {maximum})")]
    InvalidMessageLength {
        message: String,
        length: usize,
        maximum: usize,
    },
}

/// Errors produced while encoding signal values into a payload.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("The signal(s) {signals:?} are required for encoding message '{message}'")]
    MissingSignals {
        message: String,
        signals: Vec<String>,
    },
    #[error("The signal(s) {signals:?} are not part of the selected layout of message '{message}'")]
    UnknownSignals {
        message: String,
        signals: Vec<String>,
    },
    #[error(
        "Expected signal \"{signal}\" value greater than or equal to {minimum} in message \"{message}\", but got {value}."
    )]
    BelowMinimum {
        message: String,
        signal: String,
        minimum: f64,
        value: String,
    },
    #[error(
        "Expected signal \"{signal}\" value less than or equal to {maximum} in message \"{message}\", but got {value}."
    )]
    AboveMaximum {
        message: String,
        signal: String,
        maximum: f64,
        value: String,
    },
    #[error("Choice '{choice}' is not defined for signal '{signal}' of message '{message}'")]
    UnknownChoice {
        message: String,
        signal: String,
        choice: String,
    },
    #[error("Value {value} of signal '{signal}' in message '{message}' is not a number")]
    InvalidValue {
        message: String,
        signal: String,
        value: String,
    },
    #[error(
        "Raw value {raw} of signal '{signal}' in message '{message}' does not fit in {bits} bits"
    )]
    RawValueOverflow {
        message: String,
        signal: String,
        raw: String,
        bits: u32,
    },
    #[error(
        "Expected multiplexer id in {valid:?} for multiplexer \"{multiplexer}\" in message \"{message}\", but got {value}"
    )]
    InvalidMultiplexId {
        message: String,
        multiplexer: String,
        value: String,
        valid: Vec<i64>,
    },
    #[error("Message '{message}' is a container message and expects a list of contained messages")]
    ContainerExpected { message: String },
    #[error("Message '{message}' is not a container message")]
    NotAContainer { message: String },
    #[error("Message '{message}' does not contain a message called {contained}")]
    UnknownContainedMessage { message: String, contained: String },
    #[error("Contained payload for {contained} in message '{message}' is {length} bytes long (maximum 255)")]
    ContainedPayloadTooLong {
        message: String,
        contained: String,
        length: usize,
    },
    #[error("Encoded container '{message}' is {length} bytes long, the message has only {capacity}")]
    ContainerTooLong {
        message: String,
        length: usize,
        capacity: usize,
    },
}

/// Errors produced while decoding a payload into signal values.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("Wrong data size: {actual} instead of {expected} bytes for message '{message}'")]
    NotEnoughData {
        message: String,
        expected: usize,
        actual: usize,
    },
    #[error(
        "Expected multiplexer id in {valid:?} for multiplexer \"{multiplexer}\" in message \"{message}\", but got {value}"
    )]
    InvalidMultiplexId {
        message: String,
        multiplexer: String,
        value: i128,
        valid: Vec<i64>,
    },
    #[error("Malformed container message '{message}': {reason}")]
    MalformedContainer { message: String, reason: String },
    #[error("Message '{message}' is a container message, but decoding containers has not been enabled")]
    ContainerDecodingDisabled { message: String },
}

/// Errors returned by lookups on the database or a message.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("Unknown frame id 0x{0:X}")]
    FrameId(u32),
    #[error("Unknown message name '{0}'")]
    MessageName(String),
    #[error("Unknown node name '{0}'")]
    NodeName(String),
    #[error("Unknown bus name '{0}'")]
    BusName(String),
    #[error("Message '{message}' has no signal called '{signal}'")]
    Signal { message: String, signal: String },
}

/// Errors produced while writing a database to a DBC file.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Output path must end in .dbc: {path}")]
    InvalidExtension { path: String },
    #[error("Failed to create '{path}'. \nError: {source}")]
    CreateFile {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create directories for '{path}'. \nError: {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed while writing '{path}'. \nError: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Umbrella error of the crate's public entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error("Failed while reading '{path}'. \nError: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Database format '{format}' is not supported by this crate")]
    UnsupportedFormat { format: String },
}
