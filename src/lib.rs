//! # can_database
//!
//! Rust core of a **CAN bus database**: a DBC reader and writer plus the codec that
//! turns signal values into CAN payloads and back.
//!
//! ## Highlights
//! - **DBC parser**: load CAN databases from `.dbc` into a SlotMap-backed [`Database`].
//! - **DBC writer**: [`Database::as_dbc_string`] emits canonical text that reloads identically.
//! - **Bit codec**: little- and big-endian fields of 1 to 64 bits, signed, unsigned and IEEE float.
//! - **Exact scaling**: integral `scale`/`offset` never pass through floating point.
//! - **Multiplexing**: nested selectors (`M`, `m<N>`, `SG_MUL_VAL_`) resolved as a codec tree.
//! - **Container messages**: CAN FD payloads carrying several `(header id, length, payload)` entries.
//! - **Stable keys**: messages and nodes use SlotMap keys that remain valid across removals.
//!
//! ## Example
//! ```
//! use can_database::{DecodeOptions, EncodeOptions, LoadOptions, SignalMap, SignalValue, load_str};
//!
//! let text = "BO_ 500 Status: 2 ECU\n SG_ Speed : 0|16@1+ (0.5,0) [0|1000] \"km/h\" Vector__XXX\n";
//! let db = load_str(text, &LoadOptions::default()).unwrap();
//!
//! let mut data = SignalMap::new();
//! data.insert("Speed".into(), 12.5.into());
//! let payload = db.encode_message("Status", &data, &EncodeOptions::default()).unwrap();
//! assert_eq!(payload, vec![25, 0]);
//!
//! let decoded = db.decode_message(500u32, &payload, &DecodeOptions::default()).unwrap();
//! assert_eq!(decoded.signals().unwrap()["Speed"], SignalValue::Float(12.5));
//! ```

pub mod codec;
pub mod dbc;
pub mod options;
#[doc(hidden)]
pub mod types;

use log::debug;
use std::fs;
use std::path::Path;

// Top-level re-exports (appear under Crate Items → Structs)
#[doc(inline)]
pub use crate::types::{
    attributes::{
        AttrObject, AttrValueType, Attribute, AttributeDefinition, AttributeValue, Attributes,
        RelationAttribute, RelationTarget,
    },
    database::{Database, MessageKey, MessageRef, NodeKey},
    errors::{
        DecodeError, EncodeError, Error, LookupError, ParseError, ParseErrorKind, SaveError,
        SchemaError,
    },
    message::{DecodedMessage, MAX_MESSAGE_LENGTH, Message, SignalGroup},
    node::{Bus, EnvironmentVariable, Node},
    signal::{ByteOrder, Signal},
    value::{Choices, Comments, NamedSignalValue, SignalMap, SignalValue, ValueTable},
};

#[doc(inline)]
pub use crate::codec::{
    container::{ContainedDecoded, ContainedEntry, ContainedKey, ContainedPayload},
    conversion::Conversion,
    multiplex::SignalTreeNode,
};

#[doc(inline)]
pub use crate::options::{DatabaseFormat, DecodeOptions, EncodeOptions, LoadOptions};

/// Loads a database from text.
///
/// # Errors
/// - [`Error::UnsupportedFormat`] if `options.format` names a format other than DBC.
/// - Any error of [`dbc::parse_str`].
pub fn load_str(text: &str, options: &LoadOptions) -> Result<Database, Error> {
    check_format(options.format.unwrap_or(DatabaseFormat::Dbc))?;
    dbc::parse_str(text, options)
}

/// Loads a database from raw bytes (UTF-8, or Windows-1252 as fallback).
///
/// # Errors
/// Same as [`load_str`].
pub fn load_bytes(bytes: &[u8], options: &LoadOptions) -> Result<Database, Error> {
    check_format(options.format.unwrap_or(DatabaseFormat::Dbc))?;
    dbc::parse_bytes(bytes, options)
}

/// Loads a database from a file.
///
/// The format is taken from `options.format`, or else from the file extension;
/// files with an unknown extension are read as DBC.
///
/// # Errors
/// - [`Error::Io`] if the file cannot be read.
/// - [`Error::UnsupportedFormat`] for KCD, SYM and ARXML sources.
/// - Any error of [`dbc::parse_bytes`].
pub fn load_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Database, Error> {
    let path: &Path = path.as_ref();
    let format: DatabaseFormat = options
        .format
        .or_else(|| DatabaseFormat::from_path(path))
        .unwrap_or(DatabaseFormat::Dbc);
    check_format(format)?;

    let bytes: Vec<u8> = fs::read(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!("Loading '{}' ({} bytes)", path.display(), bytes.len());
    dbc::parse_bytes(&bytes, options)
}

fn check_format(format: DatabaseFormat) -> Result<(), Error> {
    match format {
        DatabaseFormat::Dbc => Ok(()),
        other => Err(Error::UnsupportedFormat {
            format: other.to_string(),
        }),
    }
}
