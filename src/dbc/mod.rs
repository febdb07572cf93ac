//! # dbc
//!
//! `dbc` is the module to work with .dbc files
//!
//! Reading happens in three steps: the text is split into tokens ([`lexer`]), every
//! record is decoded into a record list keyed by record kind ([`core`]), and the
//! records are assembled into a validated [`Database`]. [`save`] writes a database
//! back as canonical DBC text.

pub(crate) mod assemble;
pub(crate) mod core;
pub(crate) mod lexer;
pub(crate) mod parse;
pub(crate) mod records;
pub mod save;

use encoding_rs::WINDOWS_1252;
use log::debug;
use std::borrow::Cow;

use crate::options::LoadOptions;
use crate::types::{database::Database, errors::Error};

/// Parses DBC text and returns a populated [`Database`] instance.
///
/// The database is filled with all parsed information:
/// - **Version** (from `VERSION` line)
/// - **Nodes** (from `BU_` line)
/// - **Messages** and **signals** (from `BO_` and `SG_` lines)
/// - **Sender nodes** (from `BO_TX_BU_` lines)
/// - **Comments** for the database, nodes, messages, signals and environment variables
/// - **Attributes** with their definitions and defaults, including relation attributes
/// - **Value tables** and signal **choices** (from `VAL_TABLE_` and `VAL_` lines)
/// - **Extended multiplexing**, **signal groups** and **float signals**
/// - **Bus** name and bit rates (from the `DBName`, `Baudrate`, `BaudrateCANFD` and
///   `BusType` attributes)
///
/// Records may appear in any order. Unknown record kinds are skipped with a warning.
///
/// # Errors
/// - [`Error::Parse`] with line and column if a record is malformed.
/// - [`Error::Schema`] if the assembled database is inconsistent (duplicate names,
///   and with `options.strict` signals out of bounds or overlapping).
///
/// # Example
/// ```
/// use can_database::{LoadOptions, dbc};
///
/// let text = "BO_ 1 Status: 1 ECU\n SG_ Counter : 0|8@1+ (1,0) [0|0] \"\" Vector__XXX\n";
/// let db = dbc::parse_str(text, &LoadOptions::default()).unwrap();
/// assert_eq!(db.get_message_by_frame_id(1).unwrap().name(), "Status");
/// ```
pub fn parse_str(text: &str, options: &LoadOptions) -> Result<Database, Error> {
    let records = parse::parse_records(text)?;
    let db: Database = assemble::assemble(records, options)?;
    Ok(db)
}

/// Parses a DBC byte buffer: UTF-8 when valid, Windows-1252 otherwise.
///
/// # Errors
/// Same as [`parse_str`].
pub fn parse_bytes(bytes: &[u8], options: &LoadOptions) -> Result<Database, Error> {
    let text: Cow<'_, str> = match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!("DBC content is not valid UTF-8, decoding it as Windows-1252");
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded
        }
    };
    parse_str(&text, options)
}
