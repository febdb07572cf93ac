use log::debug;

use crate::dbc::lexer::{TokenCursor, TokenKind};
use crate::dbc::records::{ChoicesRecord, Records};
use crate::types::{
    errors::ParseError,
    value::{Choices, NamedSignalValue, ValueTable},
};

/// Decode a `VAL_` record.
/// Formats:
/// VAL_ <frame id> <signal> <value> "<name>" ... ;
/// VAL_ <env var> <value> "<name>" ... ;
///
/// Environment variable value descriptions are not kept.
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    const RECORD: &str = "VAL_";
    cursor.expect_keyword(RECORD, "VAL_")?;
    if cursor.peek_kind() != Some(TokenKind::Number) {
        let env_var: String = cursor.expect_name(RECORD)?;
        decode_choices(cursor, RECORD)?;
        debug!("Ignoring value descriptions of environment variable '{env_var}'");
        return Ok(());
    }
    let frame_id: u32 = cursor.expect_u32(RECORD)?;
    let signal: String = cursor.expect_name(RECORD)?;
    let choices: Choices = decode_choices(cursor, RECORD)?;
    records.choices.push(ChoicesRecord {
        frame_id,
        signal,
        choices,
    });
    Ok(())
}

/// Decode a `VAL_TABLE_` record.
/// Format:
/// VAL_TABLE_ <name> <value> "<name>" ... ;
pub(crate) fn decode_table(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    const RECORD: &str = "VAL_TABLE_";
    cursor.expect_keyword(RECORD, "VAL_TABLE_")?;
    let name: String = cursor.expect_name(RECORD)?;
    let choices: Choices = decode_choices(cursor, RECORD)?;
    records.value_tables.push(ValueTable { name, choices });
    Ok(())
}

/// `<value> "<name>"` pairs up to the closing `;`, in declaration order.
fn decode_choices(cursor: &mut TokenCursor<'_>, record: &'static str) -> Result<Choices, ParseError> {
    let mut choices: Choices = Choices::new();
    while !cursor.eat_punct(';') {
        let value: i64 = cursor.expect_i64(record)?;
        let name: String = cursor.expect_string(record)?;
        choices.insert(NamedSignalValue::new(value, name));
    }
    Ok(choices)
}
