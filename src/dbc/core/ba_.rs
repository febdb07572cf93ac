use crate::dbc::core::cm_::decode_object_ref;
use crate::dbc::lexer::{TokenCursor, TokenKind};
use crate::dbc::records::{AttributeRecord, ObjectRef, Records};
use crate::types::{attributes::RawAttributeValue, errors::ParseError};

const RECORD: &str = "BA_";

/// Decode a `BA_` record.
/// Formats:
/// BA_ "<name>" <value>;
/// BA_ "<name>" BU_ <node> <value>;
/// BA_ "<name>" BO_ <frame id> <value>;
/// BA_ "<name>" SG_ <frame id> <signal> <value>;
/// BA_ "<name>" EV_ <env var> <value>;
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword(RECORD, "BA_")?;
    let name: String = cursor.expect_string(RECORD)?;
    let target: ObjectRef = decode_object_ref(cursor, RECORD)?;
    let value: RawAttributeValue = decode_value(cursor, RECORD)?;
    cursor.expect_punct(RECORD, ';')?;
    records.attributes.push(AttributeRecord {
        name,
        target,
        value,
    });
    Ok(())
}

/// Attribute value: a number (kept as text) or a quoted string.
pub(crate) fn decode_value(
    cursor: &mut TokenCursor<'_>,
    record: &'static str,
) -> Result<RawAttributeValue, ParseError> {
    match cursor.peek_kind() {
        Some(TokenKind::String) => Ok(RawAttributeValue::Str(cursor.expect_string(record)?)),
        Some(TokenKind::Number) => Ok(RawAttributeValue::Number(
            cursor.expect_number(record)?.text.clone(),
        )),
        _ => Err(cursor.error(record, "attribute value")),
    }
}
