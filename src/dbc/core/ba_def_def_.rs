use crate::dbc::core::ba_::decode_value;
use crate::dbc::lexer::TokenCursor;
use crate::dbc::records::{DefaultRecord, Records};
use crate::types::errors::ParseError;

/// Decode a `BA_DEF_DEF_` record.
/// Format:
/// BA_DEF_DEF_ "<name>" <value>;
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    decode_default(cursor, records, "BA_DEF_DEF_", false)
}

/// Decode a `BA_DEF_DEF_REL_` record (same layout as `BA_DEF_DEF_`).
pub(crate) fn decode_rel(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    decode_default(cursor, records, "BA_DEF_DEF_REL_", true)
}

fn decode_default(
    cursor: &mut TokenCursor<'_>,
    records: &mut Records,
    record: &'static str,
    relation: bool,
) -> Result<(), ParseError> {
    cursor.expect_keyword(record, record)?;
    let name: String = cursor.expect_string(record)?;
    let value = decode_value(cursor, record)?;
    cursor.expect_punct(record, ';')?;
    records.attribute_defaults.push(DefaultRecord {
        name,
        relation,
        value,
    });
    Ok(())
}
