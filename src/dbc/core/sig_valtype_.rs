use crate::dbc::lexer::TokenCursor;
use crate::dbc::records::{Records, ValueTypeRecord};
use crate::types::errors::ParseError;

const RECORD: &str = "SIG_VALTYPE_";

/// Decode a `SIG_VALTYPE_` record.
/// Format:
/// SIG_VALTYPE_ <frame id> <signal> : <0|1|2>;
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword(RECORD, "SIG_VALTYPE_")?;
    let frame_id: u32 = cursor.expect_u32(RECORD)?;
    let signal: String = cursor.expect_name(RECORD)?;
    // the colon is missing in some files
    cursor.eat_punct(':');
    let value_type: u32 = cursor.expect_u32(RECORD)?;
    cursor.expect_punct(RECORD, ';')?;
    records.value_types.push(ValueTypeRecord {
        frame_id,
        signal,
        value_type,
    });
    Ok(())
}
