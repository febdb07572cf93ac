use crate::dbc::lexer::TokenCursor;
use crate::dbc::records::Records;
use crate::types::errors::ParseError;

const RECORD: &str = "VERSION";

/// `VERSION "<text>"`
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword(RECORD, "VERSION")?;
    records.version = Some(cursor.expect_string(RECORD)?);
    Ok(())
}
