use crate::dbc::lexer::TokenCursor;
use crate::dbc::records::{Records, SendersRecord};
use crate::types::errors::ParseError;

const RECORD: &str = "BO_TX_BU_";

/// Decode a `BO_TX_BU_` record (additional senders of a message).
/// Format:
/// BO_TX_BU_ <frame id> : <node>,<node>;
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword(RECORD, "BO_TX_BU_")?;
    let frame_id: u32 = cursor.expect_u32(RECORD)?;
    cursor.expect_punct(RECORD, ':')?;
    let mut senders: Vec<String> = Vec::new();
    while !cursor.eat_punct(';') {
        senders.push(cursor.expect_name(RECORD)?);
        cursor.eat_punct(',');
    }
    records.senders.push(SendersRecord { frame_id, senders });
    Ok(())
}
