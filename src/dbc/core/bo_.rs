use crate::dbc::core::sg_;
use crate::dbc::lexer::{TokenCursor, TokenKind};
use crate::dbc::records::{MessageRecord, Records};
use crate::types::{errors::ParseError, signal::Signal};

const RECORD: &str = "BO_";

/// Decode a `BO_` record and the `SG_` records following it.
/// Format:
/// BO_ <frame id> <name>: <length> <sender>
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword(RECORD, "BO_")?;
    let frame_id: u32 = cursor.expect_u32(RECORD)?;
    let name: String = cursor.expect_name(RECORD)?;
    cursor.expect_punct(RECORD, ':')?;
    let length: u32 = cursor.expect_u32(RECORD)?;
    // the sender may be missing in hand-written files
    let sender: String = if cursor.peek_kind() == Some(TokenKind::Identifier) {
        cursor.expect_name(RECORD)?
    } else {
        String::new()
    };

    let mut signals: Vec<Signal> = Vec::new();
    while cursor.peek_is_keyword("SG_") {
        signals.push(sg_::decode(cursor)?);
    }

    records.messages.push(MessageRecord {
        frame_id,
        name,
        length: length as usize,
        sender,
        signals,
    });
    Ok(())
}
