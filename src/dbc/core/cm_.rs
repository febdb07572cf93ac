use crate::dbc::lexer::TokenCursor;
use crate::dbc::records::{CommentRecord, ObjectRef, Records};
use crate::types::errors::ParseError;

const RECORD: &str = "CM_";

/// Decode a `CM_` record.
/// Formats:
/// CM_ "<text>";
/// CM_ BU_ <node> "<text>";
/// CM_ BO_ <frame id> "<text>";
/// CM_ SG_ <frame id> <signal> "<text>";
/// CM_ EV_ <env var> "<text>";
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword(RECORD, "CM_")?;
    let target: ObjectRef = decode_object_ref(cursor, RECORD)?;
    let text: String = cursor.expect_string(RECORD)?;
    cursor.expect_punct(RECORD, ';')?;
    records.comments.push(CommentRecord { target, text });
    Ok(())
}

/// Object designator shared by `CM_` and `BA_`; no keyword means the database.
pub(crate) fn decode_object_ref(
    cursor: &mut TokenCursor<'_>,
    record: &'static str,
) -> Result<ObjectRef, ParseError> {
    if cursor.peek_is_keyword("BU_") {
        cursor.next();
        return Ok(ObjectRef::Node(cursor.expect_name(record)?));
    }
    if cursor.peek_is_keyword("BO_") {
        cursor.next();
        return Ok(ObjectRef::Message(cursor.expect_u32(record)?));
    }
    if cursor.peek_is_keyword("SG_") {
        cursor.next();
        let frame_id: u32 = cursor.expect_u32(record)?;
        return Ok(ObjectRef::Signal(frame_id, cursor.expect_name(record)?));
    }
    if cursor.peek_is_keyword("EV_") {
        cursor.next();
        return Ok(ObjectRef::EnvironmentVariable(cursor.expect_name(record)?));
    }
    Ok(ObjectRef::Database)
}
