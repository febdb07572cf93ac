use crate::dbc::lexer::TokenCursor;
use crate::dbc::records::{Records, SignalGroupRecord};
use crate::types::{errors::ParseError, message::SignalGroup};

const RECORD: &str = "SIG_GROUP_";

/// Decode a `SIG_GROUP_` record.
/// Format:
/// SIG_GROUP_ <frame id> <group> <repetitions> : <signal> <signal> ...;
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword(RECORD, "SIG_GROUP_")?;
    let frame_id: u32 = cursor.expect_u32(RECORD)?;
    let name: String = cursor.expect_name(RECORD)?;
    let repetitions: u32 = cursor.expect_u32(RECORD)?;
    cursor.expect_punct(RECORD, ':')?;
    let mut signal_names: Vec<String> = Vec::new();
    while !cursor.eat_punct(';') {
        signal_names.push(cursor.expect_name(RECORD)?);
        cursor.eat_punct(',');
    }
    records.signal_groups.push(SignalGroupRecord {
        frame_id,
        group: SignalGroup {
            name,
            repetitions,
            signal_names,
        },
    });
    Ok(())
}
