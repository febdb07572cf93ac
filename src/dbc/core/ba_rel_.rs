use crate::dbc::core::ba_::decode_value;
use crate::dbc::lexer::TokenCursor;
use crate::dbc::records::{Records, RelationRecord};
use crate::types::{
    attributes::{RawAttributeValue, RelationTarget},
    errors::ParseError,
};

const RECORD: &str = "BA_REL_";

/// Decode a `BA_REL_` record.
/// Formats:
/// BA_REL_ "<name>" BU_SG_REL_ <node> SG_ <frame id> <signal> <value>;
/// BA_REL_ "<name>" BU_BO_REL_ <node> [BO_] <frame id> <value>;
/// BA_REL_ "<name>" BU_EV_REL_ <node> <env var> <value>;
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword(RECORD, "BA_REL_")?;
    let name: String = cursor.expect_string(RECORD)?;

    let target_kind: String = cursor.expect_name(RECORD)?;
    let node: String = cursor.expect_name(RECORD)?;
    let target: RelationTarget = match target_kind.as_str() {
        "BU_SG_REL_" => {
            cursor.expect_keyword(RECORD, "SG_")?;
            let frame_id: u32 = cursor.expect_u32(RECORD)?;
            RelationTarget::Signal {
                frame_id,
                signal: cursor.expect_name(RECORD)?,
            }
        }
        "BU_BO_REL_" => {
            if cursor.peek_is_keyword("BO_") {
                cursor.next();
            }
            RelationTarget::Message {
                frame_id: cursor.expect_u32(RECORD)?,
            }
        }
        "BU_EV_REL_" => RelationTarget::EnvironmentVariable {
            name: cursor.expect_name(RECORD)?,
        },
        _ => return Err(cursor.error(RECORD, "BU_SG_REL_, BU_BO_REL_ or BU_EV_REL_")),
    };

    let value: RawAttributeValue = decode_value(cursor, RECORD)?;
    cursor.expect_punct(RECORD, ';')?;
    records.relation_attributes.push(RelationRecord {
        name,
        node,
        target,
        value,
    });
    Ok(())
}
