use crate::dbc::lexer::TokenCursor;
use crate::dbc::records::Records;
use crate::types::{
    attributes::{AttrObject, AttrValueType, AttributeDefinition},
    errors::ParseError,
};

/// Decode a `BA_DEF_` record.
/// Format:
/// BA_DEF_ [BU_|BO_|SG_|EV_] "<name>" <INT|HEX|FLOAT> <min> <max>;
/// BA_DEF_ [BU_|BO_|SG_|EV_] "<name>" STRING;
/// BA_DEF_ [BU_|BO_|SG_|EV_] "<name>" ENUM "<a>","<b>";
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    const RECORD: &str = "BA_DEF_";
    cursor.expect_keyword(RECORD, "BA_DEF_")?;
    let object: AttrObject = if cursor.peek_is_keyword("BU_") {
        AttrObject::Node
    } else if cursor.peek_is_keyword("BO_") {
        AttrObject::Message
    } else if cursor.peek_is_keyword("SG_") {
        AttrObject::Signal
    } else if cursor.peek_is_keyword("EV_") {
        AttrObject::EnvironmentVariable
    } else {
        AttrObject::Database
    };
    if object != AttrObject::Database {
        cursor.next();
    }
    decode_definition(cursor, records, object, RECORD)
}

/// Decode a `BA_DEF_REL_` record.
/// Format:
/// BA_DEF_REL_ <BU_SG_REL_|BU_BO_REL_|BU_EV_REL_> "<name>" <type>;
pub(crate) fn decode_rel(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    const RECORD: &str = "BA_DEF_REL_";
    cursor.expect_keyword(RECORD, "BA_DEF_REL_")?;
    let object: AttrObject = if cursor.peek_is_keyword("BU_SG_REL_") {
        AttrObject::NodeSignal
    } else if cursor.peek_is_keyword("BU_BO_REL_") {
        AttrObject::NodeMessage
    } else if cursor.peek_is_keyword("BU_EV_REL_") {
        AttrObject::NodeEnvironmentVariable
    } else {
        return Err(cursor.error(RECORD, "relation kind"));
    };
    cursor.next();
    decode_definition(cursor, records, object, RECORD)
}

fn decode_definition(
    cursor: &mut TokenCursor<'_>,
    records: &mut Records,
    object: AttrObject,
    record: &'static str,
) -> Result<(), ParseError> {
    let name: String = cursor.expect_string(record)?;
    let kind: String = cursor.expect_name(record)?;
    let value_type: AttrValueType = match kind.as_str() {
        "INT" => AttrValueType::Int {
            minimum: cursor.expect_i64(record)?,
            maximum: cursor.expect_i64(record)?,
        },
        "HEX" => {
            let minimum: i64 = cursor.expect_i64(record)?;
            let maximum: i64 = cursor.expect_i64(record)?;
            AttrValueType::Hex {
                minimum: minimum.max(0) as u64,
                maximum: maximum.max(0) as u64,
            }
        }
        "FLOAT" => AttrValueType::Float {
            minimum: cursor.expect_f64(record)?,
            maximum: cursor.expect_f64(record)?,
        },
        "STRING" => AttrValueType::String,
        "ENUM" => {
            let mut values: Vec<String> = Vec::new();
            while !cursor.peek_is_punct(';') {
                values.push(cursor.expect_string(record)?);
                if !cursor.eat_punct(',') {
                    break;
                }
            }
            AttrValueType::Enum(values)
        }
        _ => return Err(cursor.error(record, "INT, HEX, FLOAT, STRING or ENUM")),
    };
    cursor.expect_punct(record, ';')?;
    records
        .attribute_definitions
        .push(AttributeDefinition::new(name, object, value_type));
    Ok(())
}
