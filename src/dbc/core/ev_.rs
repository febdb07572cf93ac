use crate::dbc::lexer::{TokenCursor, TokenKind};
use crate::dbc::records::Records;
use crate::types::{errors::ParseError, node::EnvironmentVariable};

const RECORD: &str = "EV_";

/// Decode an `EV_` record.
/// Format:
/// EV_ <name> : <type> [<min>|<max>] "<unit>" <initial> <id> <access type> <node>,<node>;
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword(RECORD, "EV_")?;
    let name: String = cursor.expect_name(RECORD)?;
    cursor.expect_punct(RECORD, ':')?;
    let env_type: u32 = cursor.expect_u32(RECORD)?;
    cursor.expect_punct(RECORD, '[')?;
    let minimum: f64 = cursor.expect_f64(RECORD)?;
    cursor.expect_punct(RECORD, '|')?;
    let maximum: f64 = cursor.expect_f64(RECORD)?;
    cursor.expect_punct(RECORD, ']')?;
    let unit: String = cursor.expect_string(RECORD)?;
    let initial_value: f64 = cursor.expect_f64(RECORD)?;
    let env_id: u32 = cursor.expect_u32(RECORD)?;
    let access_type: String = cursor.expect_name(RECORD)?;

    let mut access_nodes: Vec<String> = Vec::new();
    while cursor.peek_kind() == Some(TokenKind::Identifier) {
        access_nodes.push(cursor.expect_name(RECORD)?);
        cursor.eat_punct(',');
    }
    cursor.expect_punct(RECORD, ';')?;

    records.environment_variables.push(EnvironmentVariable {
        name,
        env_type,
        minimum,
        maximum,
        unit,
        initial_value,
        env_id,
        access_type,
        access_nodes,
        ..Default::default()
    });
    Ok(())
}
