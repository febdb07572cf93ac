use crate::dbc::lexer::{TokenCursor, TokenKind};
use crate::dbc::records::Records;
use crate::types::errors::ParseError;

/// `BU_: <node> <node> ...`
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword("BU_", "BU_")?;
    cursor.expect_punct("BU_", ':')?;
    while cursor.peek_kind() == Some(TokenKind::Identifier) {
        let name: String = cursor.expect_name("BU_")?;
        if !records.nodes.contains(&name) {
            records.nodes.push(name);
        }
        // some writers separate the names with commas
        cursor.eat_punct(',');
    }
    Ok(())
}
