use crate::dbc::lexer::TokenCursor;
use crate::dbc::records::Records;
use crate::types::errors::ParseError;

/// `NS_ :` followed by the list of record kinds the file may use. The list carries
/// no information and is skipped up to the next `BS_`, `BU_` or `BO_`.
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, _records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword("NS_", "NS_")?;
    cursor.expect_punct("NS_", ':')?;
    while cursor.peek().is_some()
        && !(cursor.peek_is_keyword("BS_") || cursor.peek_is_keyword("BU_") || cursor.peek_is_keyword("BO_"))
    {
        cursor.next();
    }
    Ok(())
}

/// `BS_: [<baudrate> : <BTR1> , <BTR2>]`; obsolete, the values are ignored.
pub(crate) fn decode_bs(cursor: &mut TokenCursor<'_>, _records: &mut Records) -> Result<(), ParseError> {
    const RECORD: &str = "BS_";
    cursor.expect_keyword(RECORD, "BS_")?;
    cursor.expect_punct(RECORD, ':')?;
    if !cursor.at_record_start() && cursor.expect_number(RECORD).is_ok() {
        cursor.expect_punct(RECORD, ':')?;
        cursor.expect_number(RECORD)?;
        cursor.expect_punct(RECORD, ',')?;
        cursor.expect_number(RECORD)?;
    }
    Ok(())
}
