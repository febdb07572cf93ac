use log::warn;

use crate::dbc::core;
use crate::dbc::lexer::{Token, TokenCursor, TokenKind, tokenize};
use crate::dbc::records::Records;
use crate::types::errors::ParseError;

/// Tokenizes DBC text and collects its records by kind.
///
/// Records are accepted in any order. Record kinds without meaning for the data model
/// (`CAT_DEF_`, `FILTER`, `SGTYPE_`, ...) and stray tokens are reported with a
/// warning and skipped up to the next line starting with a keyword.
///
/// # Errors
/// Returns a [`ParseError`] with line and column when the text cannot be tokenized
/// or a known record is malformed.
pub(crate) fn parse_records(text: &str) -> Result<Records, ParseError> {
    let tokens: Vec<Token> = tokenize(text)?;
    let mut cursor: TokenCursor<'_> = TokenCursor::new(&tokens);
    let mut records: Records = Records::default();

    while let Some(token) = cursor.peek() {
        if token.kind != TokenKind::Keyword {
            warn!(
                "Skipping unexpected token '{}' at line {}, column {} (offset {})",
                token.text, token.line, token.column, token.offset
            );
            cursor.skip_record();
            continue;
        }
        match token.text.as_str() {
            "VERSION" => core::version::decode(&mut cursor, &mut records)?,
            "NS_" => core::ns_::decode(&mut cursor, &mut records)?,
            "BS_" => core::ns_::decode_bs(&mut cursor, &mut records)?,
            "BU_" => core::bu_::decode(&mut cursor, &mut records)?,
            "VAL_TABLE_" => core::val_::decode_table(&mut cursor, &mut records)?,
            "BO_" => core::bo_::decode(&mut cursor, &mut records)?,
            "EV_" => core::ev_::decode(&mut cursor, &mut records)?,
            "CM_" => core::cm_::decode(&mut cursor, &mut records)?,
            "BA_DEF_" => core::ba_def_::decode(&mut cursor, &mut records)?,
            "BA_DEF_REL_" => core::ba_def_::decode_rel(&mut cursor, &mut records)?,
            "BA_DEF_DEF_" => core::ba_def_def_::decode(&mut cursor, &mut records)?,
            "BA_DEF_DEF_REL_" => core::ba_def_def_::decode_rel(&mut cursor, &mut records)?,
            "BA_" => core::ba_::decode(&mut cursor, &mut records)?,
            "BA_REL_" => core::ba_rel_::decode(&mut cursor, &mut records)?,
            "VAL_" => core::val_::decode(&mut cursor, &mut records)?,
            "SIG_VALTYPE_" => core::sig_valtype_::decode(&mut cursor, &mut records)?,
            "SIG_GROUP_" => core::sig_group_::decode(&mut cursor, &mut records)?,
            "SG_MUL_VAL_" => core::sg_mul_val_::decode(&mut cursor, &mut records)?,
            "BO_TX_BU_" => core::bo_tx_bu_::decode(&mut cursor, &mut records)?,
            other => {
                warn!(
                    "Skipping unsupported record '{}' at line {}, column {}",
                    other, token.line, token.column
                );
                cursor.skip_record();
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::records::ObjectRef;
    use crate::types::attributes::{AttrObject, RawAttributeValue};
    use crate::types::errors::ParseErrorKind;

    const DOCUMENT: &str = r#"VERSION "1.0"

NS_ :
	CM_
	BA_DEF_

BS_:

BU_: Motor Gateway

BO_ 2147484672 Status: 8 Motor
 SG_ Speed : 0|16@1+ (0.1,0) [0|6553.5] "km/h" Gateway
 SG_ Mode M : 16|2@1+ (1,0) [0|0] "" Vector__XXX

CAT_DEF_ 1 Foo 0;
FILTER 0 "x";

CM_ BO_ 2147484672 "status frame";
BA_DEF_ BO_ "GenMsgCycleTime" INT 0 65535;
BA_ "GenMsgCycleTime" BO_ 2147484672 100;
VAL_ 2147484672 Mode 0 "Off" 1 "On" ;
"#;

    #[test]
    fn test_parse_records() {
        let records: Records = parse_records(DOCUMENT).expect("parse");
        assert_eq!(records.version.as_deref(), Some("1.0"));
        assert_eq!(records.nodes, vec!["Motor", "Gateway"]);
        assert_eq!(records.messages.len(), 1);
        assert_eq!(records.messages[0].frame_id, 0x8000_0400);
        assert_eq!(records.messages[0].signals.len(), 2);
        assert_eq!(records.comments[0].target, ObjectRef::Message(0x8000_0400));
        assert_eq!(records.attribute_definitions[0].object, AttrObject::Message);
        assert_eq!(records.attributes[0].value, RawAttributeValue::Number("100".into()));
        assert_eq!(records.choices[0].choices.len(), 2);
    }

    #[test]
    fn test_parse_error_names_record() {
        let err: ParseError = parse_records("BO_ 1 Broken 8 X\n").expect_err("missing colon");
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, ParseErrorKind::Unexpected { record: "BO_", .. }));
    }
}
