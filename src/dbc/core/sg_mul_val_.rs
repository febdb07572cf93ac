use crate::dbc::lexer::{TokenCursor, TokenKind};
use crate::dbc::records::{MuxValuesRecord, Records};
use crate::types::errors::ParseError;

const RECORD: &str = "SG_MUL_VAL_";

/// Decode a `SG_MUL_VAL_` record.
/// Format:
/// SG_MUL_VAL_ <frame id> <signal> <multiplexer> <lo>-<hi>, <lo>-<hi>;
pub(crate) fn decode(cursor: &mut TokenCursor<'_>, records: &mut Records) -> Result<(), ParseError> {
    cursor.expect_keyword(RECORD, "SG_MUL_VAL_")?;
    let frame_id: u32 = cursor.expect_u32(RECORD)?;
    let signal: String = cursor.expect_name(RECORD)?;
    let multiplexer: String = cursor.expect_name(RECORD)?;

    let mut ranges: Vec<(i64, i64)> = Vec::new();
    while !cursor.eat_punct(';') {
        let low: i64 = cursor.expect_i64(RECORD)?;
        // `1-3` is lexed as the numbers `1` and `-3`; `1 - 3` as number, sign, number
        let high: i64 = match cursor.peek_kind() {
            Some(TokenKind::Sign) => {
                cursor.expect_sign(RECORD)?;
                cursor.expect_i64(RECORD)?
            }
            _ => {
                let token = cursor.expect_number(RECORD)?;
                match token.text.strip_prefix('-') {
                    Some(digits) => digits.parse::<i64>().map_err(|_| cursor.error(RECORD, "range"))?,
                    None => return Err(cursor.error(RECORD, "'-'")),
                }
            }
        };
        ranges.push((low, high));
        cursor.eat_punct(',');
    }

    records.mux_values.push(MuxValuesRecord {
        frame_id,
        signal,
        multiplexer,
        ranges,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::lexer::{Token, tokenize};

    #[test]
    fn test_decode_ranges() {
        let tokens: Vec<Token> =
            tokenize("SG_MUL_VAL_ 2147483648 S Mux 0-0, 2-3,5 - 7;").expect("tokenize");
        let mut cursor: TokenCursor<'_> = TokenCursor::new(&tokens);
        let mut records: Records = Records::default();
        decode(&mut cursor, &mut records).expect("decode");
        let record: &MuxValuesRecord = &records.mux_values[0];
        assert_eq!(record.frame_id, 0x8000_0000);
        assert_eq!(record.multiplexer, "Mux");
        assert_eq!(record.ranges, vec![(0, 0), (2, 3), (5, 7)]);
        assert!(cursor.peek().is_none());
    }
}
