use crate::dbc::lexer::{TokenCursor, TokenKind};
use crate::types::{errors::ParseError, signal::ByteOrder, signal::Signal};

const RECORD: &str = "SG_";

/// Receiver placeholder used when a signal has no receiver.
pub(crate) const NO_NODE: &str = "Vector__XXX";

/// Decode a `SG_` record belonging to the enclosing `BO_`.
/// Format:
/// SG_ <name> [M|m<N>|m<N>M] : <start>|<length>@<0|1><+|-> (<scale>,<offset>) [<min>|<max>] "<unit>" <receivers>
pub(crate) fn decode(cursor: &mut TokenCursor<'_>) -> Result<Signal, ParseError> {
    cursor.expect_keyword(RECORD, "SG_")?;
    let name: String = cursor.expect_name(RECORD)?;

    // multiplexing tag (if present)
    let mut is_multiplexer: bool = false;
    let mut multiplexer_id: Option<i64> = None;
    if cursor.peek_kind() == Some(TokenKind::Identifier) {
        let tag: String = cursor.expect_name(RECORD)?;
        match parse_mux_tag(&tag) {
            Some((id, multiplexer)) => {
                multiplexer_id = id;
                is_multiplexer = multiplexer;
            }
            None => return Err(cursor.error(RECORD, "multiplexer indicator")),
        }
    }
    cursor.expect_punct(RECORD, ':')?;

    let start: u32 = cursor.expect_u32(RECORD)?;
    cursor.expect_punct(RECORD, '|')?;
    let length: u32 = cursor.expect_u32(RECORD)?;
    cursor.expect_punct(RECORD, '@')?;
    let byte_order: ByteOrder = match cursor.expect_u32(RECORD)? {
        0 => ByteOrder::BigEndian,
        1 => ByteOrder::LittleEndian,
        _ => return Err(cursor.error(RECORD, "byte order 0 or 1")),
    };
    let is_signed: bool = cursor.expect_sign(RECORD)? == '-';

    cursor.expect_punct(RECORD, '(')?;
    let scale: f64 = cursor.expect_f64(RECORD)?;
    cursor.expect_punct(RECORD, ',')?;
    let offset: f64 = cursor.expect_f64(RECORD)?;
    cursor.expect_punct(RECORD, ')')?;

    cursor.expect_punct(RECORD, '[')?;
    let minimum: f64 = cursor.expect_f64(RECORD)?;
    cursor.expect_punct(RECORD, '|')?;
    let maximum: f64 = cursor.expect_f64(RECORD)?;
    cursor.expect_punct(RECORD, ']')?;

    let unit: String = cursor.expect_string(RECORD)?;

    let mut receivers: Vec<String> = Vec::new();
    while cursor.peek_kind() == Some(TokenKind::Identifier) {
        let receiver: String = cursor.expect_name(RECORD)?;
        if receiver != NO_NODE {
            receivers.push(receiver);
        }
        cursor.eat_punct(',');
    }

    let mut signal: Signal = Signal::new(name, start, length)
        .with_byte_order(byte_order)
        .signed(is_signed)
        .with_scaling(scale, offset)
        .with_receivers(receivers);
    // [0|0] means "no range"
    if minimum != 0.0 || maximum != 0.0 {
        signal = signal.with_range(Some(minimum), Some(maximum));
    }
    if !unit.is_empty() {
        signal = signal.with_unit(unit);
    }
    signal.is_multiplexer = is_multiplexer;
    signal.multiplexer_ids = multiplexer_id.map(|id| vec![id]);

    Ok(signal)
}

/// `M` → (None, true), `m3` → (Some(3), false), `m3M` → (Some(3), true).
fn parse_mux_tag(tag: &str) -> Option<(Option<i64>, bool)> {
    if tag == "M" {
        return Some((None, true));
    }
    let rest: &str = tag.strip_prefix('m')?;
    let (digits, multiplexer) = match rest.strip_suffix('M') {
        Some(digits) => (digits, true),
        None => (rest, false),
    };
    let id: i64 = digits.parse::<i64>().ok()?;
    Some((Some(id), multiplexer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::lexer::{Token, tokenize};

    fn decode_line(line: &str) -> Result<Signal, ParseError> {
        let tokens: Vec<Token> = tokenize(line).expect("tokenize");
        let mut cursor: TokenCursor<'_> = TokenCursor::new(&tokens);
        decode(&mut cursor)
    }

    #[test]
    fn test_decode_signal() {
        let sig: Signal = decode_line(
            r#" SG_ Temperature : 0|12@0- (0.01,250) [229.52|270.47] "degK" PCM1,FOO"#,
        )
        .expect("decode");
        assert_eq!(sig.name, "Temperature");
        assert_eq!((sig.start, sig.length), (0, 12));
        assert_eq!(sig.byte_order, ByteOrder::BigEndian);
        assert!(sig.is_signed);
        assert_eq!((sig.scale(), sig.offset()), (0.01, 250.0));
        assert_eq!((sig.minimum, sig.maximum), (Some(229.52), Some(270.47)));
        assert_eq!(sig.unit.as_deref(), Some("degK"));
        assert_eq!(sig.receivers, vec!["PCM1", "FOO"]);
        assert!(sig.multiplexer_ids.is_none());
    }

    #[test]
    fn test_decode_multiplex_tags() {
        let sig: Signal =
            decode_line(r#" SG_ Mux M : 0|8@1+ (1,0) [0|0] "" Vector__XXX"#).expect("M");
        assert!(sig.is_multiplexer);
        assert!(sig.receivers.is_empty());
        assert!(sig.minimum.is_none());

        let sig: Signal =
            decode_line(r#" SG_ Inner m2M : 8|8@1+ (1,0) [0|0] "" X"#).expect("m2M");
        assert!(sig.is_multiplexer);
        assert_eq!(sig.multiplexer_ids, Some(vec![2]));
        assert!(sig.multiplexer_signal.is_none());
    }

    #[test]
    fn test_decode_errors_name_record() {
        let err: ParseError =
            decode_line(r#" SG_ Bad : 0|8@2+ (1,0) [0|0] "" X"#).expect_err("byte order");
        assert!(err.to_string().contains("SG_"));
        assert!(decode_line(r#" SG_ Bad x1 : 0|8@1+ (1,0) [0|0] "" X"#).is_err());
        assert!(decode_line(r#" SG_ Bad : 0|8@1+ (1,0) [0|0] X"#).is_err());
    }
}
