use crate::types::errors::{ParseError, ParseErrorKind};

/// Record names recognized as keywords.
pub(crate) const KEYWORDS: &[&str] = &[
    "VERSION",
    "NS_",
    "NS_DESC_",
    "BS_",
    "BU_",
    "BO_",
    "SG_",
    "EV_",
    "CM_",
    "BA_DEF_",
    "BA_",
    "VAL_",
    "CAT_DEF_",
    "CAT_",
    "FILTER",
    "BA_DEF_DEF_",
    "EV_DATA_",
    "ENVVAR_DATA_",
    "SGTYPE_",
    "SGTYPE_VAL_",
    "BA_DEF_SGTYPE_",
    "BA_SGTYPE_",
    "SIG_TYPE_REF_",
    "VAL_TABLE_",
    "SIG_GROUP_",
    "SIG_VALTYPE_",
    "SIGTYPE_VALTYPE_",
    "BO_TX_BU_",
    "BA_DEF_REL_",
    "BA_REL_",
    "BA_DEF_DEF_REL_",
    "BU_SG_REL_",
    "BU_EV_REL_",
    "BU_BO_REL_",
    "SG_MUL_VAL_",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Keyword,
    Identifier,
    Number,
    /// Quoted string; `text` holds the unescaped content.
    String,
    /// One of `( ) [ ] , @ ; : |`.
    Punct,
    /// `+` or `-` not followed by a digit.
    Sign,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset in the source.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    /// First token of its line; records are resynchronized on these.
    pub first_on_line: bool,
}

impl Token {
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == keyword
    }

    pub fn is_punct(&self, punct: char) -> bool {
        self.kind == TokenKind::Punct && self.text.starts_with(punct)
    }
}

struct Scanner<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    column: usize,
    last_token_line: usize,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.src.len(), |(o, _)| *o)
    }

    fn bump(&mut self) -> Option<char> {
        let c: char = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            line: self.line,
            column: self.column,
            kind,
        }
    }

    fn eat_digits(&mut self) -> usize {
        let mut count: usize = 0;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            count += 1;
        }
        count
    }

    fn eat_word(&mut self) {
        while self.peek().is_some_and(is_word_char) {
            self.bump();
        }
    }

    /// Scans a number; falls back to an identifier when word characters follow.
    fn scan_number(&mut self) -> TokenKind {
        if matches!(self.peek(), Some('+') | Some('-')) {
            self.bump();
        }
        self.eat_digits();
        if self.peek() == Some('.') {
            self.bump();
            self.eat_digits();
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let signed: bool = matches!(self.peek_at(1), Some('+') | Some('-'));
            let digit_at: usize = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                if signed {
                    self.bump();
                }
                self.eat_digits();
            }
        }
        if self.peek().is_some_and(is_word_char) {
            self.eat_word();
            return TokenKind::Identifier;
        }
        TokenKind::Number
    }

    fn scan_string(&mut self) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump(); // opening quote
        let mut text: String = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some('\\') if self.peek() == Some('"') => {
                    self.bump();
                    text.push('"');
                }
                Some(c) => text.push(c),
                None => {
                    return Err(ParseError {
                        line,
                        column,
                        kind: ParseErrorKind::UnterminatedString,
                    });
                }
            }
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits DBC text into tokens. Whitespace and `//` comments are dropped.
pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut scanner: Scanner<'_> = Scanner {
        src,
        chars: src.char_indices().collect(),
        pos: 0,
        line: 1,
        column: 1,
        last_token_line: 0,
    };
    let mut tokens: Vec<Token> = Vec::new();

    while let Some(c) = scanner.peek() {
        if c.is_whitespace() || c == '\u{feff}' {
            scanner.bump();
            continue;
        }
        if c == '/' && scanner.peek_at(1) == Some('/') {
            while scanner.peek().is_some_and(|c| c != '\n') {
                scanner.bump();
            }
            continue;
        }

        let (offset, line, column) = (scanner.offset(), scanner.line, scanner.column);
        let next: Option<char> = scanner.peek_at(1);
        let (kind, text): (TokenKind, String) = match c {
            '"' => (TokenKind::String, scanner.scan_string()?),
            '(' | ')' | '[' | ']' | ',' | '@' | ';' | ':' | '|' => {
                scanner.bump();
                (TokenKind::Punct, c.to_string())
            }
            '+' | '-' if next.is_some_and(|n| n.is_ascii_digit() || n == '.') => {
                let kind: TokenKind = scanner.scan_number();
                (kind, src[offset..scanner.offset()].to_string())
            }
            '+' | '-' => {
                scanner.bump();
                (TokenKind::Sign, c.to_string())
            }
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => {
                let kind: TokenKind = scanner.scan_number();
                (kind, src[offset..scanner.offset()].to_string())
            }
            c if c.is_ascii_digit() => {
                let kind: TokenKind = scanner.scan_number();
                (kind, src[offset..scanner.offset()].to_string())
            }
            c if is_word_char(c) => {
                scanner.eat_word();
                let word: &str = &src[offset..scanner.offset()];
                let kind: TokenKind = if KEYWORDS.contains(&word) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                };
                (kind, word.to_string())
            }
            other => return Err(scanner.error(ParseErrorKind::UnexpectedCharacter(other))),
        };

        let first_on_line: bool = scanner.last_token_line != line;
        scanner.last_token_line = scanner.line;
        tokens.push(Token {
            kind,
            text,
            offset,
            line,
            column,
            first_on_line,
        });
    }
    Ok(tokens)
}

/// Read position over a token list, with `expect_*` helpers naming the record being parsed.
pub(crate) struct TokenCursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TokenCursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        TokenCursor { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    pub fn next(&mut self) -> Option<&'t Token> {
        let token: Option<&'t Token> = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// `true` if the next token is a keyword opening a line.
    pub fn at_record_start(&self) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Keyword && t.first_on_line)
    }

    pub fn peek_is_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    pub fn peek_is_punct(&self, punct: char) -> bool {
        self.peek().is_some_and(|t| t.is_punct(punct))
    }

    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    /// Skips the current token and everything up to the next record start.
    pub fn skip_record(&mut self) {
        self.next();
        while self.peek().is_some() && !self.at_record_start() {
            self.pos += 1;
        }
    }

    /// Error located at the current token (or the last one at end of input).
    pub fn error(&self, record: &'static str, expected: &'static str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError {
                line: token.line,
                column: token.column,
                kind: ParseErrorKind::Unexpected {
                    record,
                    expected,
                    found: token.text.clone(),
                },
            },
            None => {
                let (line, column) = self
                    .tokens
                    .last()
                    .map_or((1, 1), |t| (t.line, t.column + t.text.len()));
                ParseError {
                    line,
                    column,
                    kind: ParseErrorKind::UnexpectedEof { record },
                }
            }
        }
    }

    fn number_error(&self, record: &'static str, token: &Token) -> ParseError {
        ParseError {
            line: token.line,
            column: token.column,
            kind: ParseErrorKind::InvalidNumber {
                record,
                text: token.text.clone(),
            },
        }
    }

    pub fn expect_keyword(&mut self, record: &'static str, keyword: &'static str) -> Result<(), ParseError> {
        if self.peek_is_keyword(keyword) {
            self.pos += 1;
            return Ok(());
        }
        Err(self.error(record, keyword))
    }

    pub fn expect_punct(&mut self, record: &'static str, punct: char) -> Result<(), ParseError> {
        if self.peek_is_punct(punct) {
            self.pos += 1;
            return Ok(());
        }
        let expected: &'static str = match punct {
            '(' => "'('",
            ')' => "')'",
            '[' => "'['",
            ']' => "']'",
            ',' => "','",
            '@' => "'@'",
            ';' => "';'",
            ':' => "':'",
            _ => "'|'",
        };
        Err(self.error(record, expected))
    }

    /// Consumes `punct` if it is next.
    pub fn eat_punct(&mut self, punct: char) -> bool {
        if self.peek_is_punct(punct) {
            self.pos += 1;
            return true;
        }
        false
    }

    /// Identifier; keywords are accepted too, as some files use them as names.
    pub fn expect_name(&mut self, record: &'static str) -> Result<String, ParseError> {
        match self.peek() {
            Some(t) if matches!(t.kind, TokenKind::Identifier | TokenKind::Keyword) => {
                self.pos += 1;
                Ok(t.text.clone())
            }
            _ => Err(self.error(record, "identifier")),
        }
    }

    pub fn expect_string(&mut self, record: &'static str) -> Result<String, ParseError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::String => {
                self.pos += 1;
                Ok(t.text.clone())
            }
            _ => Err(self.error(record, "string")),
        }
    }

    /// Number token, returned as its source text.
    pub fn expect_number(&mut self, record: &'static str) -> Result<&'t Token, ParseError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Number => {
                self.pos += 1;
                Ok(t)
            }
            _ => Err(self.error(record, "number")),
        }
    }

    pub fn expect_f64(&mut self, record: &'static str) -> Result<f64, ParseError> {
        let token: &Token = self.expect_number(record)?;
        token
            .text
            .parse::<f64>()
            .map_err(|_| self.number_error(record, token))
    }

    pub fn expect_i64(&mut self, record: &'static str) -> Result<i64, ParseError> {
        let token: &Token = self.expect_number(record)?;
        crate::types::attributes::parse_integer(&token.text)
            .ok_or_else(|| self.number_error(record, token))
    }

    pub fn expect_u32(&mut self, record: &'static str) -> Result<u32, ParseError> {
        let token: &Token = self.expect_number(record)?;
        token
            .text
            .trim_start_matches('+')
            .parse::<u32>()
            .map_err(|_| self.number_error(record, token))
    }

    /// `+`/`-` sign token.
    pub fn expect_sign(&mut self, record: &'static str) -> Result<char, ParseError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Sign => {
                self.pos += 1;
                Ok(if t.text == "-" { '-' } else { '+' })
            }
            _ => Err(self.error(record, "'+' or '-'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_texts(src: &str) -> Vec<(TokenKind, String)> {
        tokenize(src)
            .expect("tokenize")
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_signal_line_tokens() {
        let tokens = kinds_and_texts(r#" SG_ Temp m1 : 0|12@0- (0.01,-250) [229.52|270.47] "degK" A,B"#);
        let texts: Vec<&str> = tokens.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "SG_", "Temp", "m1", ":", "0", "|", "12", "@", "0", "-", "(", "0.01", ",", "-250", ")",
                "[", "229.52", "|", "270.47", "]", "degK", "A", ",", "B"
            ]
        );
        assert_eq!(tokens[0].0, TokenKind::Keyword);
        assert_eq!(tokens[2].0, TokenKind::Identifier);
        assert_eq!(tokens[9].0, TokenKind::Sign);
        assert_eq!(tokens[13].0, TokenKind::Number);
        assert_eq!(tokens[20].0, TokenKind::String);
    }

    #[test]
    fn test_numbers_and_ranges() {
        let tokens = kinds_and_texts("1e-05 3.4E+038 1-1 2bad");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Number, "1e-05".to_string()),
                (TokenKind::Number, "3.4E+038".to_string()),
                (TokenKind::Number, "1".to_string()),
                (TokenKind::Number, "-1".to_string()),
                (TokenKind::Identifier, "2bad".to_string()),
            ]
        );
    }

    #[test]
    fn test_strings_and_comments() {
        let tokens = kinds_and_texts("CM_ \"say \\\"hi\\\"\nthere\"; // trailing\nBU_:");
        assert_eq!(tokens[1], (TokenKind::String, "say \"hi\"\nthere".to_string()));
        assert_eq!(tokens.len(), 5);
    }

    #[test]
    fn test_positions_and_line_starts() {
        let tokens: Vec<Token> = tokenize("BO_ 1 A: 8 X\n SG_ S : 0|8@1+").expect("tokenize");
        assert!(tokens[0].first_on_line);
        assert!(!tokens[1].first_on_line);
        let sg: &Token = &tokens[6];
        assert_eq!((sg.line, sg.column), (2, 2));
        assert!(sg.first_on_line);
    }

    #[test]
    fn test_errors_carry_position() {
        let err: ParseError = tokenize("VERSION \"open").expect_err("unterminated");
        assert_eq!((err.line, err.column), (1, 9));
        assert_eq!(err.kind, ParseErrorKind::UnterminatedString);

        let err: ParseError = tokenize("BU_: A\n  = B").expect_err("bad char");
        assert_eq!((err.line, err.column), (2, 3));
    }

    #[test]
    fn test_cursor_errors_name_record() {
        let tokens: Vec<Token> = tokenize("BO_ x").expect("tokenize");
        let mut cursor: TokenCursor<'_> = TokenCursor::new(&tokens);
        cursor.expect_keyword("BO_", "BO_").expect("keyword");
        let err: ParseError = cursor.expect_u32("BO_").expect_err("not a number");
        assert!(matches!(err.kind, ParseErrorKind::Unexpected { record: "BO_", .. }));
        cursor.next();
        let err: ParseError = cursor.expect_punct("BO_", ':').expect_err("eof");
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEof { record: "BO_" });
    }
}
