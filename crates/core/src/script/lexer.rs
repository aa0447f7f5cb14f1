use super::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(value) => format!("number `{value}`"),
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Plus => "`+`".to_string(),
            TokenKind::Minus => "`-`".to_string(),
            TokenKind::Star => "`*`".to_string(),
            TokenKind::Slash => "`/`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::Eof => "end of statement".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub column: usize,
}

/// Tokenizer for the right-hand side of a single assignment.
///
/// Columns are reported relative to the start of the source line, so the
/// caller passes the column at which `source` begins.
pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    start_column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, line: usize, start_column: usize) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line,
            start_column,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ScriptError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let column = self.column();
            if self.is_at_end() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    column,
                });
                return Ok(tokens);
            }

            let ch = self.advance();
            let kind = match ch {
                b'+' => TokenKind::Plus,
                b'-' => TokenKind::Minus,
                b'*' => TokenKind::Star,
                b'/' => TokenKind::Slash,
                b'(' => TokenKind::LParen,
                b')' => TokenKind::RParen,
                b'0'..=b'9' | b'.' => TokenKind::Number(self.read_number(column)?),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => TokenKind::Ident(self.read_ident()),
                _ => {
                    return Err(ScriptError::UnexpectedChar {
                        line: self.line,
                        column,
                        found: self.char_at(self.pos - 1),
                    })
                }
            };
            tokens.push(Token { kind, column });
        }
    }

    /// Every byte consumed before an error is ASCII, so the byte position is
    /// also the character count.
    fn column(&self) -> usize {
        self.start_column + self.pos
    }

    /// Decodes the full character starting at byte `pos`.
    fn char_at(&self, pos: usize) -> char {
        std::str::from_utf8(&self.source[pos..])
            .ok()
            .and_then(|rest| rest.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        ch
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.pos]
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), b' ' | b'\t' | b'\r') {
            self.pos += 1;
        }
    }

    fn read_number(&mut self, column: usize) -> Result<f64, ScriptError> {
        let start = self.pos - 1;
        while self.peek().is_ascii_digit() || self.peek() == b'.' {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default();
        text.parse::<f64>().map_err(|_| ScriptError::InvalidNumber {
            line: self.line,
            column,
            text: text.to_string(),
        })
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos - 1;
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.source[start..self.pos]).into_owned()
    }
}
