//! Parser for the textual S-expression syntax printed by djvulibre.

use super::SExpr;
use crate::error::{Error, Result};

/// Maximum list nesting accepted by the parser.
///
/// Real text layouts nest five or six levels deep; anything beyond this is
/// rejected instead of exhausting the stack.
pub const MAX_DEPTH: usize = 256;

/// Parse exactly one expression.
///
/// Trailing whitespace and comments are allowed, any other trailing data is
/// an error.
pub fn parse(input: &[u8]) -> Result<SExpr> {
    let mut parser = Parser::new(input);
    parser.skip_trivia();
    if parser.at_end() {
        return Err(Error::syntax(0, "empty input"));
    }
    let expr = parser.parse_expr(0)?;
    parser.skip_trivia();
    if !parser.at_end() {
        return Err(Error::syntax(parser.pos, "trailing data after expression"));
    }
    Ok(expr)
}

/// Parse a sequence of expressions.
///
/// Empty input yields an empty vector: djvused prints nothing for a page
/// without a text layer.
pub fn parse_all(input: &[u8]) -> Result<Vec<SExpr>> {
    let mut parser = Parser::new(input);
    let mut exprs = Vec::new();
    loop {
        parser.skip_trivia();
        if parser.at_end() {
            return Ok(exprs);
        }
        exprs.push(parser.parse_expr(0)?);
    }
}

/// Whether a bare token is read as an integer (`[+-]?[0-9]+`).
pub(crate) fn looks_like_integer(token: &[u8]) -> bool {
    let digits = match token.first() {
        Some(b'+') | Some(b'-') => &token[1..],
        _ => token,
    };
    !digits.is_empty() && digits.iter().all(u8::is_ascii_digit)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip_trivia(&mut self) {
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() {
                self.pos += 1;
            } else if byte == b';' {
                while let Some(b) = self.bump() {
                    if b == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn parse_expr(&mut self, depth: usize) -> Result<SExpr> {
        match self.peek() {
            Some(b'(') => self.parse_list(depth),
            Some(b')') => Err(Error::syntax(self.pos, "unexpected ')'")),
            Some(b'"') => self.parse_string(),
            Some(b'|') => self.parse_quoted_symbol(),
            Some(_) => self.parse_atom(),
            None => Err(Error::syntax(self.pos, "unexpected end of input")),
        }
    }

    fn parse_list(&mut self, depth: usize) -> Result<SExpr> {
        let start = self.pos;
        if depth >= MAX_DEPTH {
            return Err(Error::syntax(
                start,
                format!("nesting deeper than {} levels", MAX_DEPTH),
            ));
        }
        self.pos += 1;

        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(b')') => {
                    self.pos += 1;
                    return Ok(SExpr::List(items));
                }
                Some(_) => items.push(self.parse_expr(depth + 1)?),
                None => return Err(Error::syntax(start, "unterminated list")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<SExpr> {
        let start = self.pos;
        self.pos += 1;

        let mut bytes = Vec::new();
        loop {
            let byte = self
                .bump()
                .ok_or_else(|| Error::syntax(start, "unterminated string"))?;
            match byte {
                b'"' => return Ok(SExpr::String(bytes)),
                b'\\' => self.parse_escape(start, &mut bytes)?,
                _ => bytes.push(byte),
            }
        }
    }

    fn parse_escape(&mut self, start: usize, out: &mut Vec<u8>) -> Result<()> {
        let byte = self
            .bump()
            .ok_or_else(|| Error::syntax(start, "unterminated string"))?;
        match byte {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'a' => out.push(0x07),
            b'v' => out.push(0x0b),
            b'\n' => {}
            b'0'..=b'7' => {
                let mut value = u32::from(byte - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xff) as u8);
            }
            b'x' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    match self.peek().and_then(|d| (d as char).to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            self.pos += 1;
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    out.push(b'x');
                } else {
                    out.push(value as u8);
                }
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn parse_quoted_symbol(&mut self) -> Result<SExpr> {
        let start = self.pos;
        self.pos += 1;
        let begin = self.pos;
        while let Some(byte) = self.peek() {
            if byte == b'|' {
                let name = self.symbol_text(begin, self.pos)?;
                self.pos += 1;
                return Ok(SExpr::Symbol(name));
            }
            self.pos += 1;
        }
        Err(Error::syntax(start, "unterminated quoted symbol"))
    }

    fn parse_atom(&mut self) -> Result<SExpr> {
        let begin = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() || matches!(byte, b'(' | b')' | b'"' | b';' | b'|') {
                break;
            }
            self.pos += 1;
        }
        let token = &self.input[begin..self.pos];

        if looks_like_integer(token) {
            // Token is ASCII digits with an optional sign, so it is valid UTF-8.
            let text = std::str::from_utf8(token)
                .map_err(|_| Error::syntax(begin, "invalid integer"))?;
            return text
                .parse::<i64>()
                .map(SExpr::Integer)
                .map_err(|_| Error::syntax(begin, format!("integer out of range: {}", text)));
        }

        Ok(SExpr::Symbol(self.symbol_text(begin, self.pos)?))
    }

    fn symbol_text(&self, begin: usize, end: usize) -> Result<String> {
        std::str::from_utf8(&self.input[begin..end])
            .map(str::to_string)
            .map_err(|_| Error::syntax(begin, "symbol is not valid UTF-8"))
    }
}
