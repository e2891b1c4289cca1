use crate::error::{LexError, SourceSpan};
use std::fmt;

/// Reserved words. A word lexes as a keyword only when it matches one of
/// these exactly; longer words (`falseValue`, `iffy`) are identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    True,
    False,
    Null,
    If,
    Else,
    Try,
    Retry,
    Catch,
    Throw,
    For,
    In,
    Break,
    Continue,
    Return,
    Workflow,
    Parallel,
    Branch,
    And,
    Or,
    Not,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Keyword> {
        let kw = match word {
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "try" => Keyword::Try,
            "retry" => Keyword::Retry,
            "catch" => Keyword::Catch,
            "throw" => Keyword::Throw,
            "for" => Keyword::For,
            "in" => Keyword::In,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "return" => Keyword::Return,
            "workflow" => Keyword::Workflow,
            "parallel" => Keyword::Parallel,
            "branch" => Keyword::Branch,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            _ => return None,
        };
        Some(kw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::Try => "try",
            Keyword::Retry => "retry",
            Keyword::Catch => "catch",
            Keyword::Throw => "throw",
            Keyword::For => "for",
            Keyword::In => "in",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Return => "return",
            Keyword::Workflow => "workflow",
            Keyword::Parallel => "parallel",
            Keyword::Branch => "branch",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
        }
    }
}

/// Numeric literal value. Integers that overflow `i64` become floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    Keyword(Keyword),
    /// String literal content with escapes resolved
    Str(String),
    Number(Number),
    /// `${...}` -- carries the text between the braces
    ExprLiteral(String),
    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Assign,
    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    // Comparison operators
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Eof,
}

impl Token {
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        matches!(self, Token::Keyword(k) if *k == kw)
    }

    /// Operators allowed between two terms: `+ - * / % < <= > >= == != and or in`.
    pub fn is_binary_operator(&self) -> bool {
        matches!(
            self,
            Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Percent
                | Token::Eq
                | Token::Neq
                | Token::Lt
                | Token::Lte
                | Token::Gt
                | Token::Gte
                | Token::Keyword(Keyword::And)
                | Token::Keyword(Keyword::Or)
                | Token::Keyword(Keyword::In)
        )
    }

    /// Operators allowed in front of a term: `- + not`.
    pub fn is_unary_operator(&self) -> bool {
        matches!(
            self,
            Token::Plus | Token::Minus | Token::Keyword(Keyword::Not)
        )
    }

    /// True for tokens after which a `-` must be the binary minus operator
    /// rather than the sign of a number literal.
    fn ends_value(&self) -> bool {
        matches!(
            self,
            Token::Identifier(_)
                | Token::Str(_)
                | Token::Number(_)
                | Token::ExprLiteral(_)
                | Token::RParen
                | Token::RBracket
                | Token::RBrace
                | Token::Keyword(Keyword::True)
                | Token::Keyword(Keyword::False)
                | Token::Keyword(Keyword::Null)
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "identifier '{}'", name),
            Token::Keyword(kw) => write!(f, "'{}'", kw.as_str()),
            Token::Str(_) => f.write_str("string literal"),
            Token::Number(_) => f.write_str("number literal"),
            Token::ExprLiteral(_) => f.write_str("expression literal"),
            Token::Eof => f.write_str("end of input"),
            other => write!(f, "'{}'", punctuation_image(other)),
        }
    }
}

fn punctuation_image(token: &Token) -> &'static str {
    match token {
        Token::LParen => "(",
        Token::RParen => ")",
        Token::LBracket => "[",
        Token::RBracket => "]",
        Token::LBrace => "{",
        Token::RBrace => "}",
        Token::Comma => ",",
        Token::Dot => ".",
        Token::Colon => ":",
        Token::Assign => "=",
        Token::Plus => "+",
        Token::Minus => "-",
        Token::Star => "*",
        Token::Slash => "/",
        Token::Percent => "%",
        Token::Eq => "==",
        Token::Neq => "!=",
        Token::Lt => "<",
        Token::Lte => "<=",
        Token::Gt => ">",
        Token::Gte => ">=",
        _ => "",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    /// Source text of the token
    pub image: String,
    pub span: SourceSpan,
}

struct Cursor<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(o, _)| *o)
            .unwrap_or(self.src.len())
    }

    fn span(&self) -> SourceSpan {
        SourceSpan {
            offset: self.offset(),
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn slice_from(&self, start: usize) -> &'a str {
        &self.src[start..self.offset()]
    }

    fn error_here(&self, span: SourceSpan) -> LexError {
        let text: String = self.src[span.offset..]
            .chars()
            .take_while(|c| !c.is_whitespace())
            .take(16)
            .collect();
        LexError { text, span }
    }
}

/// Convert source text into tokens. The returned stream always ends with
/// [`Token::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, LexError> {
    let mut cur = Cursor::new(src);
    let mut tokens: Vec<Spanned> = Vec::new();

    while let Some(c) = cur.peek() {
        // Line comment
        if c == '/' && cur.peek_at(1) == Some('/') {
            while let Some(c) = cur.peek() {
                if c == '\n' {
                    break;
                }
                cur.bump();
            }
            continue;
        }

        if matches!(c, ' ' | '\t' | '\r' | '\n') {
            cur.bump();
            continue;
        }

        let span = cur.span();
        let start = span.offset;

        let token = if c == '"' {
            lex_string(&mut cur, span)?
        } else if c == '$' && cur.peek_at(1) == Some('{') {
            lex_expression_literal(&mut cur, span)?
        } else if c.is_ascii_digit()
            || (c == '-'
                && cur.peek_at(1).is_some_and(|d| d.is_ascii_digit())
                && !tokens.last().is_some_and(|t| t.token.ends_value()))
        {
            lex_number(&mut cur, span)?
        } else if c.is_ascii_alphabetic() || c == '_' {
            while cur
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                cur.bump();
            }
            let word = cur.slice_from(start);
            match Keyword::from_word(word) {
                Some(kw) => Token::Keyword(kw),
                None => Token::Identifier(word.to_owned()),
            }
        } else {
            lex_punctuation(&mut cur, span)?
        };

        tokens.push(Spanned {
            token,
            image: cur.slice_from(start).to_owned(),
            span,
        });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        image: String::new(),
        span: cur.span(),
    });
    tracing::debug!(tokens = tokens.len(), "tokenized source");
    Ok(tokens)
}

fn lex_string(cur: &mut Cursor<'_>, span: SourceSpan) -> Result<Token, LexError> {
    cur.bump(); // opening quote
    let mut s = String::new();
    loop {
        let Some(c) = cur.bump() else {
            return Err(cur.error_here(span));
        };
        match c {
            '"' => break,
            '\n' => return Err(cur.error_here(span)),
            '\\' => {
                let Some(esc) = cur.bump() else {
                    return Err(cur.error_here(span));
                };
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    '/' => s.push('/'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    'f' => s.push('\u{000C}'),
                    'b' => s.push('\u{0008}'),
                    'u' => s.push(lex_unicode_escape(cur, span)?),
                    _ => return Err(cur.error_here(span)),
                }
            }
            other => s.push(other),
        }
    }
    Ok(Token::Str(s))
}

fn lex_hex4(cur: &mut Cursor<'_>, span: SourceSpan) -> Result<u32, LexError> {
    let mut code = 0u32;
    for _ in 0..4 {
        let digit = cur
            .bump()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| cur.error_here(span))?;
        code = code * 16 + digit;
    }
    Ok(code)
}

/// `XXXX` after `\u`. A high surrogate must be followed by a `\uXXXX` low
/// surrogate; the pair decodes to one character.
fn lex_unicode_escape(cur: &mut Cursor<'_>, span: SourceSpan) -> Result<char, LexError> {
    let high = lex_hex4(cur, span)?;
    let code = match high {
        0xD800..=0xDBFF => {
            if cur.bump() != Some('\\') || cur.bump() != Some('u') {
                return Err(cur.error_here(span));
            }
            let low = lex_hex4(cur, span)?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(cur.error_here(span));
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        }
        code => code,
    };
    // Lone low surrogates are not characters.
    char::from_u32(code).ok_or_else(|| cur.error_here(span))
}

fn lex_expression_literal(cur: &mut Cursor<'_>, span: SourceSpan) -> Result<Token, LexError> {
    cur.bump();
    cur.bump();
    let inner_start = cur.offset();
    loop {
        match cur.peek() {
            None => return Err(cur.error_here(span)),
            Some('}') => break,
            Some(_) => {
                cur.bump();
            }
        }
    }
    let inner = cur.slice_from(inner_start).to_owned();
    cur.bump(); // closing brace
    Ok(Token::ExprLiteral(inner))
}

/// Largest magnitude below which every integral `f64` is exact.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn lex_number(cur: &mut Cursor<'_>, span: SourceSpan) -> Result<Token, LexError> {
    let start = span.offset;
    if cur.peek() == Some('-') {
        cur.bump();
    }
    if cur.peek() == Some('0') {
        cur.bump();
    } else {
        while cur.peek().is_some_and(|c| c.is_ascii_digit()) {
            cur.bump();
        }
    }

    let mut has_fraction = false;
    let mut has_exponent = false;
    if cur.peek() == Some('.') && cur.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
        has_fraction = true;
        cur.bump();
        while cur.peek().is_some_and(|c| c.is_ascii_digit()) {
            cur.bump();
        }
    }

    if matches!(cur.peek(), Some('e' | 'E')) {
        let signed = matches!(cur.peek_at(1), Some('+' | '-'));
        let digit_at = if signed { 2 } else { 1 };
        if cur.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
            has_exponent = true;
            for _ in 0..digit_at {
                cur.bump();
            }
            while cur.peek().is_some_and(|c| c.is_ascii_digit()) {
                cur.bump();
            }
        }
    }

    let text = cur.slice_from(start);
    if !has_fraction && !has_exponent {
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Token::Number(Number::Int(n)));
        }
    }
    match text.parse::<f64>() {
        // `1e3` without a fraction stays an integer while it is exact.
        Ok(f)
            if !has_fraction && has_exponent && f.fract() == 0.0 && f.abs() <= MAX_EXACT_INT =>
        {
            Ok(Token::Number(Number::Int(f as i64)))
        }
        Ok(f) if f.is_finite() => Ok(Token::Number(Number::Float(f))),
        _ => Err(cur.error_here(span)),
    }
}

fn lex_punctuation(cur: &mut Cursor<'_>, span: SourceSpan) -> Result<Token, LexError> {
    let c = cur.peek().ok_or_else(|| cur.error_here(span))?;
    let next = cur.peek_at(1);
    let (token, width) = match (c, next) {
        ('=', Some('=')) => (Token::Eq, 2),
        ('!', Some('=')) => (Token::Neq, 2),
        ('<', Some('=')) => (Token::Lte, 2),
        ('>', Some('=')) => (Token::Gte, 2),
        ('=', _) => (Token::Assign, 1),
        ('<', _) => (Token::Lt, 1),
        ('>', _) => (Token::Gt, 1),
        ('+', _) => (Token::Plus, 1),
        ('-', _) => (Token::Minus, 1),
        ('*', _) => (Token::Star, 1),
        ('/', _) => (Token::Slash, 1),
        ('%', _) => (Token::Percent, 1),
        ('(', _) => (Token::LParen, 1),
        (')', _) => (Token::RParen, 1),
        ('[', _) => (Token::LBracket, 1),
        (']', _) => (Token::RBracket, 1),
        ('{', _) => (Token::LBrace, 1),
        ('}', _) => (Token::RBrace, 1),
        (',', _) => (Token::Comma, 1),
        ('.', _) => (Token::Dot, 1),
        (':', _) => (Token::Colon, 1),
        _ => return Err(cur.error_here(span)),
    };
    for _ in 0..width {
        cur.bump();
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn keyword_prefix_is_identifier() {
        assert_eq!(
            kinds("falseValue iffy in"),
            vec![
                Token::Identifier("falseValue".to_owned()),
                Token::Identifier("iffy".to_owned()),
                Token::Keyword(Keyword::In),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes_are_resolved() {
        let toks = kinds(r#""a\"b\\c\nA\/""#);
        assert_eq!(toks[0], Token::Str("a\"b\\c\nA/".to_owned()));
    }

    #[test]
    fn numbers_distinguish_int_and_float() {
        let numbers: Vec<Token> = kinds("[1, 2.5, -3, 1e3, 1.0e3, 2e-1]")
            .into_iter()
            .filter(|t| matches!(t, Token::Number(_)))
            .collect();
        assert_eq!(
            numbers,
            vec![
                Token::Number(Number::Int(1)),
                Token::Number(Number::Float(2.5)),
                Token::Number(Number::Int(-3)),
                Token::Number(Number::Int(1000)),
                Token::Number(Number::Float(1000.0)),
                Token::Number(Number::Float(0.2)),
            ]
        );
    }

    #[test]
    fn minus_after_value_is_operator() {
        assert_eq!(
            kinds("a-1"),
            vec![
                Token::Identifier("a".to_owned()),
                Token::Minus,
                Token::Number(Number::Int(1)),
                Token::Eof,
            ]
        );
        assert_eq!(
            kinds("= -1"),
            vec![Token::Assign, Token::Number(Number::Int(-1)), Token::Eof]
        );
    }

    #[test]
    fn expression_literal_stops_at_first_brace() {
        let toks = tokenize("${a + b} }").unwrap();
        assert_eq!(toks[0].token, Token::ExprLiteral("a + b".to_owned()));
        assert_eq!(toks[0].image, "${a + b}");
        assert_eq!(toks[1].token, Token::RBrace);
    }

    #[test]
    fn comments_and_whitespace_are_discarded() {
        assert_eq!(
            kinds("a // comment\n== b"),
            vec![
                Token::Identifier("a".to_owned()),
                Token::Eq,
                Token::Identifier("b".to_owned()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn spans_track_line_and_column() {
        let toks = tokenize("a\n  bb").unwrap();
        assert_eq!(
            toks[1].span,
            SourceSpan {
                offset: 4,
                line: 2,
                column: 3
            }
        );
    }

    #[test]
    fn unmatched_character_is_lex_error() {
        let err = tokenize("a = #x").unwrap_err();
        assert_eq!(err.text, "#x");
        assert_eq!(err.span.offset, 4);
        assert_eq!(err.span.column, 5);
    }

    #[test]
    fn unterminated_string_is_lex_error() {
        assert!(tokenize("\"abc").is_err());
        assert!(tokenize("\"ab\nc\"").is_err());
    }

    #[test]
    fn surrogate_pair_escape_decodes_to_one_char() {
        let toks = kinds(r#""\ud83d\ude00 \u00e9""#);
        assert_eq!(toks[0], Token::Str("\u{1F600} \u{e9}".to_owned()));
    }

    #[test]
    fn lone_surrogates_are_lex_errors() {
        assert!(tokenize(r#""\ud83d""#).is_err());
        assert!(tokenize(r#""\ud83dx""#).is_err());
        assert!(tokenize(r#""\ud83d\u0041""#).is_err());
        assert!(tokenize(r#""\ude00""#).is_err());
    }
}
