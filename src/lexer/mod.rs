//! Lexer for Grace source text.
//!
//! Hand-written, character-driven tokenizer. Whitespace is skipped, `$` opens
//! a line comment, `$$ ... $$` a non-nesting block comment. Every produced
//! token carries a [`Span`] with 1-based line/column information.

mod token;

pub use token::*;

use std::{collections::HashMap, error::Error, fmt::Display, iter::Peekable, str::Chars};

use once_cell::sync::Lazy;

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("and", TokenKind::And),
        ("or", TokenKind::Or),
        ("not", TokenKind::Not),
        ("div", TokenKind::Div),
        ("mod", TokenKind::Mod),
        ("var", TokenKind::Var),
        ("fun", TokenKind::Fun),
        ("ref", TokenKind::Ref),
        ("return", TokenKind::Return),
        ("if", TokenKind::If),
        ("then", TokenKind::Then),
        ("else", TokenKind::Else),
        ("while", TokenKind::While),
        ("do", TokenKind::Do),
        ("char", TokenKind::CharKeyword),
        ("int", TokenKind::IntKeyword),
        ("nothing", TokenKind::NothingKeyword),
    ])
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub position: Span,
}

pub type LexResult<T> = Result<T, LexError>;

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl Error for LexError {}

impl LexError {
    fn new(message: impl ToString, position: Span) -> Self {
        Self {
            message: message.to_string(),
            position,
        }
    }
}

pub struct Lexer<'a> {
    tokens: Vec<Token>,
    iterator: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            tokens: vec![],
            iterator: input.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.iterator.peek().copied()
    }

    /// Consume one character, keeping line/column bookkeeping in sync.
    fn bump(&mut self) -> Option<char> {
        let next = self.iterator.next();
        match next {
            Some('\n') => {
                self.line += 1;
                self.col = 1;
            }
            Some(_) => self.col += 1,
            None => {}
        }
        next
    }

    fn here(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    fn span_from(&self, start: (usize, usize)) -> Span {
        Span::new(start, self.here())
    }

    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        loop {
            self.eat_whitespace_and_comments()?;

            let Some(next) = self.peek() else {
                return Ok(self.tokens);
            };

            match next {
                'a'..='z' | 'A'..='Z' | '_' => self.lex_word(),
                '0'..='9' => self.lex_integer()?,
                '\'' => self.lex_char_literal()?,
                '"' => self.lex_string_literal()?,
                _ => self.lex_operator()?,
            }
        }
    }

    fn eat_whitespace_and_comments(&mut self) -> LexResult<()> {
        loop {
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    self.bump();
                } else {
                    break;
                }
            }

            if self.peek() != Some('$') {
                return Ok(());
            }

            let start = self.here();
            self.bump();
            if self.peek() == Some('$') {
                self.bump();
                self.eat_block_comment(start)?;
            } else {
                // line comment, runs to end of line
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            }
        }
    }

    fn eat_block_comment(&mut self, start: (usize, usize)) -> LexResult<()> {
        loop {
            match self.bump() {
                Some('$') if self.peek() == Some('$') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    return Err(LexError::new(
                        "unterminated block comment",
                        self.span_from(start),
                    ))
                }
            }
        }
    }

    fn lex_word(&mut self) {
        let start = self.here();
        let mut word = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let position = self.span_from(start);
        let token = match KEYWORDS.get(word.as_str()).copied() {
            Some(TokenKind::And) => Token::And { position },
            Some(TokenKind::Or) => Token::Or { position },
            Some(TokenKind::Not) => Token::Not { position },
            Some(TokenKind::Div) => Token::Div { position },
            Some(TokenKind::Mod) => Token::Mod { position },
            Some(TokenKind::Var) => Token::Var { position },
            Some(TokenKind::Fun) => Token::Fun { position },
            Some(TokenKind::Ref) => Token::Ref { position },
            Some(TokenKind::Return) => Token::Return { position },
            Some(TokenKind::If) => Token::If { position },
            Some(TokenKind::Then) => Token::Then { position },
            Some(TokenKind::Else) => Token::Else { position },
            Some(TokenKind::While) => Token::While { position },
            Some(TokenKind::Do) => Token::Do { position },
            Some(TokenKind::CharKeyword) => Token::CharKeyword { position },
            Some(TokenKind::IntKeyword) => Token::IntKeyword { position },
            Some(TokenKind::NothingKeyword) => Token::NothingKeyword { position },
            _ => Token::Id {
                value: word,
                position,
            },
        };
        self.tokens.push(token);
    }

    fn lex_integer(&mut self) -> LexResult<()> {
        let start = self.here();
        let mut digits = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let position = self.span_from(start);
        let value = digits
            .parse::<i64>()
            .map_err(|_| LexError::new("integer literal out of range", position.clone()))?;

        self.tokens.push(Token::IntLiteral { value, position });
        Ok(())
    }

    /// Decode one escape sequence after a consumed backslash.
    fn lex_escape(&mut self, start: (usize, usize)) -> LexResult<u8> {
        match self.bump() {
            Some('n') => Ok(b'\n'),
            Some('t') => Ok(b'\t'),
            Some('r') => Ok(b'\r'),
            Some('0') => Ok(0),
            Some('\\') => Ok(b'\\'),
            Some('\'') => Ok(b'\''),
            Some('"') => Ok(b'"'),
            Some('x') => {
                let hi = self.bump();
                let lo = self.bump();
                match (
                    hi.and_then(|c| c.to_digit(16)),
                    lo.and_then(|c| c.to_digit(16)),
                ) {
                    (Some(hi), Some(lo)) => Ok((hi * 16 + lo) as u8),
                    _ => Err(LexError::new(
                        "bad hex escape, expected '\\xHH'",
                        self.span_from(start),
                    )),
                }
            }
            Some(c) => Err(LexError::new(
                format!("bad escape sequence '\\{c}'"),
                self.span_from(start),
            )),
            None => Err(LexError::new("bad escape sequence", self.span_from(start))),
        }
    }

    fn lex_char_literal(&mut self) -> LexResult<()> {
        let start = self.here();
        self.bump();

        let value = match self.bump() {
            Some('\\') => self.lex_escape(start)?,
            Some(c) if c.is_ascii() && c != '\'' && c != '\n' => c as u8,
            _ => {
                return Err(LexError::new(
                    "improper character literal",
                    self.span_from(start),
                ))
            }
        };

        if self.bump() != Some('\'') {
            return Err(LexError::new(
                "improper character literal, expected closing '\''",
                self.span_from(start),
            ));
        }

        self.tokens.push(Token::CharLiteral {
            value,
            position: self.span_from(start),
        });
        Ok(())
    }

    fn lex_string_literal(&mut self) -> LexResult<()> {
        let start = self.here();
        self.bump();

        let mut value = vec![];
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => value.push(self.lex_escape(start)?),
                Some(c) if c.is_ascii() && c != '\n' => value.push(c as u8),
                _ => {
                    return Err(LexError::new(
                        "unterminated string literal",
                        self.span_from(start),
                    ))
                }
            }
        }

        self.tokens.push(Token::StringLiteral {
            value,
            position: self.span_from(start),
        });
        Ok(())
    }

    fn lex_operator(&mut self) -> LexResult<()> {
        let start = self.here();
        let Some(c) = self.bump() else {
            return Ok(());
        };

        let token = match c {
            '=' => Token::Equal {
                position: self.span_from(start),
            },
            '#' => Token::Hash {
                position: self.span_from(start),
            },
            '<' => match self.peek() {
                Some('=') => {
                    self.bump();
                    Token::LessEqual {
                        position: self.span_from(start),
                    }
                }
                Some('-') => {
                    self.bump();
                    Token::Assign {
                        position: self.span_from(start),
                    }
                }
                _ => Token::Less {
                    position: self.span_from(start),
                },
            },
            '>' => match self.peek() {
                Some('=') => {
                    self.bump();
                    Token::GreaterEqual {
                        position: self.span_from(start),
                    }
                }
                _ => Token::Greater {
                    position: self.span_from(start),
                },
            },
            '+' => Token::Plus {
                position: self.span_from(start),
            },
            '-' => Token::Minus {
                position: self.span_from(start),
            },
            '*' => Token::Times {
                position: self.span_from(start),
            },
            '(' => Token::LParen {
                position: self.span_from(start),
            },
            ')' => Token::RParen {
                position: self.span_from(start),
            },
            '[' => Token::LBracket {
                position: self.span_from(start),
            },
            ']' => Token::RBracket {
                position: self.span_from(start),
            },
            '{' => Token::LBrace {
                position: self.span_from(start),
            },
            '}' => Token::RBrace {
                position: self.span_from(start),
            },
            ',' => Token::Comma {
                position: self.span_from(start),
            },
            ':' => Token::Colon {
                position: self.span_from(start),
            },
            ';' => Token::Semicolon {
                position: self.span_from(start),
            },
            c => {
                return Err(LexError::new(
                    format!("unexpected character '{c}'"),
                    self.span_from(start),
                ))
            }
        };

        self.tokens.push(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .lex()
            .unwrap()
            .iter()
            .map(Token::kind)
            .collect()
    }

    #[test]
    fn test_lex_keywords_and_ids() {
        assert_eq!(
            kinds("fun main(): nothing"),
            vec![
                TokenKind::Fun,
                TokenKind::Id,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Colon,
                TokenKind::NothingKeyword,
            ]
        );
    }

    #[test]
    fn test_lex_assignment_vs_comparison() {
        assert_eq!(
            kinds("x <- y <= 3 < 4"),
            vec![
                TokenKind::Id,
                TokenKind::Assign,
                TokenKind::Id,
                TokenKind::LessEqual,
                TokenKind::IntLiteral,
                TokenKind::Less,
                TokenKind::IntLiteral,
            ]
        );
    }

    #[test]
    fn test_lex_integer() {
        let tokens = Lexer::new("1337").lex().unwrap();
        assert_eq!(
            tokens,
            vec![Token::IntLiteral {
                value: 1337,
                position: Span::default(),
            }]
        );
    }

    #[test]
    fn test_lex_char_escapes() {
        let tokens = Lexer::new(r"'\n' '\x41' 'a'").lex().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::CharLiteral {
                    value: b'\n',
                    position: Span::default(),
                },
                Token::CharLiteral {
                    value: 0x41,
                    position: Span::default(),
                },
                Token::CharLiteral {
                    value: b'a',
                    position: Span::default(),
                },
            ]
        );
    }

    #[test]
    fn test_lex_string_literal() {
        let tokens = Lexer::new(r#""hi\n""#).lex().unwrap();
        assert_eq!(
            tokens,
            vec![Token::StringLiteral {
                value: b"hi\n".to_vec(),
                position: Span::default(),
            }]
        );
    }

    #[test]
    fn test_lex_comments() {
        assert_eq!(
            kinds("x $ comment to end of line\ny $$ block\nstill block $$ z"),
            vec![TokenKind::Id, TokenKind::Id, TokenKind::Id]
        );
    }

    #[test]
    fn test_lex_unterminated_block_comment() {
        assert!(Lexer::new("$$ never closed").lex().is_err());
    }

    #[test]
    fn test_lex_unterminated_string() {
        assert!(Lexer::new("\"no end").lex().is_err());
    }

    #[test]
    fn test_lex_bad_escape() {
        assert!(Lexer::new(r"'\q'").lex().is_err());
    }

    #[test]
    fn test_lex_bad_character() {
        assert!(Lexer::new("x @ y").lex().is_err());
    }

    #[test]
    fn test_lex_integer_overflow() {
        assert!(Lexer::new("99999999999999999999").lex().is_err());
    }

    #[test]
    fn test_lex_positions() {
        let tokens = Lexer::new("x\n  y").lex().unwrap();
        assert_eq!(tokens[0].position().start, (1, 1));
        assert_eq!(tokens[1].position().start, (2, 3));
    }
}
