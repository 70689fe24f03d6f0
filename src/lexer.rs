use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use lazy_static::lazy_static;

use crate::token::{Token, TokenKind};

lazy_static! {
    /// Reserved words are uppercase only; anything else lexes as an identifier.
    static ref KEYWORDS: HashMap<&'static str, TokenKind> = {
        let mut res = HashMap::new();
        res.insert("CONST", TokenKind::Const);
        res.insert("VAR", TokenKind::Var);
        res.insert("PROCEDURE", TokenKind::Procedure);
        res.insert("CALL", TokenKind::Call);
        res.insert("BEGIN", TokenKind::Begin);
        res.insert("END", TokenKind::End);
        res.insert("IF", TokenKind::If);
        res.insert("THEN", TokenKind::Then);
        res.insert("WHILE", TokenKind::While);
        res.insert("DO", TokenKind::Do);
        res.insert("ODD", TokenKind::Odd);
        res
    };
}

/// Produces tokens one at a time from the source text. The parser pulls a
/// token only when its lookahead moves forward.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    /// Returns the next token from the input stream. Whitespace and comments
    /// are stripped here; the token carries the line number of its first
    /// character. Once the input is exhausted every call returns `Eof`.
    pub fn scan(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            let line = self.line;
            let ch = match self.chars.peek() {
                Some(&c) => c,
                None => return Token::new(TokenKind::Eof, line),
            };
            if ch == '/' {
                self.chars.next();
                match self.chars.peek() {
                    Some(&'/') => {
                        self.skip_line_comment();
                        continue;
                    }
                    Some(&'*') => {
                        if !self.skip_block_comment() {
                            // Unterminated block comment ends the stream.
                            return Token::new(TokenKind::Eof, self.line);
                        }
                        continue;
                    }
                    _ => return Token::new(TokenKind::Divide, line),
                }
            }
            if ch.is_ascii_alphabetic() {
                return self.scan_identifier(line);
            }
            if ch.is_ascii_digit() {
                return self.scan_number(line);
            }
            return self.scan_operator(ch, line);
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            match ch {
                ' ' | '\t' => {
                    self.chars.next();
                }
                '\n' => {
                    self.line += 1;
                    self.chars.next();
                }
                _ => break,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        self.chars.next(); // Consume the second '/'
        for ch in self.chars.by_ref() {
            if ch == '\n' {
                self.line += 1;
                break;
            }
        }
    }

    /// Consumes up to and including the closing `*/`. Returns false when the
    /// input ends inside the comment. Block comments do not nest.
    fn skip_block_comment(&mut self) -> bool {
        self.chars.next(); // Consume the '*'
        while let Some(ch) = self.chars.next() {
            if ch == '\n' {
                self.line += 1;
            } else if ch == '*' && self.chars.peek() == Some(&'/') {
                self.chars.next();
                return true;
            }
        }
        false
    }

    fn scan_identifier(&mut self, line: usize) -> Token {
        let mut lexeme = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_alphanumeric() {
                lexeme.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }
        let kind = match KEYWORDS.get(lexeme.as_str()) {
            Some(keyword) => keyword.clone(),
            None => TokenKind::Ident(lexeme),
        };
        Token::new(kind, line)
    }

    fn scan_number(&mut self, line: usize) -> Token {
        // Accumulate with wrapping arithmetic; overflow is as unchecked here
        // as it is in the generated add/sub/mult.
        let mut value: i64 = 0;
        while let Some(&ch) = self.chars.peek() {
            match ch.to_digit(10) {
                Some(digit) => {
                    value = value.wrapping_mul(10).wrapping_add(digit as i64);
                    self.chars.next();
                }
                None => break,
            }
        }
        Token::new(TokenKind::Number(value), line)
    }

    fn scan_operator(&mut self, ch: char, line: usize) -> Token {
        self.chars.next();
        let kind = match ch {
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '=' => TokenKind::Equal,
            '#' => TokenKind::Hash,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Multiply,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '!' => TokenKind::Exclamation,
            '<' => {
                if self.chars.peek() == Some(&'=') {
                    self.chars.next();
                    TokenKind::LessThanEqual
                } else {
                    TokenKind::LessThan
                }
            }
            '>' => {
                if self.chars.peek() == Some(&'=') {
                    self.chars.next();
                    TokenKind::GreaterThanEqual
                } else {
                    TokenKind::GreaterThan
                }
            }
            ':' => {
                // ":=" is the only form that starts with ':'.
                if self.chars.peek() == Some(&'=') {
                    self.chars.next();
                    TokenKind::Assign
                } else {
                    TokenKind::UnexpectedChar
                }
            }
            _ => TokenKind::UnexpectedChar,
        };
        Token::new(kind, line)
    }
}
