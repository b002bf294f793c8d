mod token;

pub use token::{keyword, single_char_syntax, Token, TokenKind};

use log::{debug, trace};

use crate::error::SyntaxError;
use crate::span::Position;

/// Save/restore point used for the lookahead the grammar needs: an
/// identifier's first character, `.` followed by either a word char or
/// a digit, and `/` followed by `*`, `/`, or neither.
#[derive(Debug, Clone, Copy)]
struct LexerState {
    line: usize,
    col: usize,
    pos: usize,
}

/// Consumes a source string and produces an ordered sequence of tokens
/// terminated by an EOF sentinel. Stateful only for the duration of a
/// single `lex` call.
pub struct Lexer<'a> {
    src: &'a [char],
    line: usize,
    col: usize,
    pos: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a [char]) -> Self {
        Self {
            src,
            line: 1,
            col: 1,
            pos: 0,
        }
    }

    pub fn lex(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = vec![];
        while let Some(tok) = self.lex_any()? {
            tokens.push(tok);
        }
        tokens.push(Token::new(TokenKind::Eof, "", (self.line, self.col)));
        debug!("lexed {} tokens (excluding EOF)", tokens.len() - 1);
        Ok(tokens)
    }

    fn lex_any(&mut self) -> Result<Option<Token>, SyntaxError> {
        self.skip_whitespace();
        if self.is_done() {
            return Ok(None);
        }

        let position = (self.line, self.col);
        let backup = self.save();
        let c = self.bump().expect("checked not done above");

        if c.is_alphabetic() || c == '_' {
            self.restore(backup);
            return Ok(Some(self.lex_identifier()));
        }

        if let Some(kind) = single_char_syntax(c) {
            return Ok(Some(Token::new(kind, c.to_string(), position)));
        }

        if c == '/' {
            if self.is_done() {
                return Err(SyntaxError::new("unexpected character '/'", position));
            }
            match self.peek() {
                Some('*') => {
                    self.lex_multiline_comment(position)?;
                    return self.lex_any();
                }
                Some('/') => {
                    self.lex_line_comment();
                    return self.lex_any();
                }
                _ => return Err(SyntaxError::new("unexpected character '/'", position)),
            }
        }

        if c == '.' {
            if self.is_done() {
                return Err(SyntaxError::new("unexpected character '.'", position));
            }
            let nxt = self.peek().unwrap();
            if nxt.is_alphabetic() || nxt == '_' {
                let attr = self.accept_run(is_word_char);
                return Ok(Some(Token::new(
                    TokenKind::AttrAccess,
                    format!(".{attr}"),
                    position,
                )));
            } else {
                self.restore(backup);
                return Ok(Some(self.lex_num_lit()));
            }
        }

        if c == '"' {
            self.restore(backup);
            return Ok(Some(self.lex_str_lit()?));
        }

        if c.is_ascii_digit() {
            self.restore(backup);
            return Ok(Some(self.lex_num_lit()));
        }

        Err(SyntaxError::new(format!("unexpected character '{c}'"), position))
    }

    fn lex_identifier(&mut self) -> Token {
        let position = (self.line, self.col);
        let word = self.accept_run(is_word_char);
        if let Some(kind) = keyword(&word) {
            Token::new(kind, word, position)
        } else if word == "true" || word == "false" {
            Token::new(TokenKind::BoolLit, word, position)
        } else if word == "null" {
            Token::new(TokenKind::NullLit, word, position)
        } else {
            Token::new(TokenKind::Identifier, word, position)
        }
    }

    fn lex_multiline_comment(&mut self, start: Position) -> Result<(), SyntaxError> {
        let (mut c1, mut c2) = (self.bump(), self.bump());
        while !self.is_done() && !(c1 == Some('*') && c2 == Some('/')) {
            c1 = c2;
            c2 = self.bump();
        }
        if !(c1 == Some('*') && c2 == Some('/')) {
            return Err(SyntaxError::new("unclosed multiline comment", start));
        }
        Ok(())
    }

    fn lex_line_comment(&mut self) {
        while !self.is_done() && self.bump() != Some('\n') {}
    }

    fn lex_num_lit(&mut self) -> Token {
        let position = (self.line, self.col);
        let whole = self.accept_run(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            self.bump();
            let frac = self.accept_run(|c| c.is_ascii_digit());
            Token::new(TokenKind::FloatLit, format!("{whole}.{frac}"), position)
        } else {
            Token::new(TokenKind::IntLit, whole, position)
        }
    }

    fn lex_str_lit(&mut self) -> Result<Token, SyntaxError> {
        let position = (self.line, self.col);
        let start_pos = self.pos;
        self.bump(); // opening quote
        let mut in_escape = false;
        let mut found_close = false;

        while !self.is_done() {
            let c = self.bump().unwrap();
            if in_escape {
                in_escape = false;
            } else if c == '\\' {
                in_escape = true;
            } else if c == '"' {
                found_close = true;
                break;
            }
        }

        if !found_close {
            return Err(SyntaxError::new("unclosed string literal", position));
        }
        if in_escape {
            return Err(SyntaxError::new(
                "unexpected escape character at end of string literal",
                position,
            ));
        }

        let text: String = self.src[start_pos..self.pos].iter().collect();
        Ok(Token::new(TokenKind::StrLit, text, position))
    }

    fn accept_run(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if pred(c) {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.src.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        trace!("bumped '{c}' at {}:{}", self.line, self.col);
        Some(c)
    }

    fn save(&self) -> LexerState {
        LexerState {
            line: self.line,
            col: self.col,
            pos: self.pos,
        }
    }

    fn restore(&mut self, state: LexerState) {
        self.line = state.line;
        self.col = state.col;
        self.pos = state.pos;
    }

    fn is_done(&self) -> bool {
        self.pos >= self.src.len()
    }
}

/// Convenience entry point: lex a whole source string.
pub fn lex(src: &str) -> Result<Vec<Token>, SyntaxError> {
    let chars: Vec<char> = src.chars().collect();
    Lexer::new(&chars).lex()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_let_binding() {
        let tokens = lex("let foo = 42;").unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.kind.clone()).collect::<Vec<_>>(),
            vec![
                TokenKind::Let,
                TokenKind::Identifier,
                TokenKind::Eq,
                TokenKind::IntLit,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].text, "foo");
        assert_eq!(tokens[3].text, "42");
    }

    #[test]
    fn lex_tracks_line_and_col() {
        let tokens = lex("let x =\n  1;").unwrap();
        let one = &tokens[3];
        assert_eq!(one.text, "1");
        assert_eq!(one.position, (2, 3));
    }

    #[test]
    fn lex_float_literal() {
        let tokens = lex("3.14").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::FloatLit);
        assert_eq!(tokens[0].text, "3.14");
    }

    #[test]
    fn lex_leading_dot_float() {
        let tokens = lex(".5").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::FloatLit);
        assert_eq!(tokens[0].text, ".5");
    }

    #[test]
    fn lex_attr_access() {
        let tokens = lex("x.length").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::AttrAccess);
        assert_eq!(tokens[1].text, ".length");
    }

    #[test]
    fn lex_string_with_escape() {
        let tokens = lex(r#""a\"b""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StrLit);
        assert_eq!(tokens[0].text, r#""a\"b""#);
    }

    #[test]
    fn lex_unclosed_string_is_syntax_error() {
        let err = lex("\"abc").unwrap_err();
        assert_eq!(err.message, "unclosed string literal");
        assert_eq!(err.position, (1, 1));
    }

    #[test]
    fn lex_unclosed_string_mid_escape() {
        let err = lex("\"abc\\").unwrap_err();
        assert_eq!(err.message, "unexpected escape character at end of string literal");
    }

    #[test]
    fn lex_unclosed_multiline_comment() {
        let err = lex("/* never closed").unwrap_err();
        assert_eq!(err.message, "unclosed multiline comment");
    }

    #[test]
    fn lex_line_comment_runs_to_eof() {
        assert_eq!(kinds("// whole line"), vec![TokenKind::Eof]);
    }

    #[test]
    fn lex_stray_slash_errors() {
        let err = lex("1 / 2").unwrap_err();
        assert_eq!(err.message, "unexpected character '/'");
    }

    #[test]
    fn lex_keywords_vs_identifiers() {
        assert_eq!(
            kinds("while true null letters"),
            vec![
                TokenKind::While,
                TokenKind::BoolLit,
                TokenKind::NullLit,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lex_empty_source_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }
}
