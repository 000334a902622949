//! Tokenizer for source text.
//!
//! The lexer is pull-based: [`Lexer::next_token`] recognizes exactly one token from
//! the remaining input. The class of the token is decided by its first character, and
//! each class is recognized by a small `nom` combinator. Nothing is buffered beyond the
//! token being read.

use std::fmt;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till, take_while},
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{opt, recognize, value},
    sequence::{pair, preceded},
};

use crate::Error;

/// Punctuation allowed in symbol names besides letters and digits
pub(crate) const SYMBOL_SPECIAL_CHARS: &str = "!$%&*+-/:<>=?@^_~[]";

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A character that starts no token; the parser rejects it
    Unknown(char),
    FormBegin,
    FormEnd,
    Integer(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Symbol(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Unknown(c) => write!(f, "{c}"),
            Token::FormBegin => write!(f, "("),
            Token::FormEnd => write!(f, ")"),
            Token::Integer(n) => write!(f, "{n}"),
            Token::Float(n) => write!(f, "{n:?}"),
            Token::String(s) => write!(f, "\"{s}\""),
            Token::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Token::Symbol(s) => write!(f, "{s}"),
        }
    }
}

pub(crate) fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || SYMBOL_SPECIAL_CHARS.contains(c)
}

pub(crate) fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c)
}

/// Characters that may directly follow a number or boolean literal
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '"')
}

fn whitespace(input: &str) -> IResult<&str, &str> {
    take_while(char::is_whitespace).parse(input)
}

/// `-`? digits (`.` digits)? (`e` [+-]? digits)?
fn number_literal(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        pair(opt(char('-')), digit1),
        pair(
            opt(pair(char('.'), digit1)),
            opt(pair(one_of("eE"), pair(opt(one_of("+-")), digit1))),
        ),
    ))
    .parse(input)
}

/// Body of a string literal and whether the closing quote was found
fn string_literal(input: &str) -> IResult<&str, (&str, Option<char>)> {
    preceded(char('"'), pair(take_till(|c| c == '"'), opt(char('"')))).parse(input)
}

fn bool_literal(input: &str) -> IResult<&str, bool> {
    alt((
        value(true, tag("#true")),
        value(false, tag("#false")),
        value(true, tag("#t")),
        value(false, tag("#f")),
    ))
    .parse(input)
}

fn symbol_literal(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_symbol_start), take_while(is_symbol_char))).parse(input)
}

#[derive(Debug)]
pub struct Lexer<'a> {
    remaining: &'a str,
    line: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            remaining: input,
            line: 1,
            failed: false,
        }
    }

    /// Current line number (1-based)
    pub fn line(&self) -> usize {
        self.line
    }

    /// Recognize the next token. `Ok(None)` marks the end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        self.skip_whitespace();

        let mut chars = self.remaining.chars();
        let Some(first) = chars.next() else {
            return Ok(None);
        };
        let next_is_digit = chars.next().is_some_and(|c| c.is_ascii_digit());

        let token = match first {
            '(' => {
                self.remaining = &self.remaining[1..];
                Token::FormBegin
            }
            ')' => {
                self.remaining = &self.remaining[1..];
                Token::FormEnd
            }
            '"' => self.lex_string()?,
            '#' => self.lex_bool()?,
            c if c.is_ascii_digit() => self.lex_number()?,
            '-' if next_is_digit => self.lex_number()?,
            c if is_symbol_start(c) => self.lex_symbol()?,
            c => {
                self.remaining = &self.remaining[c.len_utf8()..];
                Token::Unknown(c)
            }
        };

        tracing::trace!(line = self.line, %token, "token");
        Ok(Some(token))
    }

    fn skip_whitespace(&mut self) {
        if let Ok((rest, skipped)) = whitespace(self.remaining) {
            self.line += skipped.matches('\n').count();
            self.remaining = rest;
        }
    }

    fn fail(&mut self, message: impl Into<String>) -> Error {
        self.failed = true;
        Error::lex_error(self.line, message)
    }

    /// The literal ends at a delimiter or at end of input
    fn at_delimiter(rest: &str) -> bool {
        rest.chars().next().is_none_or(is_delimiter)
    }

    fn lex_number(&mut self) -> Result<Token, Error> {
        let Ok((rest, literal)) = number_literal(self.remaining) else {
            return Err(self.fail("malformed numeric literal"));
        };

        if !Self::at_delimiter(rest) {
            let bad: String = self
                .remaining
                .chars()
                .take_while(|c| !is_delimiter(*c))
                .collect();
            return Err(self.fail(format!("malformed numeric literal '{bad}'")));
        }

        let token = if literal.contains(['.', 'e', 'E']) {
            match literal.parse::<f64>() {
                Ok(n) if n.is_finite() => Token::Float(n),
                Ok(_) => return Err(self.fail(format!("float literal out of range '{literal}'"))),
                Err(_) => return Err(self.fail(format!("malformed float literal '{literal}'"))),
            }
        } else {
            match literal.parse::<i64>() {
                Ok(n) => Token::Integer(n),
                Err(_) => {
                    return Err(self.fail(format!("integer literal out of range '{literal}'")));
                }
            }
        };

        self.remaining = rest;
        Ok(token)
    }

    fn lex_string(&mut self) -> Result<Token, Error> {
        let Ok((rest, (body, closing))) = string_literal(self.remaining) else {
            return Err(self.fail("malformed string literal"));
        };

        if closing.is_none() {
            // Report the line on which the string was opened
            return Err(self.fail("unterminated string literal"));
        }

        self.line += body.matches('\n').count();
        self.remaining = rest;
        Ok(Token::String(body.to_owned()))
    }

    fn lex_bool(&mut self) -> Result<Token, Error> {
        match bool_literal(self.remaining) {
            Ok((rest, b)) if Self::at_delimiter(rest) => {
                self.remaining = rest;
                Ok(Token::Bool(b))
            }
            _ => {
                let bad: String = self
                    .remaining
                    .chars()
                    .take_while(|c| !is_delimiter(*c))
                    .collect();
                Err(self.fail(format!("malformed literal '{bad}'")))
            }
        }
    }

    fn lex_symbol(&mut self) -> Result<Token, Error> {
        let Ok((rest, name)) = symbol_literal(self.remaining) else {
            return Err(self.fail("malformed symbol"));
        };
        self.remaining = rest;
        Ok(Token::Symbol(name.to_owned()))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.next_token().transpose()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use Token::*;

    fn sym(name: &str) -> Token {
        Symbol(name.to_owned())
    }

    fn lex_all(input: &str) -> Result<Vec<Token>, Error> {
        Lexer::new(input).collect()
    }

    /// Expected outcome of lexing one input
    #[derive(Debug)]
    enum LexTestResult {
        Tokens(Vec<Token>),
        SpecificError(&'static str),
    }
    use LexTestResult::*;

    fn run_lex_tests(test_cases: Vec<(&str, LexTestResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let test_id = format!("Lex test #{}", i + 1);
            match (lex_all(input), expected) {
                (Ok(actual), Tokens(expected)) => {
                    assert_eq!(&actual, expected, "{test_id}: tokens mismatch for '{input}'");
                }
                (Err(err), SpecificError(text)) => {
                    let msg = format!("{err}");
                    assert!(
                        msg.contains(text),
                        "{test_id}: error for '{input}' should contain '{text}', got: {msg}"
                    );
                }
                (Ok(actual), SpecificError(text)) => {
                    panic!("{test_id}: expected error containing '{text}', got {actual:?}");
                }
                (Err(err), Tokens(_)) => {
                    panic!("{test_id}: expected tokens for '{input}', got error {err:?}");
                }
            }
        }
    }

    #[test]
    fn test_nested_application_tokens() {
        let tokens = lex_all("(+ (+ 1 3) (+ 2 4))").unwrap();
        assert_eq!(
            tokens,
            vec![
                FormBegin,
                sym("+"),
                FormBegin,
                sym("+"),
                Integer(1),
                Integer(3),
                FormEnd,
                FormBegin,
                sym("+"),
                Integer(2),
                Integer(4),
                FormEnd,
                FormEnd,
            ]
        );
    }

    #[test]
    fn test_lexer_comprehensive() {
        let test_cases = vec![
            // ===== NUMBERS =====
            ("42", Tokens(vec![Integer(42)])),
            ("0", Tokens(vec![Integer(0)])),
            ("-5", Tokens(vec![Integer(-5)])),
            ("2.5", Tokens(vec![Float(2.5)])),
            ("-0.25", Tokens(vec![Float(-0.25)])),
            ("1e3", Tokens(vec![Float(1000.0)])),
            ("1.5E-2", Tokens(vec![Float(0.015)])),
            ("9223372036854775807", Tokens(vec![Integer(i64::MAX)])),
            ("-9223372036854775808", Tokens(vec![Integer(i64::MIN)])),
            ("(1)", Tokens(vec![FormBegin, Integer(1), FormEnd])),
            ("123abc", SpecificError("malformed numeric literal '123abc'")),
            ("1.2.3", SpecificError("malformed numeric literal")),
            ("1e", SpecificError("malformed numeric literal")),
            ("99999999999999999999", SpecificError("out of range")),
            ("1e400", SpecificError("float literal out of range '1e400'")),
            ("(f -2.5e308)", SpecificError("float literal out of range")),
            ("1e-400", Tokens(vec![Float(0.0)])),
            // ===== MINUS: NUMBER OR SYMBOL =====
            ("-", Tokens(vec![sym("-")])),
            ("(- 5)", Tokens(vec![FormBegin, sym("-"), Integer(5), FormEnd])),
            ("(-5)", Tokens(vec![FormBegin, Integer(-5), FormEnd])),
            ("-abc", Tokens(vec![sym("-abc")])),
            ("x-1", Tokens(vec![sym("x-1")])),
            ("- 1", Tokens(vec![sym("-"), Integer(1)])),
            ("-42name", SpecificError("malformed numeric literal")),
            // ===== SYMBOLS =====
            ("foo", Tokens(vec![sym("foo")])),
            ("+", Tokens(vec![sym("+")])),
            ("<=", Tokens(vec![sym("<=")])),
            ("null?", Tokens(vec![sym("null?")])),
            ("set!", Tokens(vec![sym("set!")])),
            ("a:b/c", Tokens(vec![sym("a:b/c")])),
            ("var123", Tokens(vec![sym("var123")])),
            ("$x_%&@^~", Tokens(vec![sym("$x_%&@^~")])),
            ("λ", Tokens(vec![sym("λ")])),
            // ===== BOOLEANS =====
            ("#t", Tokens(vec![Bool(true)])),
            ("#f", Tokens(vec![Bool(false)])),
            ("#true #false", Tokens(vec![Bool(true), Bool(false)])),
            ("(#t)", Tokens(vec![FormBegin, Bool(true), FormEnd])),
            ("#x1A", SpecificError("malformed literal '#x1A'")),
            ("#tx", SpecificError("malformed literal")),
            ("#", SpecificError("malformed literal")),
            // ===== STRINGS =====
            ("\"hello\"", Tokens(vec![String("hello".into())])),
            ("\"\"", Tokens(vec![String(std::string::String::new())])),
            ("\"a b\"", Tokens(vec![String("a b".into())])),
            // No escape processing: the backslash is kept as is
            (r#""a\nb""#, Tokens(vec![String(r"a\nb".into())])),
            ("\"x\"y", Tokens(vec![String("x".into()), sym("y")])),
            ("\"unterminated", SpecificError("unterminated string")),
            // ===== UNKNOWN CHARACTERS =====
            ("'", Tokens(vec![Unknown('\'')])),
            (".5", Tokens(vec![Unknown('.'), Integer(5)])),
            ("(a ; b)", Tokens(vec![FormBegin, sym("a"), Unknown(';'), sym("b"), FormEnd])),
            // ===== WHITESPACE =====
            ("", Tokens(vec![])),
            ("  \t\r\n ", Tokens(vec![])),
            ("( a\tb\n)", Tokens(vec![FormBegin, sym("a"), sym("b"), FormEnd])),
        ];

        run_lex_tests(test_cases);
    }

    #[test]
    fn test_line_tracking() {
        let mut lexer = Lexer::new("(a\n b\n\n c)");
        assert_eq!(lexer.line(), 1);
        assert_eq!(lexer.next_token().unwrap(), Some(FormBegin));
        assert_eq!(lexer.next_token().unwrap(), Some(sym("a")));
        assert_eq!(lexer.line(), 1);
        assert_eq!(lexer.next_token().unwrap(), Some(sym("b")));
        assert_eq!(lexer.line(), 2);
        assert_eq!(lexer.next_token().unwrap(), Some(sym("c")));
        assert_eq!(lexer.line(), 4);
        assert_eq!(lexer.next_token().unwrap(), Some(FormEnd));
        assert_eq!(lexer.next_token().unwrap(), None);
        // The end sentinel repeats
        assert_eq!(lexer.next_token().unwrap(), None);
    }

    #[test]
    fn test_newlines_inside_strings_count() {
        let mut lexer = Lexer::new("\"one\ntwo\" x");
        assert_eq!(
            lexer.next_token().unwrap(),
            Some(String("one\ntwo".into()))
        );
        assert_eq!(lexer.next_token().unwrap(), Some(sym("x")));
        assert_eq!(lexer.line(), 2);
    }

    #[test]
    fn test_errors_report_line() {
        let err = lex_all("(a\n\n\"open").unwrap_err();
        assert_eq!(
            err,
            Error::LexError {
                line: 3,
                message: "unterminated string literal".into()
            }
        );
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let mut lexer = Lexer::new("1 2x 3");
        assert_eq!(lexer.next().unwrap().unwrap(), Integer(1));
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_token_display_relexes() {
        let source = "(define f (lambda (x) (+ x -2 0.5 \"s\" #t)))";
        let tokens = lex_all(source).unwrap();
        let rendered: Vec<std::string::String> = tokens.iter().map(ToString::to_string).collect();
        let relexed = lex_all(&rendered.join(" ")).unwrap();
        assert_eq!(tokens, relexed);
    }
}
