//! Builds [`Form`] trees from the token stream.
//!
//! The parser is a single pass with no backtracking: every token is consumed once
//! and decides the next step. Parsing is all-or-nothing; the first lexical or
//! syntax error aborts the whole `parse` call and no partial forest is returned.

use tracing::debug;

use crate::ast::Form;
use crate::lexer::{Lexer, Token};
use crate::{Error, MAX_PARSE_DEPTH, SyntaxError, SyntaxErrorKind};

#[derive(Debug)]
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Parser {
            lexer,
            max_depth: MAX_PARSE_DEPTH,
        }
    }

    /// Override the maximum form nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Consume the entire token stream, producing the top-level forms in order.
    /// Bare atoms at top level are single-atom forms.
    pub fn parse(&mut self) -> Result<Vec<Form>, Error> {
        let mut forms = Vec::new();
        while let Some(token) = self.lexer.next_token()? {
            let form = match token {
                Token::FormBegin => self.parse_form_at(1)?,
                Token::FormEnd => {
                    return Err(self.syntax_error(
                        SyntaxErrorKind::UnmatchedClose,
                        "unmatched ')'",
                        Some(")".to_owned()),
                    ));
                }
                atom => self.expect_atom(atom)?,
            };
            forms.push(form);
        }
        debug!(forms = forms.len(), "parsed source");
        Ok(forms)
    }

    /// Parse the rest of a form whose `(` has already been consumed, up to and
    /// including the matching `)`
    pub fn parse_form(&mut self) -> Result<Form, Error> {
        self.parse_form_at(1)
    }

    fn parse_form_at(&mut self, depth: usize) -> Result<Form, Error> {
        if depth > self.max_depth {
            return Err(self.syntax_error(
                SyntaxErrorKind::TooDeeplyNested,
                format!("forms nested too deeply (max depth: {})", self.max_depth),
                Some("(".to_owned()),
            ));
        }

        let mut elements = Vec::new();
        loop {
            match self.lexer.next_token()? {
                None => {
                    return Err(self.syntax_error(
                        SyntaxErrorKind::UnexpectedEnd,
                        "unexpected end of input",
                        None,
                    ));
                }
                Some(Token::FormEnd) => return Ok(Form::List(elements.into())),
                Some(Token::FormBegin) => elements.push(self.parse_form_at(depth + 1)?),
                Some(atom) => elements.push(self.expect_atom(atom)?),
            }
        }
    }

    fn expect_atom(&self, token: Token) -> Result<Form, Error> {
        if let Token::Unknown(c) = token {
            return Err(self.syntax_error(
                SyntaxErrorKind::UnexpectedToken,
                format!("unexpected character '{c}'"),
                Some(c.to_string()),
            ));
        }
        let found = token.to_string();
        Form::from_token(token).ok_or_else(|| {
            self.syntax_error(
                SyntaxErrorKind::UnexpectedToken,
                "expected an atom",
                Some(found),
            )
        })
    }

    fn syntax_error(
        &self,
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        found: Option<String>,
    ) -> Error {
        SyntaxError::new(kind, message, self.lexer.line(), found).into()
    }
}

/// Lex and parse `source` in one step
pub fn parse_source(source: &str) -> Result<Vec<Form>, Error> {
    Parser::new(Lexer::new(source)).parse()
}
