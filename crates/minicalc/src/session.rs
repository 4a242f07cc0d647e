//! Interactive session state: the table of defined functions.

use std::collections::HashMap;

use crate::error::{CalcError, Result};
use crate::eval::{Expr, parse_number};
use crate::lexer::{Token, TokenKind, tokenize};

/// Shortest definition: `int f ( ) { return x ; }` plus the end token.
const MIN_DEFINITION_TOKENS: usize = 8;

#[derive(Debug, Clone)]
pub struct Function {
    pub params: Vec<String>,
    pub body: Expr,
}

#[derive(Debug, Default)]
pub struct Session {
    functions: HashMap<String, Function>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Process one input line.
    ///
    /// Returns the text to print on stdout, `None` for a blank line, or the
    /// error to report on stderr.
    pub fn handle_line(&mut self, line: &str) -> Result<Option<String>> {
        let tokens = tokenize(line);
        if tokens.len() == 1 {
            return Ok(None);
        }

        if tokens.len() > 2 && tokens[1].is(TokenKind::Identifier) {
            let name = self.define(&tokens)?;
            Ok(Some(format!("Function '{}' defined successfully.", name)))
        } else {
            let value = self.call(&tokens)?;
            Ok(Some(format!("Output: {}", value)))
        }
    }

    /// `int name(int a, int b) { return <expr>; }`. Redefinition replaces.
    fn define(&mut self, tokens: &[Token]) -> Result<String> {
        if tokens.len() < MIN_DEFINITION_TOKENS {
            return Err(CalcError::DefinitionTooShort);
        }
        let mut cursor = Cursor::new(tokens);

        cursor.expect(TokenKind::Int, CalcError::MissingIntKeyword)?;
        let name = cursor.expect(TokenKind::Identifier, CalcError::InvalidFunctionName)?;
        cursor.expect(TokenKind::ParenOpen, CalcError::ExpectedParenAfterName)?;

        let mut params: Vec<String> = Vec::new();
        while !cursor.eat(TokenKind::ParenClose) {
            cursor.expect(TokenKind::Int, CalcError::ExpectedParamType)?;
            let param = cursor.expect(TokenKind::Identifier, CalcError::ExpectedParamName)?;
            if params.contains(&param) {
                return Err(CalcError::DuplicateParam(param));
            }
            params.push(param);
            cursor.eat(TokenKind::Comma);
        }

        cursor.expect(TokenKind::BraceOpen, CalcError::ExpectedBraceOpen)?;
        cursor.expect(TokenKind::Return, CalcError::ExpectedReturn)?;

        let body_tokens = cursor.until(TokenKind::Semicolon, CalcError::ExpectedSemicolon)?;
        let body = Expr::parse(body_tokens, &params)?;

        cursor.expect(TokenKind::BraceClose, CalcError::ExpectedBraceClose)?;
        if !cursor.at_end() {
            return Err(CalcError::ExpectedBraceClose);
        }

        self.functions.insert(name.clone(), Function { params, body });
        Ok(name)
    }

    /// `name(<int>, <int>, ...)`, optionally followed by `;`.
    fn call(&self, tokens: &[Token]) -> Result<i32> {
        if tokens.len() < 4 || !tokens[1].is(TokenKind::ParenOpen) {
            return Err(CalcError::InvalidCall);
        }
        let name = &tokens[0].text;
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| CalcError::UndefinedFunction(name.clone()))?;

        let mut cursor = Cursor::new(&tokens[2..]);
        let mut args = Vec::new();
        while !cursor.eat(TokenKind::ParenClose) {
            if cursor.at_end() {
                return Err(CalcError::InvalidCall);
            }
            args.push(cursor.signed_number()?);
            cursor.eat(TokenKind::Comma);
        }
        cursor.eat(TokenKind::Semicolon);
        if !cursor.at_end() {
            return Err(CalcError::InvalidCall);
        }

        if args.len() != function.params.len() {
            return Err(CalcError::ArityMismatch {
                name: name.clone(),
                expected: function.params.len(),
                got: args.len(),
            });
        }
        function.body.eval(&args)
    }
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn at_end(&self) -> bool {
        self.peek().is_none_or(|t| t.is(TokenKind::End))
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().is_some_and(|t| t.is(kind)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, err: CalcError) -> Result<String> {
        match self.peek() {
            Some(token) if token.is(kind) => {
                self.pos += 1;
                Ok(token.text.clone())
            }
            _ => Err(err),
        }
    }

    /// Tokens up to (not including) the next `kind`, consuming both.
    fn until(&mut self, kind: TokenKind, err: CalcError) -> Result<&'a [Token]> {
        let start = self.pos;
        let len = self.tokens[start..]
            .iter()
            .position(|t| t.is(kind))
            .ok_or(err)?;
        self.pos = start + len + 1;
        Ok(&self.tokens[start..start + len])
    }

    /// A number argument, with an optional leading `-`.
    fn signed_number(&mut self) -> Result<i32> {
        let negative = self
            .peek()
            .is_some_and(|t| t.is(TokenKind::Operator) && t.text == "-");
        if negative {
            self.pos += 1;
        }
        let token = self
            .peek()
            .filter(|t| t.is(TokenKind::Number))
            .ok_or(CalcError::ExpectedNumericArgument)?;
        self.pos += 1;

        if negative {
            parse_number(&format!("-{}", token.text))
        } else {
            parse_number(&token.text)
        }
    }
}
