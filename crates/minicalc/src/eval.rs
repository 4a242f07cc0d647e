//! Return expressions: parsing and evaluation.
//!
//! Grammar, left associative, `* / %` binding tighter than `+ -`:
//!
//! ```text
//! expr := term (('+' | '-') term)*
//! term := atom (('*' | '/' | '%') atom)*
//! atom := NUMBER | PARAM
//! ```

use crate::error::{CalcError, Result};
use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn from_token(token: &Token) -> Option<Self> {
        if !token.is(TokenKind::Operator) {
            return None;
        }
        match token.text.as_str() {
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" => Some(Self::Div),
            "%" => Some(Self::Rem),
            _ => None,
        }
    }

    fn is_multiplicative(self) -> bool {
        matches!(self, Self::Mul | Self::Div | Self::Rem)
    }

    fn apply(self, a: i32, b: i32) -> Result<i32> {
        match self {
            Self::Add => a.checked_add(b).ok_or(CalcError::Overflow),
            Self::Sub => a.checked_sub(b).ok_or(CalcError::Overflow),
            Self::Mul => a.checked_mul(b).ok_or(CalcError::Overflow),
            Self::Div if b == 0 => Err(CalcError::DivisionByZero),
            Self::Div => a.checked_div(b).ok_or(CalcError::Overflow),
            Self::Rem if b == 0 => Err(CalcError::ModuloByZero),
            Self::Rem => a.checked_rem(b).ok_or(CalcError::Overflow),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i32),
    /// Index into the function's parameter list
    Param(usize),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Parse the tokens between `return` and `;`.
    pub fn parse(tokens: &[Token], params: &[String]) -> Result<Self> {
        let mut parser = Parser {
            tokens,
            params,
            pos: 0,
        };
        let expr = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(CalcError::InvalidExpression);
        }
        Ok(expr)
    }

    pub fn eval(&self, args: &[i32]) -> Result<i32> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Param(i) => args.get(*i).copied().ok_or(CalcError::InvalidExpression),
            Self::Binary { op, lhs, rhs } => {
                let a = lhs.eval(args)?;
                let b = rhs.eval(args)?;
                op.apply(a, b)
            }
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    params: &'a [String],
    pos: usize,
}

impl Parser<'_> {
    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        while let Some(op) = self.peek_op(false) {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.atom()?;
        while let Some(op) = self.peek_op(true) {
            self.pos += 1;
            let rhs = self.atom()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn atom(&mut self) -> Result<Expr> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or(CalcError::InvalidExpression)?;
        let expr = match token.kind {
            TokenKind::Number => Expr::Number(parse_number(&token.text)?),
            TokenKind::Identifier => {
                let index = self
                    .params
                    .iter()
                    .position(|p| *p == token.text)
                    .ok_or_else(|| CalcError::UnknownIdentifier(token.text.clone()))?;
                Expr::Param(index)
            }
            _ => return Err(CalcError::InvalidExpression),
        };
        self.pos += 1;
        Ok(expr)
    }

    fn peek_op(&self, multiplicative: bool) -> Option<BinOp> {
        self.tokens
            .get(self.pos)
            .and_then(BinOp::from_token)
            .filter(|op| op.is_multiplicative() == multiplicative)
    }
}

/// Parse a decimal literal into a 32-bit signed integer.
pub fn parse_number(text: &str) -> Result<i32> {
    text.parse()
        .map_err(|_| CalcError::NumberOutOfRange(text.to_string()))
}
