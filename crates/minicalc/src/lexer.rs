//! Tokenizer for minicalc input lines.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// The `int` keyword
    Int,
    Return,
    Identifier,
    Number,
    Operator,
    ParenOpen,
    ParenClose,
    BraceOpen,
    BraceClose,
    Comma,
    Semicolon,
    /// Always the last token of a line
    End,
    /// A character the language does not know
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

/// Split a line into tokens. Never fails: unknown characters become
/// `TokenKind::Error` tokens and the parser decides what to do with them.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch.is_ascii_alphabetic() {
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            let word = &input[start..end];
            let kind = match word {
                "int" => TokenKind::Int,
                "return" => TokenKind::Return,
                _ => TokenKind::Identifier,
            };
            tokens.push(Token::new(kind, word));
        } else if ch.is_ascii_digit() {
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                end = i + 1;
                chars.next();
            }
            tokens.push(Token::new(TokenKind::Number, &input[start..end]));
        } else {
            let kind = match ch {
                '(' => TokenKind::ParenOpen,
                ')' => TokenKind::ParenClose,
                '{' => TokenKind::BraceOpen,
                '}' => TokenKind::BraceClose,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                '+' | '-' | '*' | '/' | '%' => TokenKind::Operator,
                _ => TokenKind::Error,
            };
            tokens.push(Token::new(kind, ch.to_string()));
            chars.next();
        }
    }

    tokens.push(Token::new(TokenKind::End, "$"));
    tokens
}
