use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("Syntax Error: Function definition is too short.")]
    DefinitionTooShort,

    #[error("Syntax Error: Function must start with 'int'.")]
    MissingIntKeyword,

    #[error("Syntax Error: Function must have a valid name.")]
    InvalidFunctionName,

    #[error("Syntax Error: Expected '(' after function name.")]
    ExpectedParenAfterName,

    #[error("Syntax Error: Expected parameter type before name.")]
    ExpectedParamType,

    #[error("Syntax Error: Expected parameter name after type.")]
    ExpectedParamName,

    #[error("Syntax Error: Duplicate parameter '{0}'.")]
    DuplicateParam(String),

    #[error("Syntax Error: Expected '{{' before function body.")]
    ExpectedBraceOpen,

    #[error("Syntax Error: Expected 'return' inside function body.")]
    ExpectedReturn,

    #[error("Syntax Error: Expected ';' after return expression.")]
    ExpectedSemicolon,

    #[error("Syntax Error: Expected '}}' after function body.")]
    ExpectedBraceClose,

    #[error("Syntax Error: Invalid expression.")]
    InvalidExpression,

    #[error("Syntax Error: Unknown identifier '{0}'.")]
    UnknownIdentifier(String),

    #[error("Syntax Error: Number '{0}' is out of range.")]
    NumberOutOfRange(String),

    #[error("Syntax Error: Invalid function call format.")]
    InvalidCall,

    #[error("Syntax Error: Expected numeric argument.")]
    ExpectedNumericArgument,

    #[error("Error: Function '{0}' not defined.")]
    UndefinedFunction(String),

    #[error("Error: Function '{name}' expects {expected} argument(s), got {got}.")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Runtime Error: Division by zero")]
    DivisionByZero,

    #[error("Runtime Error: Modulo by zero")]
    ModuloByZero,

    #[error("Runtime Error: Integer overflow")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, CalcError>;
