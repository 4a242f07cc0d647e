//! minicalc: a line-oriented interpreter for integer function definitions
//! and calls, used as the compiler behind coderelay.

pub mod error;
pub mod eval;
pub mod lexer;
pub mod session;

pub use error::CalcError;
pub use session::Session;

/// Printed once at startup.
pub const BANNER: &str = "Custom Compiler Interactive Mode";

/// Printed before every line read.
pub const PROMPT: &str = "\n>> ";
