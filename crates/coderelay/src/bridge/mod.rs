//! Stream plumbing between the service and the compiler subprocess.
//!
//! # Architecture
//!
//! - **protocol**: submission ids, stream sources, the no-output sentinel
//! - **codec**: line encoder for stdin, UTF-8 chunk decoder for stdout/stderr

pub mod codec;
pub mod protocol;

pub use codec::{OutputCodec, SubmissionCodec};
pub use protocol::{DEFAULT_WAIT_WINDOW, NO_OUTPUT_SENTINEL, StreamSource, SubmissionId};
