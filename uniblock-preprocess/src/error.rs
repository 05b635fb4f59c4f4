use std::path::PathBuf;
use thiserror::Error;

/// Error type for source preprocessing.
#[derive(Error, Debug)]
pub enum PreprocessError {
    /// The file was not found during resolution.
    #[error("the file was not found during resolution")]
    IOError(PathBuf, std::io::Error),
    /// A `/*` comment was never closed.
    #[error("unterminated block comment starting at line {0}")]
    UnterminatedComment(usize),
    /// An `#if`, `#ifdef` or `#ifndef` was never closed by `#endif`.
    #[error("unterminated conditional starting at line {0}")]
    UnterminatedConditional(usize),
    /// A directive appeared where it is not allowed, such as `#endif` without `#if`.
    #[error("unexpected #{directive} at line {line}")]
    UnexpectedDirective { directive: String, line: usize },
    /// A directive could not be parsed.
    #[error("malformed directive at line {line}: {text}")]
    MalformedDirective { text: String, line: usize },
    /// An `#error` directive was reached in an active region.
    #[error("#error at line {line}: {message}")]
    ErrorDirective { message: String, line: usize },
}
