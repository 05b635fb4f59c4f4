use std::fmt::{Display, Formatter};
use thiserror::Error;
use uniblock_common::UniformType;
use uniblock_preprocess::PreprocessError;

/// Error type for declaration parsing.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParseError {
    /// The source contains a character sequence that is not a GLSL token.
    #[error("shader source lexing error at {row}:{col}")]
    LexerError { offset: usize, row: u32, col: usize },
    /// The source ended in the middle of a declaration.
    #[error("unexpected end of input in declaration starting at {row}:{col}")]
    UnexpectedEof { row: u32, col: usize },
    /// The preprocessor rejected the source.
    #[error("preprocessor error")]
    PreprocessError(#[from] PreprocessError),
}

/// The kind of a recoverable problem found while parsing declarations.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DiagnosticKind {
    /// A declaration used a type name that is neither built in nor a declared struct.
    UnknownType(String),
    /// An array was declared without a length that could be resolved.
    UnresolvedArrayLength(String),
    /// A struct was declared twice under the same name. The first declaration is kept.
    StructRedeclared(String),
    /// A construct the parser does not model, such as an array of arrays.
    UnsupportedConstruct(String),
}

/// A recoverable problem found while parsing declarations.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParseDiagnostic {
    pub row: u32,
    pub col: usize,
    pub kind: DiagnosticKind,
}

impl Display for ParseDiagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: ", self.row, self.col)?;
        match &self.kind {
            DiagnosticKind::UnknownType(name) => write!(f, "unknown type `{name}`"),
            DiagnosticKind::UnresolvedArrayLength(name) => {
                write!(f, "unresolved array length for `{name}`")
            }
            DiagnosticKind::StructRedeclared(name) => {
                write!(f, "struct `{name}` redeclared, keeping the first declaration")
            }
            DiagnosticKind::UnsupportedConstruct(what) => write!(f, "unsupported construct: {what}"),
        }
    }
}

/// The way a set of reflection records contradicts itself.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ContractViolation {
    /// A uniform references a block index with no matching block record.
    UnknownBlockIndex { uniform: String, block_index: i32 },
    /// A uniform outside any block was reported without a location.
    MissingLocation(String),
    /// A uniform name is not a dotted and bracketed path.
    InvalidName(String),
}

/// Error type for shader reflection.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ShaderReflectError {
    /// The program handle does not refer to a successfully linked program.
    #[error("the program is not linked")]
    ProgramNotLinked,
    /// The uniform and block records were not taken from the same linked program.
    #[error("reflection records are inconsistent: {0:?}")]
    ReflectionContractViolation(ContractViolation),
    /// A declaration could not be expanded into leaf uniforms.
    #[error("declaration `{0}` has an unresolved type or array length")]
    UnresolvedDeclaration(String),
}

/// A single uniform whose type cannot be bound or rendered.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("uniform `{path}` has unsupported type {ty}")]
pub struct UnsupportedTypeError {
    /// The dotted and bracketed path of the uniform.
    pub path: String,
    /// The offending type.
    pub ty: UniformType,
}
