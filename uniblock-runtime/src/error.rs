use std::fmt::{Display, Formatter};
use thiserror::Error;
use uniblock_common::ScalarKind;
use uniblock_reflect::error::UnsupportedTypeError;

/// Error returned when some uniforms of a model cannot be bound.
#[derive(Error, Debug, Clone)]
pub struct BindingIncompleteError {
    /// Every uniform that could not be bound.
    pub unsupported: Vec<UnsupportedTypeError>,
}

impl Display for BindingIncompleteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} uniform(s) cannot be bound:", self.unsupported.len())?;
        for error in &self.unsupported {
            write!(f, " `{}` ({})", error.path, error.ty)?;
        }
        Ok(())
    }
}

/// Error type for setting and reading uniform values.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// The number of components is not a whole number of elements.
    #[error("`{path}` takes {expected} components per element, got {found}")]
    ComponentMismatch {
        path: String,
        expected: u32,
        found: usize,
    },
    /// The value has a different scalar type than the uniform.
    #[error("`{path}` holds {expected:?} values, got {found:?}")]
    TypeMismatch {
        path: String,
        expected: ScalarKind,
        found: ScalarKind,
    },
    /// The element index or element count exceeds the array size.
    #[error("index {index} is out of range for `{path}` with {len} elements")]
    IndexOutOfRange { path: String, index: u32, len: u32 },
    /// No uniform or block member has this name.
    #[error("no uniform named `{0}`")]
    UnknownField(String),
    /// A write or read would leave the block buffer.
    #[error("{len} bytes at offset {offset} exceed the buffer of {capacity} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },
}
