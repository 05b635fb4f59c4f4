//! Uniform reflection and block layout for linked GLSL programs.
//!
//! The [`front`] module parses GLSL declarations, [`reflect`] turns driver reflection
//! records into a deduplicated type model with byte-exact block layouts, and [`back`]
//! renders that model as Rust declarations.

/// Rust code generation from the uniform model.
pub mod back;
/// Error types.
pub mod error;
/// GLSL declaration parsing.
pub mod front;
/// Uniform reflection.
pub mod reflect;
